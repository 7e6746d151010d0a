//! Given-When-Then harness for reducers
//!
//! Drives a reducer through one or more actions and checks the resulting
//! state, the effects returned by the final action, and (optionally) the
//! feedback actions those effects produce once executed.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use gatherly_core::{
    effect::{self, Effect},
    reducer::Reducer,
};

type StateAssertion<S> = Box<dyn FnOnce(&S)>;
type EffectAssertion<A> = Box<dyn FnOnce(&[Effect<A>])>;
type FeedbackAssertion<A> = Box<dyn FnOnce(&[A])>;

/// Final state and last effects, plus the assertions still to check
struct Reduced<S, A> {
    state: S,
    effects: Vec<Effect<A>>,
    state_assertions: Vec<StateAssertion<S>>,
    effect_assertions: Vec<EffectAssertion<A>>,
    feedback_assertions: Vec<FeedbackAssertion<A>>,
}

/// Fluent reducer test.
///
/// ```ignore
/// ReducerTest::new(AttendanceReducer::new())
///     .with_env(env)
///     .given_state(AttendanceState::loaded(event))
///     .when_action(AttendanceAction::Join { event_id, user_id })
///     .then_state(|state| assert_eq!(state.event().unwrap().slots, 0))
///     .then_effects(|effects| assertions::assert_effects_count(effects, 1))
///     .run();
/// ```
///
/// When several actions are queued with [`ReducerTest::when_action`] they are
/// reduced in order; effect assertions only see the effects of the last one.
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    environment: Option<E>,
    initial_state: Option<S>,
    actions: Vec<A>,
    state_assertions: Vec<StateAssertion<S>>,
    effect_assertions: Vec<EffectAssertion<A>>,
    feedback_assertions: Vec<FeedbackAssertion<A>>,
}

impl<R, S, A, E> ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    /// Create a new reducer test with the given reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            actions: Vec::new(),
            state_assertions: Vec::new(),
            effect_assertions: Vec::new(),
            feedback_assertions: Vec::new(),
        }
    }

    /// Set the environment for the test
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.environment = Some(env);
        self
    }

    /// Given
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// When. May be called repeatedly.
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.actions.push(action);
        self
    }

    /// Then: inspect the final state
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Then: inspect the effects returned by the last action
    #[must_use]
    pub fn then_effects<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[Effect<A>]) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Then: inspect the actions produced by executing the last effects.
    ///
    /// Only checked by [`ReducerTest::run_with_effects`].
    #[must_use]
    pub fn then_feedback<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[A]) + 'static,
    {
        self.feedback_assertions.push(Box::new(assertion));
        self
    }

    #[allow(clippy::expect_used)] // Misconfigured tests should fail loudly
    fn reduce_all(self) -> Reduced<S, A> {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");
        let env = self
            .environment
            .expect("Environment must be set with with_env()");
        assert!(
            !self.actions.is_empty(),
            "At least one action must be set with when_action()"
        );

        let mut effects = Vec::new();
        for action in self.actions {
            effects = self.reducer.reduce(&mut state, action, &env).into_vec();
        }

        Reduced {
            state,
            effects,
            state_assertions: self.state_assertions,
            effect_assertions: self.effect_assertions,
            feedback_assertions: self.feedback_assertions,
        }
    }

    /// Run the reducer and every state/effect assertion.
    ///
    /// # Panics
    ///
    /// Panics if state, environment or action is missing, or if an
    /// assertion fails.
    pub fn run(self) {
        let Reduced {
            state,
            effects,
            state_assertions,
            effect_assertions,
            ..
        } = self.reduce_all();

        for assertion in state_assertions {
            assertion(&state);
        }
        for assertion in effect_assertions {
            assertion(&effects);
        }
    }

    /// Like [`ReducerTest::run`], then execute the effects of the last
    /// action and check the feedback they produce.
    ///
    /// Returns the final state so callers can keep driving it.
    ///
    /// # Panics
    ///
    /// Same conditions as [`ReducerTest::run`].
    pub async fn run_with_effects(self) -> S
    where
        A: Send + 'static,
    {
        let Reduced {
            state,
            effects,
            state_assertions,
            effect_assertions,
            feedback_assertions,
        } = self.reduce_all();

        for assertion in state_assertions {
            assertion(&state);
        }
        for assertion in effect_assertions {
            assertion(&effects);
        }

        let feedback = effect::execute(effects).await;
        for assertion in feedback_assertions {
            assertion(&feedback);
        }

        state
    }
}

/// Effect assertions
pub mod assertions {
    use gatherly_core::effect::Effect;

    /// Assert that there are no effects
    ///
    /// # Panics
    ///
    /// Panics if any effect other than `Effect::None` is present.
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().all(|e| matches!(e, Effect::None)),
            "Expected no effects, but found {}: {:?}",
            effects.len(),
            effects
        );
    }

    /// Assert the number of effects
    ///
    /// # Panics
    ///
    /// Panics if the number of effects doesn't match expected.
    pub fn assert_effects_count<A>(effects: &[Effect<A>], expected: usize) {
        assert_eq!(
            effects.len(),
            expected,
            "Expected {} effects, but found {}",
            expected,
            effects.len()
        );
    }

    /// Assert that effects contain at least one Future effect
    ///
    /// # Panics
    ///
    /// Panics if no Future effect is found.
    pub fn assert_has_future_effect<A>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().any(|e| matches!(e, Effect::Future(_))),
            "Expected at least one Future effect, but none found"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatherly_core::{smallvec, SmallVec};

    #[derive(Clone, Debug, Default)]
    struct Tally {
        total: u32,
        last_error: Option<String>,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum TallyAction {
        Add(u32),
        Take(u32),
        Saved(u32),
    }

    struct TallyReducer;

    impl Reducer for TallyReducer {
        type State = Tally;
        type Action = TallyAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Tally,
            action: TallyAction,
            _env: &(),
        ) -> SmallVec<[Effect<TallyAction>; 4]> {
            match action {
                TallyAction::Add(n) => {
                    state.total += n;
                    let total = state.total;
                    smallvec![Effect::future(async move { Some(TallyAction::Saved(total)) })]
                },
                TallyAction::Take(n) => {
                    if let Some(total) = state.total.checked_sub(n) {
                        state.total = total;
                    } else {
                        state.last_error = Some("not enough".to_string());
                    }
                    SmallVec::new()
                },
                TallyAction::Saved(_) => SmallVec::new(),
            }
        }
    }

    #[test]
    fn test_single_action() {
        ReducerTest::new(TallyReducer)
            .with_env(())
            .given_state(Tally::default())
            .when_action(TallyAction::Add(3))
            .then_state(|state| assert_eq!(state.total, 3))
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn test_actions_apply_in_order() {
        ReducerTest::new(TallyReducer)
            .with_env(())
            .given_state(Tally::default())
            .when_action(TallyAction::Add(2))
            .when_action(TallyAction::Take(5))
            .then_state(|state| {
                assert_eq!(state.total, 2);
                assert_eq!(state.last_error.as_deref(), Some("not enough"));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[tokio::test]
    async fn test_feedback_from_effects() {
        let state = ReducerTest::new(TallyReducer)
            .with_env(())
            .given_state(Tally { total: 1, last_error: None })
            .when_action(TallyAction::Add(4))
            .then_effects(|effects| assertions::assert_effects_count(effects, 1))
            .then_feedback(|feedback| assert_eq!(feedback, [TallyAction::Saved(5)]))
            .run_with_effects()
            .await;

        assert_eq!(state.total, 5);
    }

    #[test]
    fn test_assertions_no_effects() {
        assertions::assert_no_effects::<TallyAction>(&[Effect::None]);
        assertions::assert_no_effects::<TallyAction>(&[]);
    }
}
