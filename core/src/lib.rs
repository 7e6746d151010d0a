//! # Gatherly Core
//!
//! The functional core shared by every Gatherly aggregate.
//!
//! - **State**: the loaded document a feature operates on
//! - **Action**: commands (intent) and events (facts) fed to a reducer
//! - **Reducer**: `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: a description of I/O, executed later by an application service
//! - **Environment**: injected dependencies (clock, repositories)
//!
//! Reducers never touch the network or the database. They validate a
//! command against the current state, apply the resulting event, and hand
//! back effects that persist it. The caller decides when those effects run.
//!
//! ## Example
//!
//! ```
//! use gatherly_core::{effect::Effect, reducer::Reducer, SmallVec};
//!
//! #[derive(Default)]
//! struct Counter {
//!     value: u32,
//! }
//!
//! enum CounterAction {
//!     Increment,
//! }
//!
//! struct CounterReducer;
//!
//! impl Reducer for CounterReducer {
//!     type State = Counter;
//!     type Action = CounterAction;
//!     type Environment = ();
//!
//!     fn reduce(
//!         &self,
//!         state: &mut Counter,
//!         action: CounterAction,
//!         _env: &(),
//!     ) -> SmallVec<[Effect<CounterAction>; 4]> {
//!         match action {
//!             CounterAction::Increment => state.value += 1,
//!         }
//!         SmallVec::new()
//!     }
//! }
//!
//! let mut state = Counter::default();
//! let effects = CounterReducer.reduce(&mut state, CounterAction::Increment, &());
//! assert_eq!(state.value, 1);
//! assert!(effects.is_empty());
//! ```

#![forbid(unsafe_code)]

pub use chrono::{DateTime, Utc};
pub use smallvec::{smallvec, SmallVec};

/// The reducer trait - all business rules live behind it.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// Pure state transition function.
    ///
    /// Implementations must be deterministic given the same state, action and
    /// environment: time comes from the environment's clock, never from the
    /// system directly.
    pub trait Reducer {
        /// The state this reducer mutates
        type State;

        /// Commands and events this reducer understands
        type Action;

        /// Injected dependencies
        type Environment;

        /// Apply `action` to `state`, returning the effects to execute.
        ///
        /// Rejected commands must leave the domain data untouched and return
        /// no effects.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect descriptions and their executor.
pub mod effect {
    use futures::future::{join_all, BoxFuture};
    use std::future::Future;
    use std::pin::Pin;

    /// A side effect returned by a reducer.
    ///
    /// Effects are values. Nothing happens until [`Effect::run`] (or
    /// [`execute`]) is awaited, and the actions they yield are fed back to
    /// whoever executes them.
    pub enum Effect<Action> {
        /// Nothing to do
        None,

        /// Run effects concurrently
        Parallel(Vec<Effect<Action>>),

        /// Run effects one after another, in order
        Sequential(Vec<Effect<Action>>),

        /// Arbitrary async work, optionally producing a feedback action
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Wrap a future as an effect.
        pub fn future<F>(future: F) -> Self
        where
            F: Future<Output = Option<Action>> + Send + 'static,
        {
            Effect::Future(Box::pin(future))
        }

        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Chain effects to run sequentially
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }
    }

    impl<Action> Effect<Action>
    where
        Action: Send + 'static,
    {
        /// Execute this effect, returning every feedback action it produced.
        ///
        /// Sequential children keep their order in the output; parallel
        /// children are reported in declaration order once all have finished.
        pub fn run(self) -> BoxFuture<'static, Vec<Action>> {
            Box::pin(async move {
                match self {
                    Effect::None => Vec::new(),
                    Effect::Future(future) => future.await.into_iter().collect(),
                    Effect::Sequential(effects) => {
                        let mut produced = Vec::new();
                        for effect in effects {
                            produced.extend(effect.run().await);
                        }
                        produced
                    },
                    Effect::Parallel(effects) => join_all(effects.into_iter().map(Effect::run))
                        .await
                        .into_iter()
                        .flatten()
                        .collect(),
                }
            })
        }
    }

    /// Execute a batch of effects returned by one `reduce` call, in order.
    pub async fn execute<Action, I>(effects: I) -> Vec<Action>
    where
        Action: Send + 'static,
        I: IntoIterator<Item = Effect<Action>>,
    {
        Effect::Sequential(effects.into_iter().collect()).run().await
    }
}

/// Dependencies injected into reducers.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Source of the current time.
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall clock.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
