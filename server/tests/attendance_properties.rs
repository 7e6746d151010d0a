//! Property tests for the attendance reducer.

#![allow(clippy::unwrap_used)]

use chrono::NaiveDate;
use gatherly_core::{environment::Clock, reducer::Reducer};
use gatherly_server::aggregates::{
    AttendanceAction, AttendanceEnvironment, AttendanceReducer, AttendanceState,
};
use gatherly_server::store::InMemoryEventRepository;
use gatherly_server::types::{Event, EventDetails, EventId, UserId};
use gatherly_testing::test_clock;
use proptest::prelude::*;
use std::sync::Arc;

fn capacity(event: &Event) -> u64 {
    u64::from(event.slots) + u64::try_from(event.attendees.len()).unwrap()
}

proptest! {
    #[test]
    fn attendees_stay_unique_and_capacity_never_shrinks(
        initial_slots in 0u32..6,
        ops in prop::collection::vec((0usize..4, any::<bool>()), 0..40),
    ) {
        let clock = test_clock();
        let env = AttendanceEnvironment::new(
            Arc::new(test_clock()),
            Arc::new(InMemoryEventRepository::new()),
        );
        let users: Vec<UserId> = (0..4).map(|_| UserId::new()).collect();
        let event = Event::new(
            EventId::new(),
            UserId::new(),
            EventDetails {
                title: "Property".to_string(),
                description: String::new(),
                date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                location: "Anywhere".to_string(),
                slots: initial_slots,
            },
            clock.now(),
        );
        let event_id = event.id;
        let reducer = AttendanceReducer::new();
        let mut state = AttendanceState::loaded(event);

        for (user, is_join) in ops {
            let before = state.event().unwrap().clone();
            let user_id = users[user];
            let action = if is_join {
                AttendanceAction::Join { event_id, user_id }
            } else {
                AttendanceAction::Leave { event_id, user_id }
            };

            let effects = reducer.reduce(&mut state, action, &env);
            let after = state.event().unwrap();

            let mut unique = after.attendees.clone();
            unique.sort_unstable();
            unique.dedup();
            prop_assert_eq!(unique.len(), after.attendees.len());
            prop_assert!(capacity(after) >= u64::from(initial_slots));

            if state.last_error.is_some() {
                prop_assert!(is_join);
                prop_assert_eq!(after, &before);
                prop_assert!(effects.is_empty());
            } else if is_join {
                prop_assert_eq!(capacity(after), capacity(&before));
                prop_assert!(after.is_attending(user_id));
                prop_assert_eq!(after.version, before.version + 1);
            } else {
                let remaining: Vec<UserId> = before
                    .attendees
                    .iter()
                    .copied()
                    .filter(|attendee| *attendee != user_id)
                    .collect();
                prop_assert_eq!(&after.attendees, &remaining);
                prop_assert_eq!(after.slots, before.slots + 1);
            }
        }
    }
}
