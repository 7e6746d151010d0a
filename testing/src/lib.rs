//! # Gatherly Testing
//!
//! Test support for Gatherly reducers:
//! - [`ReducerTest`]: Given-When-Then harness, optionally executing effects
//! - [`assertions`]: effect assertions
//! - [`mocks`]: deterministic environment implementations

pub mod reducer_test;

pub use reducer_test::{assertions, ReducerTest};

use chrono::{DateTime, Duration, Utc};
use gatherly_core::environment::Clock;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Duration, Utc};
    use std::sync::Mutex;

    /// Fixed clock for deterministic tests
    ///
    /// ```
    /// use gatherly_testing::mocks::FixedClock;
    /// use gatherly_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug)]
    pub struct FixedClock {
        time: Mutex<DateTime<Utc>>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Mutex::new(time),
            }
        }

        /// Move the clock forward.
        pub fn advance(&self, by: Duration) {
            if let Ok(mut time) = self.time.lock() {
                *time += by;
            }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
                .lock()
                .map_or_else(|poisoned| *poisoned.into_inner(), |time| *time)
        }
    }

    /// A fixed clock set to 2025-01-01 00:00:00 UTC
    ///
    /// # Panics
    ///
    /// Never in practice: the timestamp is a constant.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

pub use mocks::{test_clock, FixedClock};
