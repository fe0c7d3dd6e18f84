//! Testing utilities and helpers for the recorder.
//!
//! This crate provides:
//! - Mock clocks for deterministic reducer tests
//! - The [`ReducerTest`] Given-When-Then harness
//! - Property-based testing configuration
//!
//! ## Example
//!
//! ```ignore
//! use codeblue_testing::{ReducerTest, assertions, test_clock};
//!
//! ReducerTest::new(SessionReducer::new())
//!     .with_env(SessionEnvironment::new(Arc::new(test_clock())))
//!     .given_state(SessionState::new())
//!     .when_action(SessionAction::StartCode { rhythm: Rhythm::Vf })
//!     .then_state(|state| assert!(state.is_active))
//!     .then_effects(assertions::assert_has_delay_effect)
//!     .run();
//! ```

use chrono::{DateTime, TimeDelta, Utc};
use codeblue_core::environment::Clock;

pub mod reducer_test;

/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, TimeDelta, Utc};
    use std::sync::{Arc, RwLock};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use codeblue_testing::mocks::FixedClock;
    /// use codeblue_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that tests can move forward between dispatches.
    ///
    /// Clones share the same underlying instant, so a test can keep one
    /// handle and hand another to the environment. Useful for exercising
    /// the wall-clock medication debounce without real sleeping.
    #[derive(Debug, Clone)]
    pub struct AdjustableClock {
        time: Arc<RwLock<DateTime<Utc>>>,
    }

    impl AdjustableClock {
        /// Create a new adjustable clock starting at `time`
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(RwLock::new(time)),
            }
        }

        /// Set the clock to an absolute time
        #[allow(clippy::unwrap_used)] // Lock poison is unrecoverable in tests
        pub fn set(&self, time: DateTime<Utc>) {
            *self.time.write().unwrap() = time;
        }

        /// Move the clock forward by `delta`
        #[allow(clippy::unwrap_used)] // Lock poison is unrecoverable in tests
        pub fn advance(&self, delta: TimeDelta) {
            let mut time = self.time.write().unwrap();
            *time += delta;
        }
    }

    impl Clock for AdjustableClock {
        #[allow(clippy::unwrap_used)] // Lock poison is unrecoverable in tests
        fn now(&self) -> DateTime<Utc> {
            *self.time.read().unwrap()
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
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

/// Property-based testing configuration.
pub mod properties {
    use proptest::prelude::ProptestConfig;

    /// Shared proptest configuration for the workspace test suites.
    #[must_use]
    pub fn config() -> ProptestConfig {
        ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        }
    }
}

// Re-export commonly used items
pub use mocks::{AdjustableClock, FixedClock, test_clock};
pub use reducer_test::{ReducerTest, assertions};
