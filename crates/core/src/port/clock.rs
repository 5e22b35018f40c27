// Clock Port (for testability)

use chrono::{DateTime, Utc};

/// Clock interface (allows deterministic time in tests)
///
/// Shared by reference between every recurring task that reads it. Production
/// code only ever reads the clock; advancing time is reserved for test doubles.
pub trait Clock: Send + Sync {
    /// Get the current instant
    fn now(&self) -> DateTime<Utc>;
}

/// System clock (production)
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use chrono::Duration;
    use std::sync::Mutex;

    /// 2000-01-01T00:00:00Z, the instant every FakeClock starts at by default
    pub const FAKE_CLOCK_START_SECS: i64 = 946_684_800;

    /// Controllable clock for deterministic tests
    ///
    /// Time only moves when the test calls [`FakeClock::advance`] or
    /// [`FakeClock::set`].
    pub struct FakeClock {
        current: Mutex<DateTime<Utc>>,
    }

    impl FakeClock {
        /// Start at 2000-01-01T00:00:00Z
        pub fn new() -> Self {
            Self::starting_at(DateTime::from_timestamp(FAKE_CLOCK_START_SECS, 0).unwrap())
        }

        pub fn starting_at(instant: DateTime<Utc>) -> Self {
            Self {
                current: Mutex::new(instant),
            }
        }

        /// Move the simulated instant forward by `by`
        pub fn advance(&self, by: Duration) {
            let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
            *current += by;
        }

        /// Jump to an absolute instant
        pub fn set(&self, instant: DateTime<Utc>) {
            *self.current.lock().unwrap_or_else(|e| e.into_inner()) = instant;
        }
    }

    impl Default for FakeClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> DateTime<Utc> {
            *self.current.lock().unwrap_or_else(|e| e.into_inner())
        }
    }
}
