//! Clock adapters.

use chrono::Duration;
use parking_lot::Mutex;

use crate::application::ports::Clock;
use crate::domain::shared::Timestamp;

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Timestamp>,
}

impl ManualClock {
    /// Start at `now`.
    #[must_use]
    pub const fn new(now: Timestamp) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Start at a Unix time in milliseconds (wall-clock now if out of range).
    #[must_use]
    pub fn at_millis(millis: i64) -> Self {
        Self::new(Timestamp::from_unix_millis(millis).unwrap_or_default())
    }

    /// Jump to `now`.
    pub fn set(&self, now: Timestamp) {
        *self.now.lock() = now;
    }

    /// Jump to a Unix time in milliseconds.
    pub fn set_millis(&self, millis: i64) {
        if let Some(now) = Timestamp::from_unix_millis(millis) {
            self.set(now);
        }
    }

    /// Move forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now = now.plus(by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock()
    }
}
