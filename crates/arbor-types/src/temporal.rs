use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Default release date: released since the epoch.
pub const DATE_RELEASED_DEFAULT: i64 = 0;

/// Default expiration date: never expires.
pub const DATE_EXPIRED_DEFAULT: i64 = i64::MAX;

/// Sentinel request time meaning "ignore the validity window entirely".
pub const TIME_IGNORE: i64 = i64::MIN;

/// Reported for dates and lengths that do not apply (e.g. on folders).
pub const ABSENT: i64 = -1;

/// Milliseconds since the UNIX epoch for the current wall-clock time.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Release/expire interval of a resource.
///
/// A resource is valid at time `t` iff `released < t < expired`. The
/// [`TIME_IGNORE`] sentinel is valid regardless of the window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidityWindow {
    /// Milliseconds since epoch after which the resource is released.
    pub released: i64,
    /// Milliseconds since epoch after which the resource is expired.
    pub expired: i64,
}

impl ValidityWindow {
    pub const fn new(released: i64, expired: i64) -> Self {
        Self { released, expired }
    }

    /// The default window: released at the epoch, never expires.
    pub const fn unbounded() -> Self {
        Self::new(DATE_RELEASED_DEFAULT, DATE_EXPIRED_DEFAULT)
    }

    pub fn is_expired(&self, time: i64) -> bool {
        time > self.expired && time != TIME_IGNORE
    }

    pub fn is_released(&self, time: i64) -> bool {
        time > self.released || time == TIME_IGNORE
    }

    /// Released and not yet expired at `time`.
    pub fn is_valid(&self, time: i64) -> bool {
        (time < self.expired && time > self.released) || time == TIME_IGNORE
    }
}

impl Default for ValidityWindow {
    fn default() -> Self {
        Self::unbounded()
    }
}
