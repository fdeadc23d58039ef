//! Wall-clock helpers. Deadlines are milliseconds since the Unix epoch.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
pub type Timestamp = u128;

/// Current time in milliseconds since the Unix epoch.
///
/// A clock set before 1970 reads as zero.
#[must_use]
pub fn now_ms() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

/// Timestamp `offset` after `now_ms()`.
#[must_use]
pub fn after(offset: Duration) -> Timestamp {
    now_ms() + offset.as_millis()
}
