//! General time utility functions

use chrono;

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    if let Some(ns) = duration.num_nanoseconds() {
        Some(ns as f64 / NANOS_PER_SECOND as f64)
    }
    else {
        None
    }
}

/// Convert a standard library duration into a chrono duration, or `None` if
/// out of range.
pub fn std_to_chrono(duration: std::time::Duration) -> Option<chrono::Duration> {
    chrono::Duration::from_std(duration).ok()
}

/// Whole milliseconds in a standard library duration, saturating at
/// `u64::MAX`.
pub fn duration_to_millis(duration: std::time::Duration) -> u64 {
    let ms = duration.as_millis();
    if ms > u64::MAX as u128 {
        u64::MAX
    }
    else {
        ms as u64
    }
}
