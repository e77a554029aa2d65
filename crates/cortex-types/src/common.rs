//! Common identifier and timestamp helpers shared across cortex crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generic opaque identifier.
pub type Id = Uuid;

/// Generate a fresh random identifier.
pub fn new_id() -> Id {
    Uuid::new_v4()
}

/// Current wall-clock time.
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Monotonic-milliseconds representation of a timestamp, used wherever the
/// domain model calls for a bare integer instant rather than a calendar time.
pub fn millis_since_epoch(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

/// Milliseconds elapsed between two timestamps, floored at zero.
pub fn millis_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> i64 {
    (later - earlier).num_milliseconds().max(0)
}

/// Seconds elapsed between two timestamps as a float, used by decay and
/// eviction scoring formulas.
pub fn seconds_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    millis_between(earlier, later) as f64 / 1000.0
}

/// Feedback polarity attached to an `Experience` outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedbackType {
    Positive,
    Negative,
    Neutral,
}

/// Clamp a value into `[lo, hi]`.
pub fn clamp(value: f64, lo: f64, hi: f64) -> f64 {
    value.max(lo).min(hi)
}

/// Clamp a value into `[0, 1]`.
pub fn clamp01(value: f64) -> f64 {
    clamp(value, 0.0, 1.0)
}
