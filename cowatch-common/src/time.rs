//! Wall-clock helpers
//!
//! Snapshots carry `chrono` timestamps; elapsed time between two of them is
//! needed as fractional seconds for live extrapolation.

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Seconds elapsed from `earlier` to `later`, millisecond resolution.
///
/// Negative spans (clock skew between client and hub) collapse to zero.
pub fn elapsed_seconds(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    let millis = (later - earlier).num_milliseconds();
    if millis <= 0 {
        0.0
    } else {
        millis as f64 / 1000.0
    }
}
