//! Process-wide nanosecond clock used for every `TxResult` and sample timestamp.
//!
//! Anchored to wall-clock time once, then advanced by `Instant`, so readings never
//! go backwards and stay roughly comparable between processes.

use once_cell::sync::Lazy;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

static EPOCH: Lazy<(Instant, i64)> = Lazy::new(|| {
    let wall = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0);
    (Instant::now(), wall)
});

/// Current time in nanoseconds. Always positive and non-decreasing.
pub fn now_nanos() -> i64 {
    let (anchor, wall) = *EPOCH;
    let elapsed = anchor.elapsed().as_nanos() as i64;
    wall.saturating_add(elapsed).max(1)
}
