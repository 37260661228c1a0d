//! Pure time arithmetic over timer segments.
//!
//! Everything in this module is a side-effect-free function of segments and
//! an explicit `now`; both the display refresher and the reconciliation step
//! consume it. Negative intervals (clock skew, hand-edited documents) clamp
//! to zero rather than erroring.

use chrono::{DateTime, Utc};

use crate::segment::{FeedingSide, Segment};

/// Elapsed milliseconds for one segment, using `now` for an open end.
#[must_use]
pub fn elapsed(segment: &Segment, now: DateTime<Utc>) -> i64 {
    let end = segment.end_time.unwrap_or(now);
    (end - segment.start_time).num_milliseconds().max(0)
}

/// Total elapsed milliseconds across all segments.
///
/// This drives the running `HH:MM:SS` display.
#[must_use]
pub fn total_elapsed(segments: &[Segment], now: DateTime<Utc>) -> i64 {
    segments.iter().map(|segment| elapsed(segment, now)).sum()
}

/// Aggregated left/right milliseconds for the live "L / R" readout.
///
/// Only the two switchable sides are counted here; `breast_both` and
/// `bottle` segments are excluded from this readout (but not from
/// reconciliation).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BreastTimes {
    /// Milliseconds accumulated on the left breast.
    pub left_ms: i64,
    /// Milliseconds accumulated on the right breast.
    pub right_ms: i64,
}

/// Sum elapsed time per switchable side.
#[must_use]
pub fn breast_times(segments: &[Segment], now: DateTime<Utc>) -> BreastTimes {
    let mut times = BreastTimes::default();
    for segment in segments {
        match segment.side {
            FeedingSide::BreastLeft => times.left_ms += elapsed(segment, now),
            FeedingSide::BreastRight => times.right_ms += elapsed(segment, now),
            FeedingSide::BreastBoth | FeedingSide::Bottle => {}
        }
    }
    times
}

/// Format milliseconds as zero-padded `MM:SS`.
///
/// Minutes are not folded into hours; a 75-minute readout renders as
/// `75:30`.
#[must_use]
pub fn format_short(ms: i64) -> String {
    let total_secs = ms.max(0) / 1000;
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}

/// Format milliseconds as zero-padded `HH:MM:SS`.
#[must_use]
pub fn format_long(ms: i64) -> String {
    let total_secs = ms.max(0) / 1000;
    format!(
        "{:02}:{:02}:{:02}",
        total_secs / 3600,
        (total_secs % 3600) / 60,
        total_secs % 60
    )
}
