//! Reconciliation of a finished timer into per-side feeding entries.
//!
//! A feed may hold many segments on the same side after repeated switching.
//! Reconciliation folds them into one total per side, drops sub-threshold
//! noise from accidental instant start/ends, and converts the survivors into
//! whole-minute log entries. The functions here are pure; the state machine
//! in [`crate::timer`] performs the actual writes.

use chrono::{DateTime, Utc};

use crate::clock;
use crate::segment::{FeedingSide, Segment};

/// Minimum aggregated per-side duration that produces a log entry.
pub const DEFAULT_NOISE_THRESHOLD_MS: i64 = 1_000;

/// Aggregated timing for one side of a finished feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideTotal {
    /// The side this total covers.
    pub side: FeedingSide,
    /// Start of the earliest segment on this side; used as the log entry's
    /// timestamp.
    pub started_at: DateTime<Utc>,
    /// Summed elapsed milliseconds across all segments on this side.
    pub total_ms: i64,
}

/// Group segments by side, summing durations.
///
/// Groups appear in first-use order. Because segments are chronological, the
/// first segment seen for a side also carries its earliest start time.
#[must_use]
pub fn side_totals(segments: &[Segment], now: DateTime<Utc>) -> Vec<SideTotal> {
    let mut totals: Vec<SideTotal> = Vec::new();
    for segment in segments {
        let duration = clock::elapsed(segment, now);
        match totals.iter_mut().find(|total| total.side == segment.side) {
            Some(total) => total.total_ms += duration,
            None => totals.push(SideTotal {
                side: segment.side,
                started_at: segment.start_time,
                total_ms: duration,
            }),
        }
    }
    totals
}

/// Aggregate a finished feed into the side totals worth logging.
///
/// Sides whose summed duration falls below `noise_threshold_ms` are dropped
/// entirely; an empty result is a legitimate outcome (the feed was ended
/// within the threshold of starting) and not an error.
#[must_use]
pub fn plan(segments: &[Segment], now: DateTime<Utc>, noise_threshold_ms: i64) -> Vec<SideTotal> {
    side_totals(segments, now)
        .into_iter()
        .filter(|total| total.total_ms >= noise_threshold_ms)
        .collect()
}

/// Convert a side total to whole minutes, rounding half up and flooring at
/// one minute: any side worth logging logs as at least a minute.
#[must_use]
pub fn duration_minutes(total_ms: i64) -> u32 {
    let minutes = (total_ms.max(0) + 30_000) / 60_000;
    u32::try_from(minutes.max(1)).unwrap_or(u32::MAX)
}

/// Human-readable summary of what was logged, e.g. `Left 12min + Right 8min`.
///
/// Returns an empty string when nothing was logged.
#[must_use]
pub fn summary(totals: &[SideTotal]) -> String {
    totals
        .iter()
        .map(|total| {
            format!(
                "{} {}min",
                total.side.short_label(),
                duration_minutes(total.total_ms)
            )
        })
        .collect::<Vec<_>>()
        .join(" + ")
}
