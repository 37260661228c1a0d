//! Timer document interpretation and legacy-format migration.
//!
//! Early versions of the tracker persisted a single-segment document:
//!
//! ```json
//! {"active": true, "side": "breast_left", "startTime": "2026-08-05T09:00:00Z"}
//! ```
//!
//! That shape is still a valid on-disk format. Reading it yields the
//! segment-list shape with one open segment, and the caller writes the
//! upgraded document back in place — a one-way, idempotent migration.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::segment::{FeedingSide, Segment, TimerState};

/// The pre-switching single-segment document shape.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyState {
    active: bool,
    side: FeedingSide,
    start_time: DateTime<Utc>,
}

/// Parse a stored timer document, upgrading the legacy shape if present.
///
/// Returns the state plus a flag telling the caller whether the document
/// was upgraded and should be persisted back. Returns `None` for anything
/// unreadable — corrupt JSON, an unrecognized shape, or an inactive legacy
/// document — all of which read as "no active timer".
#[must_use]
pub fn read_document(raw: &str) -> Option<(TimerState, bool)> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;

    // Current shape: the presence of a segment list is authoritative.
    if value.get("segments").is_some() {
        let state: TimerState = serde_json::from_value(value).ok()?;
        return Some((state, false));
    }

    let legacy: LegacyState = serde_json::from_value(value).ok()?;
    if !legacy.active {
        return None;
    }
    let state = TimerState {
        active: true,
        segments: vec![Segment::open(legacy.side, legacy.start_time)],
    };
    Some((state, true))
}
