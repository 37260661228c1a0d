//! Core timer state types for feedclock.
//!
//! This module defines the persisted timer document: which feeding side is
//! being timed and the ordered list of time segments accumulated so far.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The feeding modality a segment is timing.
///
/// Only [`FeedingSide::BreastLeft`] and [`FeedingSide::BreastRight`] can be
/// switched between mid-timer; the other sides run as a single segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedingSide {
    /// Left breast.
    BreastLeft,
    /// Right breast.
    BreastRight,
    /// Both breasts, timed as one block.
    BreastBoth,
    /// Bottle feeding.
    Bottle,
}

impl FeedingSide {
    /// Whether this side participates in mid-timer switching.
    #[must_use]
    pub fn is_switchable(self) -> bool {
        matches!(self, Self::BreastLeft | Self::BreastRight)
    }

    /// The side a switch lands on, if this side is switchable.
    #[must_use]
    pub fn opposite(self) -> Option<Self> {
        match self {
            Self::BreastLeft => Some(Self::BreastRight),
            Self::BreastRight => Some(Self::BreastLeft),
            Self::BreastBoth | Self::Bottle => None,
        }
    }

    /// Full display label, as shown above the running timer.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::BreastLeft => "Left Breast",
            Self::BreastRight => "Right Breast",
            Self::BreastBoth => "Both Breasts",
            Self::Bottle => "Bottle",
        }
    }

    /// Short display label, as used in logged-feeding summaries.
    #[must_use]
    pub fn short_label(self) -> &'static str {
        match self {
            Self::BreastLeft => "Left",
            Self::BreastRight => "Right",
            Self::BreastBoth => "Both",
            Self::Bottle => "Bottle",
        }
    }
}

impl std::fmt::Display for FeedingSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BreastLeft => write!(f, "breast_left"),
            Self::BreastRight => write!(f, "breast_right"),
            Self::BreastBoth => write!(f, "breast_both"),
            Self::Bottle => write!(f, "bottle"),
        }
    }
}

/// One contiguous timed interval on a single side.
///
/// A `None` end time means the segment is still running. At most one segment
/// per [`TimerState`] may be open, and it is always the last element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    /// The side being timed.
    pub side: FeedingSide,
    /// When this segment started.
    pub start_time: DateTime<Utc>,
    /// When this segment ended, or `None` while it is running.
    pub end_time: Option<DateTime<Utc>>,
}

impl Segment {
    /// Create a new open segment starting at the given instant.
    #[must_use]
    pub fn open(side: FeedingSide, start_time: DateTime<Utc>) -> Self {
        Self {
            side,
            start_time,
            end_time: None,
        }
    }

    /// Whether this segment is still running.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }
}

/// The persisted timer document.
///
/// Serialized with camelCase keys so documents written by earlier versions
/// of the tracker keep reading back byte-for-byte.
///
/// Invariants while `active` is true: `segments` is non-empty, exactly one
/// segment is open, and the open segment is the last element. Segment order
/// is chronological and never rearranged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    /// Whether a timer is currently running.
    pub active: bool,
    /// Ordered time segments; insertion order is chronological order.
    pub segments: Vec<Segment>,
}

impl TimerState {
    /// Start a fresh timer with one open segment at the given instant.
    #[must_use]
    pub fn begin(side: FeedingSide, now: DateTime<Utc>) -> Self {
        Self {
            active: true,
            segments: vec![Segment::open(side, now)],
        }
    }

    /// Whether this document describes a running timer.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active && !self.segments.is_empty()
    }

    /// The currently running segment, if any.
    #[must_use]
    pub fn open_segment(&self) -> Option<&Segment> {
        self.segments.last().filter(|segment| segment.is_open())
    }

    /// The side currently being timed.
    #[must_use]
    pub fn current_side(&self) -> Option<FeedingSide> {
        self.segments.last().map(|segment| segment.side)
    }

    /// Whether a side switch is currently legal.
    #[must_use]
    pub fn can_switch(&self) -> bool {
        self.is_active()
            && self
                .current_side()
                .is_some_and(FeedingSide::is_switchable)
    }

    /// Close the current segment at `now` and open one on the opposite side
    /// at the same instant, so consecutive segments stay contiguous.
    ///
    /// Returns the new side, or `None` when the switch preconditions do not
    /// hold (inactive timer, or a non-switchable side); the state is left
    /// untouched in that case.
    pub fn switch_side(&mut self, now: DateTime<Utc>) -> Option<FeedingSide> {
        if !self.is_active() {
            return None;
        }
        let current = self.segments.last_mut()?;
        let next = current.side.opposite()?;
        current.end_time = Some(now);
        self.segments.push(Segment::open(next, now));
        Some(next)
    }

    /// Close the open segment at `now`, if one exists.
    pub fn close(&mut self, now: DateTime<Utc>) {
        if let Some(segment) = self.segments.last_mut() {
            if segment.is_open() {
                segment.end_time = Some(now);
            }
        }
    }
}
