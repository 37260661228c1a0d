//! `feedclock` - A resumable breastfeeding timer with feeding-log reconciliation
//!
//! This library provides the timer subsystem of a household caregiving log:
//! a durably persisted, multi-segment elapsed-time tracker that survives
//! restarts, switches sides any number of times, and reconciles the
//! accumulated per-side durations into backend feeding records.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod api;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod reconcile;
pub mod refresher;
pub mod segment;
pub mod storage;
pub mod timer;

pub use api::{FeedingCreate, FeedingLog, FeedingRecord, HttpFeedingLog};
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use refresher::{DisplayFrame, DisplayRefresher, Renderer};
pub use segment::{FeedingSide, Segment, TimerState};
pub use storage::{MemoryStore, SqliteStore, StateStore};
pub use timer::{FeedingTimer, FlushOutcome, TimerPhase};
