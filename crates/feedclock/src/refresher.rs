//! The display refresher: a periodic, read-only projection of timer state.
//!
//! Once a second the refresher loads the persisted state, computes the
//! running totals, and hands a [`DisplayFrame`] to an injected [`Renderer`].
//! It never mutates state, and at most one tick task exists at a time:
//! starting the refresher first cancels any previously scheduled task, so
//! repeated opens never accumulate duplicate timers.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, warn};

use crate::clock;
use crate::segment::{FeedingSide, TimerState};
use crate::storage::StateStore;

/// The live left/right readout, shown only for switchable feeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreastReadout {
    /// Accumulated left time, formatted `MM:SS`.
    pub left: String,
    /// Accumulated right time, formatted `MM:SS`.
    pub right: String,
    /// The side currently being timed.
    pub active: FeedingSide,
}

/// One rendered projection of the running timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayFrame {
    /// The side currently being timed.
    pub side: FeedingSide,
    /// Full display label for the current side.
    pub side_label: &'static str,
    /// Total elapsed across all segments, formatted `HH:MM:SS`.
    pub total: String,
    /// Per-breast readout; present only while the current side is
    /// switchable.
    pub breast: Option<BreastReadout>,
}

impl DisplayFrame {
    /// Project a timer state at `now`, or `None` for an inactive timer.
    #[must_use]
    pub fn project(state: &TimerState, now: DateTime<Utc>) -> Option<Self> {
        if !state.is_active() {
            return None;
        }
        let side = state.current_side()?;

        let breast = side.is_switchable().then(|| {
            let times = clock::breast_times(&state.segments, now);
            BreastReadout {
                left: clock::format_short(times.left_ms),
                right: clock::format_short(times.right_ms),
                active: side,
            }
        });

        Some(Self {
            side,
            side_label: side.label(),
            total: clock::format_long(clock::total_elapsed(&state.segments, now)),
            breast,
        })
    }

    /// Whether a side switch is currently available.
    #[must_use]
    pub fn can_switch(&self) -> bool {
        self.side.is_switchable()
    }
}

/// Sink for display frames.
pub trait Renderer: Send + Sync {
    /// Render one frame.
    fn render(&self, frame: &DisplayFrame);

    /// Remove any rendered output; called when the timer goes idle.
    fn clear(&self);
}

/// A cancellable repeating projection task.
#[derive(Debug)]
pub struct DisplayRefresher {
    interval: Duration,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl DisplayRefresher {
    /// Create a refresher with the given tick interval.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ticker: Arc::new(Mutex::new(None)),
        }
    }

    /// Start ticking against the given store and renderer.
    ///
    /// Any previously scheduled tick task is cancelled first. The first
    /// frame renders immediately; the task stops on its own once the store
    /// reports no active timer, clearing the renderer on the way out.
    pub async fn start<S>(&self, store: Arc<Mutex<S>>, renderer: Arc<dyn Renderer>)
    where
        S: StateStore + 'static,
    {
        let mut guard = self.ticker.lock().await;
        if let Some(handle) = guard.take() {
            handle.abort();
            debug!("Cancelled previous display refresher");
        }

        let interval = self.interval;
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            loop {
                ticker.tick().await;

                let state = match store.lock().await.load() {
                    Ok(state) => state,
                    Err(err) => {
                        warn!("Display refresh could not read timer state: {err}");
                        break;
                    }
                };

                match state.and_then(|state| DisplayFrame::project(&state, Utc::now())) {
                    Some(frame) => renderer.render(&frame),
                    None => {
                        renderer.clear();
                        break;
                    }
                }
            }
        });

        *guard = Some(handle);
    }

    /// Cancel the tick task, if one is scheduled.
    pub async fn stop(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }

    /// Whether a tick task is currently scheduled and alive.
    pub async fn is_running(&self) -> bool {
        self.ticker
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}
