//! The feeding timer state machine.
//!
//! [`FeedingTimer`] owns the transitions over the persisted timer document:
//! start, switch side, and the two-step end confirmation. Persistence and
//! the feeding log are injected ports, so the machine is testable with an
//! in-memory store and a recording log.
//!
//! Ordering guarantee: every mutating operation persists before returning,
//! so a display refresh that follows a transition can never render state
//! storage does not hold.

use chrono::Utc;
use futures::future;
use tracing::{debug, info, warn};

use crate::api::{FeedingCreate, FeedingLog};
use crate::error::{Error, Result};
use crate::reconcile::{self, SideTotal};
use crate::segment::{FeedingSide, TimerState};
use crate::storage::StateStore;

/// The machine's confirmation phase.
///
/// `EndPending` is deliberately not persisted: it is a transient
/// confirmation mode, and losing it on restart just means the caregiver is
/// asked again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerPhase {
    /// No timer is running.
    #[default]
    Idle,
    /// A timer is running.
    Running,
    /// A timer is running and an end has been requested but not confirmed.
    EndPending,
}

/// What a confirmed end actually logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushOutcome {
    /// The per-side totals that produced log entries, in first-use order.
    /// Empty when the whole feed fell below the noise threshold — a
    /// legitimate outcome, not an error.
    pub logged: Vec<SideTotal>,
    /// Human-readable summary, e.g. `Left 12min + Right 8min`.
    pub summary: String,
}

impl FlushOutcome {
    /// Whether the feed produced no log entries at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.logged.is_empty()
    }
}

/// The feeding timer state machine.
#[derive(Debug)]
pub struct FeedingTimer<S, L> {
    store: S,
    log: L,
    noise_threshold_ms: i64,
    phase: TimerPhase,
}

impl<S: StateStore, L: FeedingLog> FeedingTimer<S, L> {
    /// Build a machine over the given ports, deriving the phase from
    /// whatever document the store currently holds.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial store read fails.
    pub fn new(mut store: S, log: L, noise_threshold_ms: i64) -> Result<Self> {
        let phase = match store.load()? {
            Some(state) if state.is_active() => TimerPhase::Running,
            _ => TimerPhase::Idle,
        };
        Ok(Self {
            store,
            log,
            noise_threshold_ms,
            phase,
        })
    }

    /// The current confirmation phase.
    #[must_use]
    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    /// The currently persisted timer state, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub fn state(&mut self) -> Result<Option<TimerState>> {
        self.store.load()
    }

    /// Start a timer on the given side.
    ///
    /// Starting over a live timer is rejected rather than silently
    /// overwriting it; the caller must end or cancel the running feed
    /// first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TimerActive`] if a timer is already running, or a
    /// storage error if persisting fails.
    pub fn start(&mut self, side: FeedingSide) -> Result<TimerState> {
        if self.phase != TimerPhase::Idle {
            return Err(Error::TimerActive);
        }
        if self.store.load()?.is_some_and(|state| state.is_active()) {
            // Another widget instance left a live document behind.
            self.phase = TimerPhase::Running;
            return Err(Error::TimerActive);
        }

        let state = TimerState::begin(side, Utc::now());
        self.store.save(&state)?;
        self.phase = TimerPhase::Running;
        info!("Started feeding timer on {side}");
        Ok(state)
    }

    /// Switch the running timer to the opposite breast.
    ///
    /// A silent no-op when there is nothing to switch: no running timer,
    /// or a side that does not participate in switching. Those indicate a
    /// stale caller, not a failure.
    ///
    /// # Errors
    ///
    /// Returns an error only if storage fails.
    pub fn switch_side(&mut self) -> Result<Option<FeedingSide>> {
        if self.phase != TimerPhase::Running {
            debug!("Ignoring side switch in phase {:?}", self.phase);
            return Ok(None);
        }
        let Some(mut state) = self.store.load()? else {
            self.phase = TimerPhase::Idle;
            return Ok(None);
        };

        let Some(next) = state.switch_side(Utc::now()) else {
            debug!("Ignoring side switch on non-switchable side");
            return Ok(None);
        };
        self.store.save(&state)?;
        info!("Switched feeding timer to {next}");
        Ok(Some(next))
    }

    /// Request that the timer end.
    ///
    /// Moves `Running` to `EndPending` without touching the persisted
    /// state; a confirming call must follow before anything is written.
    /// Returns whether the request took effect.
    pub fn request_end(&mut self) -> bool {
        if self.phase == TimerPhase::Running {
            self.phase = TimerPhase::EndPending;
            true
        } else {
            debug!("Ignoring end request in phase {:?}", self.phase);
            false
        }
    }

    /// Cancel a pending end, returning to `Running`.
    ///
    /// A pure rollback of the confirmation mode; segments are untouched.
    /// Returns whether there was a pending end to cancel.
    pub fn cancel_end(&mut self) -> bool {
        if self.phase == TimerPhase::EndPending {
            self.phase = TimerPhase::Running;
            true
        } else {
            false
        }
    }

    /// Confirm a pending end: reconcile and clear.
    ///
    /// Closes the open segment at "now" on a working copy, aggregates
    /// per-side totals, and posts one log entry per side concurrently.
    /// Only when every post succeeds is the persisted state cleared; on
    /// any failure the stored document is left exactly as it was (the
    /// closing edit was never written) and the machine drops back to
    /// `Running` so the whole confirmation can be retried.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EndNotRequested`] when no end is pending,
    /// [`Error::NoActiveTimer`] when the store holds no live document, an
    /// API error when any post fails, or a storage error from the final
    /// clear.
    pub async fn confirm_end(&mut self) -> Result<FlushOutcome> {
        if self.phase != TimerPhase::EndPending {
            return Err(Error::EndNotRequested);
        }

        let Some(mut state) = self.store.load()? else {
            self.phase = TimerPhase::Idle;
            return Err(Error::NoActiveTimer);
        };

        let now = Utc::now();
        state.close(now);
        let totals = reconcile::plan(&state.segments, now, self.noise_threshold_ms);

        let entries: Vec<FeedingCreate> = totals
            .iter()
            .map(|total| {
                FeedingCreate::timed(
                    total.side,
                    total.started_at,
                    reconcile::duration_minutes(total.total_ms),
                )
            })
            .collect();

        let log = &self.log;
        let results =
            future::join_all(entries.iter().map(|entry| log.create_feeding(entry))).await;

        if let Some(err) = results.into_iter().find_map(std::result::Result::err) {
            warn!("Feeding log write failed; keeping timer state: {err}");
            self.phase = TimerPhase::Running;
            return Err(err);
        }

        self.store.clear()?;
        self.phase = TimerPhase::Idle;

        let summary = reconcile::summary(&totals);
        if summary.is_empty() {
            info!("Feeding timer ended below the noise threshold; nothing logged");
        } else {
            info!("Feeding logged: {summary}");
        }
        Ok(FlushOutcome {
            logged: totals,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FeedingRecord;
    use crate::segment::Segment;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, Utc};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// Records every create call; optionally fails all of them.
    #[derive(Debug, Default)]
    struct RecordingLog {
        calls: Mutex<Vec<FeedingCreate>>,
        fail: AtomicBool,
    }

    impl RecordingLog {
        fn failing() -> Self {
            let log = Self::default();
            log.fail.store(true, Ordering::SeqCst);
            log
        }

        fn calls(&self) -> Vec<FeedingCreate> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl FeedingLog for RecordingLog {
        async fn create_feeding(&self, entry: &FeedingCreate) -> Result<FeedingRecord> {
            self.calls.lock().unwrap().push(entry.clone());
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::api_status(500, "log unavailable"));
            }
            Ok(FeedingRecord {
                id: 1,
                timestamp: entry.timestamp.unwrap_or_else(Utc::now),
                feeding_type: entry.feeding_type,
                duration_minutes: entry.duration_minutes,
                amount_oz: entry.amount_oz,
                notes: entry.notes.clone(),
            })
        }

        async fn recent_feedings(&self, _limit: usize) -> Result<Vec<FeedingRecord>> {
            Ok(Vec::new())
        }
    }

    fn seeded_store(segments: Vec<Segment>) -> MemoryStore {
        let state = TimerState {
            active: true,
            segments,
        };
        MemoryStore::with_document(serde_json::to_string(&state).unwrap())
    }

    fn closed(side: FeedingSide, start: DateTime<Utc>, secs: i64) -> Segment {
        Segment {
            side,
            start_time: start,
            end_time: Some(start + Duration::seconds(secs)),
        }
    }

    fn timer_over(
        store: MemoryStore,
    ) -> FeedingTimer<MemoryStore, RecordingLog> {
        FeedingTimer::new(store, RecordingLog::default(), 1_000).unwrap()
    }

    #[tokio::test]
    async fn test_start_persists_before_returning() {
        let mut timer = timer_over(MemoryStore::new());
        assert_eq!(timer.phase(), TimerPhase::Idle);

        let state = timer.start(FeedingSide::BreastLeft).unwrap();
        assert_eq!(timer.phase(), TimerPhase::Running);
        assert_eq!(state.segments.len(), 1);

        let stored = timer.state().unwrap().expect("persisted state");
        assert_eq!(stored, state);
    }

    #[tokio::test]
    async fn test_double_start_is_rejected() {
        let mut timer = timer_over(MemoryStore::new());
        timer.start(FeedingSide::BreastLeft).unwrap();

        let err = timer.start(FeedingSide::BreastRight).unwrap_err();
        assert!(err.is_timer_active());

        // The original timer is untouched
        let stored = timer.state().unwrap().unwrap();
        assert_eq!(stored.current_side(), Some(FeedingSide::BreastLeft));
    }

    #[tokio::test]
    async fn test_start_over_foreign_live_document_is_rejected() {
        let start = Utc::now() - Duration::minutes(5);
        let store = seeded_store(vec![Segment::open(FeedingSide::BreastLeft, start)]);
        // A machine that believes it is idle but whose store is live.
        let mut timer = FeedingTimer {
            store,
            log: RecordingLog::default(),
            noise_threshold_ms: 1_000,
            phase: TimerPhase::Idle,
        };

        let err = timer.start(FeedingSide::Bottle).unwrap_err();
        assert!(err.is_timer_active());
        assert_eq!(timer.phase(), TimerPhase::Running);
    }

    #[tokio::test]
    async fn test_phase_derived_from_store_on_construction() {
        let start = Utc::now() - Duration::minutes(3);
        let store = seeded_store(vec![Segment::open(FeedingSide::BreastRight, start)]);
        let timer = timer_over(store);
        assert_eq!(timer.phase(), TimerPhase::Running);
    }

    #[tokio::test]
    async fn test_switch_side_round_trip() {
        let mut timer = timer_over(MemoryStore::new());
        timer.start(FeedingSide::BreastLeft).unwrap();

        assert_eq!(
            timer.switch_side().unwrap(),
            Some(FeedingSide::BreastRight)
        );
        assert_eq!(
            timer.switch_side().unwrap(),
            Some(FeedingSide::BreastLeft)
        );

        let state = timer.state().unwrap().unwrap();
        assert_eq!(state.segments.len(), 3);
        assert_eq!(state.segments.iter().filter(|s| s.is_open()).count(), 1);
    }

    #[tokio::test]
    async fn test_switch_side_noop_cases() {
        // Idle machine
        let mut timer = timer_over(MemoryStore::new());
        assert_eq!(timer.switch_side().unwrap(), None);

        // Non-switchable side
        let mut timer = timer_over(MemoryStore::new());
        timer.start(FeedingSide::Bottle).unwrap();
        assert_eq!(timer.switch_side().unwrap(), None);
        assert_eq!(timer.state().unwrap().unwrap().segments.len(), 1);
    }

    #[tokio::test]
    async fn test_request_and_cancel_end_do_not_touch_segments() {
        let mut timer = timer_over(MemoryStore::new());
        timer.start(FeedingSide::BreastLeft).unwrap();
        let before = timer.state().unwrap();

        assert!(timer.request_end());
        assert_eq!(timer.phase(), TimerPhase::EndPending);
        assert_eq!(timer.state().unwrap(), before);

        assert!(timer.cancel_end());
        assert_eq!(timer.phase(), TimerPhase::Running);
        assert_eq!(timer.state().unwrap(), before);

        // Cancel without a pending end is refused
        assert!(!timer.cancel_end());
    }

    #[tokio::test]
    async fn test_request_end_refused_when_idle() {
        let mut timer = timer_over(MemoryStore::new());
        assert!(!timer.request_end());
        assert_eq!(timer.phase(), TimerPhase::Idle);
    }

    #[tokio::test]
    async fn test_confirm_requires_prior_request() {
        let mut timer = timer_over(MemoryStore::new());
        timer.start(FeedingSide::BreastLeft).unwrap();

        let err = timer.confirm_end().await.unwrap_err();
        assert!(matches!(err, Error::EndNotRequested));
        assert_eq!(timer.phase(), TimerPhase::Running);
    }

    #[tokio::test]
    async fn test_confirm_end_logs_one_entry_per_side() {
        let start = Utc::now() - Duration::seconds(130);
        let store = seeded_store(vec![
            closed(FeedingSide::BreastLeft, start, 70),
            closed(FeedingSide::BreastRight, start + Duration::seconds(70), 55),
            Segment::open(FeedingSide::BreastLeft, start + Duration::seconds(125)),
        ]);
        let mut timer = timer_over(store);

        assert!(timer.request_end());
        let outcome = timer.confirm_end().await.unwrap();

        assert_eq!(timer.phase(), TimerPhase::Idle);
        assert!(timer.state().unwrap().is_none());

        // Two entries: left 75s and right 55s, one minute each
        assert_eq!(outcome.logged.len(), 2);
        assert_eq!(outcome.summary, "Left 1min + Right 1min");

        let calls = timer.log.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].feeding_type, FeedingSide::BreastLeft);
        assert_eq!(calls[0].timestamp, Some(start));
        assert_eq!(calls[0].duration_minutes, Some(1));
        assert_eq!(calls[1].feeding_type, FeedingSide::BreastRight);
        assert_eq!(calls[1].duration_minutes, Some(1));
    }

    #[tokio::test]
    async fn test_confirm_end_failure_preserves_state() {
        let start = Utc::now() - Duration::minutes(10);
        let store = seeded_store(vec![Segment::open(FeedingSide::BreastLeft, start)]);
        let document_before = store.document().unwrap().to_string();

        let mut timer =
            FeedingTimer::new(store, RecordingLog::failing(), 1_000).unwrap();
        assert!(timer.request_end());

        let err = timer.confirm_end().await.unwrap_err();
        assert!(err.is_api_failure());

        // Back to an active, confirmable state; the document is untouched,
        // open segment included.
        assert_eq!(timer.phase(), TimerPhase::Running);
        assert_eq!(timer.store.document(), Some(document_before.as_str()));

        // A full retry is the recovery path.
        timer.log.fail.store(false, Ordering::SeqCst);
        assert!(timer.request_end());
        let outcome = timer.confirm_end().await.unwrap();
        assert_eq!(outcome.logged.len(), 1);
        assert!(timer.state().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_noop_feed_clears_without_logging() {
        let start = Utc::now() - chrono::Duration::milliseconds(500);
        let store = seeded_store(vec![Segment::open(FeedingSide::BreastLeft, start)]);
        let mut timer = timer_over(store);

        assert!(timer.request_end());
        let outcome = timer.confirm_end().await.unwrap();

        assert!(outcome.is_empty());
        assert_eq!(outcome.summary, "");
        assert!(timer.log.calls().is_empty());
        // The timer still clears: a no-op feed is a cancel-equivalent.
        assert!(timer.state().unwrap().is_none());
        assert_eq!(timer.phase(), TimerPhase::Idle);
    }

    #[tokio::test]
    async fn test_cancel_then_later_confirm_reconciles_correctly() {
        let start = Utc::now() - Duration::seconds(600);
        let store = seeded_store(vec![
            closed(FeedingSide::BreastLeft, start, 300),
            Segment::open(FeedingSide::BreastRight, start + Duration::seconds(300)),
        ]);
        let mut timer = timer_over(store);

        assert!(timer.request_end());
        assert!(timer.cancel_end());

        assert!(timer.request_end());
        let outcome = timer.confirm_end().await.unwrap();

        assert_eq!(outcome.logged.len(), 2);
        assert_eq!(outcome.logged[0].side, FeedingSide::BreastLeft);
        assert_eq!(outcome.logged[1].side, FeedingSide::BreastRight);
        assert_eq!(reconcile::duration_minutes(outcome.logged[0].total_ms), 5);
    }
}
