//! Countdown state machine for a single focus session.
//!
//! ```text
//! Idle --start--> Running --tick x duration--> Completed --reset--> Idle
//!                  |    ^
//!   request+confirm|    |resume
//!                  v    |
//!                  Paused
//! Running | Paused --stop--> Idle
//! ```
//!
//! The clock does not own a timer. A driver calls [`SessionClock::tick`] once
//! per tick interval and stops calling it once the clock leaves `Running`.
//! Every operation returns a [`ClockEvent`] describing what happened, which is
//! how the driver observes remaining time and the session outcome.
//!
//! Pausing is two-phase: [`SessionClock::request_pause`] hands out a
//! [`PauseToken`] and only [`SessionClock::confirm_pause`] with the latest
//! token actually pauses. A UI can put a confirmation prompt in between.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::ledger::{PersistenceWarning, SessionCredit, SessionRecorder};

/// Lifecycle state of the clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Completed,
}

impl ClockStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for ClockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one pending pause request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PauseToken(u64);

/// Clock misuse. These are programmer errors and are never retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClockError {
    #[error("cannot {operation} while {status}")]
    InvalidState {
        operation: &'static str,
        status: ClockStatus,
    },
    #[error("invalid argument to {operation}: {reason}")]
    InvalidArgument {
        operation: &'static str,
        reason: &'static str,
    },
}

/// What an operation did.
#[derive(Debug)]
pub enum ClockEvent {
    Started {
        duration_seconds: u64,
    },
    Tick {
        elapsed_seconds: u64,
        remaining_seconds: u64,
    },
    Paused {
        elapsed_seconds: u64,
    },
    PauseCancelled,
    Resumed {
        elapsed_seconds: u64,
    },
    /// Manual stop. `credit` is zero unless `completed` was passed.
    Stopped {
        elapsed_seconds: u64,
        completed: bool,
        credit: SessionCredit,
        warning: Option<PersistenceWarning>,
    },
    /// The countdown reached zero.
    Completed {
        duration_seconds: u64,
        credit: SessionCredit,
        warning: Option<PersistenceWarning>,
    },
    Reset,
    /// The operation had no effect.
    Ignored,
}

/// Countdown for one focus session, reporting its outcome to a recorder.
#[derive(Debug)]
pub struct SessionClock<R> {
    recorder: R,
    status: ClockStatus,
    requested_duration_seconds: u64,
    elapsed_seconds: u64,
    pending_pause: Option<PauseToken>,
    next_token: u64,
}

impl<R: SessionRecorder> SessionClock<R> {
    /// Creates an idle clock that reports to `recorder`.
    pub const fn new(recorder: R) -> Self {
        Self {
            recorder,
            status: ClockStatus::Idle,
            requested_duration_seconds: 0,
            elapsed_seconds: 0,
            pending_pause: None,
            next_token: 0,
        }
    }

    /// Starts a countdown of `duration_seconds`. Only valid while idle.
    pub fn start(&mut self, duration_seconds: u64) -> Result<ClockEvent, ClockError> {
        self.expect_status("start", &[ClockStatus::Idle])?;
        if duration_seconds == 0 {
            return Err(ClockError::InvalidArgument {
                operation: "start",
                reason: "duration must be positive",
            });
        }

        self.requested_duration_seconds = duration_seconds;
        self.elapsed_seconds = 0;
        self.pending_pause = None;
        self.status = ClockStatus::Running;
        tracing::debug!(duration_seconds, "focus session started");
        Ok(ClockEvent::Started { duration_seconds })
    }

    /// Asks to pause. Nothing changes until the returned token is confirmed.
    ///
    /// A new request supersedes any earlier pending one.
    pub fn request_pause(&mut self) -> Result<PauseToken, ClockError> {
        self.expect_status("request a pause", &[ClockStatus::Running])?;
        self.next_token += 1;
        let token = PauseToken(self.next_token);
        self.pending_pause = Some(token);
        tracing::debug!(?token, "pause requested");
        Ok(token)
    }

    /// Pauses if `token` is the pending request; otherwise does nothing.
    pub fn confirm_pause(&mut self, token: PauseToken) -> ClockEvent {
        if self.status != ClockStatus::Running || self.pending_pause != Some(token) {
            tracing::debug!(?token, pending = ?self.pending_pause, "stale pause confirmation");
            return ClockEvent::Ignored;
        }
        self.pending_pause = None;
        self.status = ClockStatus::Paused;
        tracing::debug!(elapsed = self.elapsed_seconds, "focus session paused");
        ClockEvent::Paused {
            elapsed_seconds: self.elapsed_seconds,
        }
    }

    /// Drops the pending pause request, if any.
    pub fn cancel_pause_request(&mut self) -> ClockEvent {
        match self.pending_pause.take() {
            Some(_) => ClockEvent::PauseCancelled,
            None => ClockEvent::Ignored,
        }
    }

    /// Resumes a paused session from where it stopped.
    pub fn resume(&mut self) -> Result<ClockEvent, ClockError> {
        self.expect_status("resume", &[ClockStatus::Paused])?;
        self.status = ClockStatus::Running;
        tracing::debug!(elapsed = self.elapsed_seconds, "focus session resumed");
        Ok(ClockEvent::Resumed {
            elapsed_seconds: self.elapsed_seconds,
        })
    }

    /// Ends a running or paused session and reports it to the recorder.
    pub fn stop(&mut self, completed: bool) -> Result<ClockEvent, ClockError> {
        self.expect_status("stop", &[ClockStatus::Running, ClockStatus::Paused])?;
        let elapsed_seconds = self.elapsed_seconds;
        self.status = ClockStatus::Idle;
        self.elapsed_seconds = 0;
        self.pending_pause = None;

        let recorded = self.recorder.record_session(elapsed_seconds, completed);
        tracing::debug!(elapsed_seconds, completed, "focus session stopped");
        Ok(ClockEvent::Stopped {
            elapsed_seconds,
            completed,
            credit: recorded.value,
            warning: recorded.warning,
        })
    }

    /// Advances one second. Ignored unless running.
    ///
    /// Reaching the requested duration completes the session and records it
    /// exactly once.
    pub fn tick(&mut self) -> ClockEvent {
        if self.status != ClockStatus::Running {
            return ClockEvent::Ignored;
        }

        self.elapsed_seconds += 1;
        if self.elapsed_seconds < self.requested_duration_seconds {
            return ClockEvent::Tick {
                elapsed_seconds: self.elapsed_seconds,
                remaining_seconds: self.remaining_seconds(),
            };
        }

        self.status = ClockStatus::Completed;
        self.pending_pause = None;
        let duration_seconds = self.requested_duration_seconds;
        let recorded = self.recorder.record_session(duration_seconds, true);
        tracing::info!(duration_seconds, "focus session completed");
        ClockEvent::Completed {
            duration_seconds,
            credit: recorded.value,
            warning: recorded.warning,
        }
    }

    /// Returns an idle or completed clock to a clean idle state.
    pub fn reset(&mut self) -> Result<ClockEvent, ClockError> {
        self.expect_status("reset", &[ClockStatus::Idle, ClockStatus::Completed])?;
        self.status = ClockStatus::Idle;
        self.elapsed_seconds = 0;
        self.pending_pause = None;
        Ok(ClockEvent::Reset)
    }

    fn expect_status(
        &self,
        operation: &'static str,
        allowed: &[ClockStatus],
    ) -> Result<(), ClockError> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(ClockError::InvalidState {
                operation,
                status: self.status,
            })
        }
    }
}

impl<R> SessionClock<R> {
    pub const fn status(&self) -> ClockStatus {
        self.status
    }

    pub const fn requested_duration_seconds(&self) -> u64 {
        self.requested_duration_seconds
    }

    pub const fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    pub const fn remaining_seconds(&self) -> u64 {
        match self.status {
            ClockStatus::Running | ClockStatus::Paused => self
                .requested_duration_seconds
                .saturating_sub(self.elapsed_seconds),
            ClockStatus::Idle | ClockStatus::Completed => 0,
        }
    }

    /// Fraction of the requested duration already elapsed, in `[0, 1]`.
    #[expect(
        clippy::cast_precision_loss,
        reason = "session lengths are far below 2^52 seconds"
    )]
    pub fn progress(&self) -> f64 {
        match self.status {
            ClockStatus::Completed => 1.0,
            ClockStatus::Idle => 0.0,
            ClockStatus::Running | ClockStatus::Paused => {
                self.elapsed_seconds as f64 / self.requested_duration_seconds as f64
            }
        }
    }

    pub const fn pending_pause(&self) -> Option<PauseToken> {
        self.pending_pause
    }

    pub const fn recorder(&self) -> &R {
        &self.recorder
    }

    pub fn into_recorder(self) -> R {
        self.recorder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{FocusLedger, LedgerDefaults, Persisted};
    use crate::store::MemoryStore;

    /// Records every call so tests can count them.
    #[derive(Debug, Default)]
    struct CallLog {
        calls: Vec<(u64, bool)>,
    }

    impl SessionRecorder for CallLog {
        fn record_session(
            &mut self,
            duration_seconds: u64,
            completed: bool,
        ) -> Persisted<SessionCredit> {
            self.calls.push((duration_seconds, completed));
            let minutes = if completed { duration_seconds / 60 } else { 0 };
            Persisted {
                value: SessionCredit {
                    minutes,
                    coins: minutes,
                },
                warning: None,
            }
        }
    }

    fn ledger() -> FocusLedger<MemoryStore> {
        FocusLedger::load(MemoryStore::new(), LedgerDefaults::default()).0
    }

    #[test]
    fn ticking_full_duration_completes_and_records_once() {
        for duration in [1, 2, 59, 60, 61, 300] {
            let mut clock = SessionClock::new(CallLog::default());
            clock.start(duration).unwrap();
            for _ in 1..duration {
                assert!(matches!(clock.tick(), ClockEvent::Tick { .. }));
            }
            assert!(matches!(clock.tick(), ClockEvent::Completed { .. }));
            assert_eq!(clock.status(), ClockStatus::Completed);
            assert_eq!(clock.recorder().calls, vec![(duration, true)]);
        }
    }

    #[test]
    fn tick_after_completion_is_ignored() {
        let mut clock = SessionClock::new(ledger());
        clock.start(60).unwrap();
        for _ in 0..60 {
            let _ = clock.tick();
        }
        assert_eq!(clock.status(), ClockStatus::Completed);
        assert!(matches!(clock.tick(), ClockEvent::Ignored));

        let ledger = clock.into_recorder();
        assert_eq!(ledger.completed_session_count(), 1);
        assert_eq!(ledger.total_focus_minutes(), 1);
        assert_eq!(ledger.coin_balance(), 1);
    }

    #[test]
    fn tick_reports_remaining_time() {
        let mut clock = SessionClock::new(CallLog::default());
        clock.start(10).unwrap();
        match clock.tick() {
            ClockEvent::Tick {
                elapsed_seconds,
                remaining_seconds,
            } => {
                assert_eq!(elapsed_seconds, 1);
                assert_eq!(remaining_seconds, 9);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!((clock.progress() - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn early_stop_leaves_ledger_untouched() {
        let mut ledger = ledger();
        ledger.earn_coins(40).into_value();
        let before = ledger.snapshot().clone();

        let mut clock = SessionClock::new(&mut ledger);
        clock.start(10).unwrap();
        for _ in 0..3 {
            let _ = clock.tick();
        }
        match clock.stop(false).unwrap() {
            ClockEvent::Stopped {
                elapsed_seconds,
                completed,
                credit,
                warning,
            } => {
                assert_eq!(elapsed_seconds, 3);
                assert!(!completed);
                assert_eq!(credit, SessionCredit::default());
                assert!(warning.is_none());
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(clock.status(), ClockStatus::Idle);
        assert_eq!(clock.elapsed_seconds(), 0);
        drop(clock);

        assert_eq!(ledger.snapshot(), &before);
    }

    #[test]
    fn stop_records_exactly_once_and_blocks_late_ticks() {
        let mut clock = SessionClock::new(CallLog::default());
        clock.start(5).unwrap();
        let _ = clock.tick();
        clock.stop(false).unwrap();
        assert!(matches!(clock.tick(), ClockEvent::Ignored));
        assert_eq!(clock.elapsed_seconds(), 0);
        assert_eq!(clock.recorder().calls, vec![(1, false)]);
    }

    #[test]
    fn stop_completed_credits_elapsed_time() {
        let mut clock = SessionClock::new(ledger());
        clock.start(300).unwrap();
        for _ in 0..120 {
            let _ = clock.tick();
        }
        let event = clock.stop(true).unwrap();
        assert!(matches!(
            event,
            ClockEvent::Stopped {
                credit: SessionCredit {
                    minutes: 2,
                    coins: 2
                },
                ..
            }
        ));
        assert_eq!(clock.recorder().completed_session_count(), 1);
    }

    #[test]
    fn start_rejects_zero_duration() {
        let mut clock = SessionClock::new(CallLog::default());
        assert_eq!(
            clock.start(0).unwrap_err(),
            ClockError::InvalidArgument {
                operation: "start",
                reason: "duration must be positive",
            }
        );
        assert_eq!(clock.status(), ClockStatus::Idle);
    }

    #[test]
    fn start_rejected_while_active() {
        let mut clock = SessionClock::new(CallLog::default());
        clock.start(30).unwrap();
        let err = clock.start(30).unwrap_err();
        assert_eq!(err.to_string(), "cannot start while running");

        let token = clock.request_pause().unwrap();
        let _ = clock.confirm_pause(token);
        assert_eq!(
            clock.start(30).unwrap_err(),
            ClockError::InvalidState {
                operation: "start",
                status: ClockStatus::Paused,
            }
        );
    }

    #[test]
    fn completed_clock_must_be_reset_before_restart() {
        let mut clock = SessionClock::new(CallLog::default());
        clock.start(1).unwrap();
        let _ = clock.tick();
        assert!(clock.start(1).is_err());

        assert!(matches!(clock.reset().unwrap(), ClockEvent::Reset));
        assert_eq!(clock.status(), ClockStatus::Idle);
        assert_eq!(clock.elapsed_seconds(), 0);
        clock.start(1).unwrap();
        assert_eq!(clock.elapsed_seconds(), 0);
    }

    #[test]
    fn reset_rejected_while_active() {
        let mut clock = SessionClock::new(CallLog::default());
        clock.start(30).unwrap();
        assert!(clock.reset().is_err());
        assert!(clock.recorder().calls.is_empty());
    }

    #[test]
    fn stop_and_resume_rejected_from_wrong_states() {
        let mut clock = SessionClock::new(CallLog::default());
        assert!(clock.stop(false).is_err());
        assert!(clock.resume().is_err());
        assert!(clock.request_pause().is_err());

        clock.start(30).unwrap();
        assert!(clock.resume().is_err());
    }

    #[test]
    fn request_pause_does_not_pause_until_confirmed() {
        let mut clock = SessionClock::new(CallLog::default());
        clock.start(30).unwrap();
        let token = clock.request_pause().unwrap();
        assert_eq!(clock.status(), ClockStatus::Running);
        assert_eq!(clock.pending_pause(), Some(token));

        let _ = clock.tick();
        assert_eq!(clock.elapsed_seconds(), 1);

        assert!(matches!(
            clock.confirm_pause(token),
            ClockEvent::Paused { elapsed_seconds: 1 }
        ));
        assert_eq!(clock.status(), ClockStatus::Paused);
        assert!(clock.pending_pause().is_none());
    }

    #[test]
    fn paused_clock_does_not_advance() {
        let mut clock = SessionClock::new(CallLog::default());
        clock.start(30).unwrap();
        let _ = clock.tick();
        let token = clock.request_pause().unwrap();
        let _ = clock.confirm_pause(token);

        for _ in 0..10 {
            assert!(matches!(clock.tick(), ClockEvent::Ignored));
        }
        assert_eq!(clock.elapsed_seconds(), 1);
        assert_eq!(clock.remaining_seconds(), 29);

        clock.resume().unwrap();
        let _ = clock.tick();
        assert_eq!(clock.elapsed_seconds(), 2);
    }

    #[test]
    fn request_and_cancel_sequences_keep_running() {
        let mut clock = SessionClock::new(CallLog::default());
        clock.start(100).unwrap();
        for round in 1..=5 {
            clock.request_pause().unwrap();
            if round % 2 == 0 {
                clock.request_pause().unwrap();
            }
            assert!(matches!(
                clock.cancel_pause_request(),
                ClockEvent::PauseCancelled
            ));
            let _ = clock.tick();
            assert_eq!(clock.status(), ClockStatus::Running);
            assert_eq!(clock.elapsed_seconds(), round);
        }
        assert!(matches!(clock.cancel_pause_request(), ClockEvent::Ignored));
    }

    #[test]
    fn only_latest_pause_request_is_honoured() {
        let mut clock = SessionClock::new(CallLog::default());
        clock.start(100).unwrap();
        let first = clock.request_pause().unwrap();
        let _ = clock.cancel_pause_request();
        let second = clock.request_pause().unwrap();
        assert_ne!(first, second);

        assert!(matches!(clock.confirm_pause(first), ClockEvent::Ignored));
        assert_eq!(clock.status(), ClockStatus::Running);

        assert!(matches!(clock.confirm_pause(second), ClockEvent::Paused { .. }));
        assert_eq!(clock.status(), ClockStatus::Paused);
    }

    #[test]
    fn confirm_without_pending_request_is_a_no_op() {
        let mut clock = SessionClock::new(CallLog::default());
        clock.start(100).unwrap();
        let token = clock.request_pause().unwrap();
        let _ = clock.confirm_pause(token);
        clock.resume().unwrap();

        // Replaying a consumed token does nothing.
        assert!(matches!(clock.confirm_pause(token), ClockEvent::Ignored));
        assert_eq!(clock.status(), ClockStatus::Running);
    }

    #[test]
    fn stop_from_paused_records_elapsed() {
        let mut clock = SessionClock::new(CallLog::default());
        clock.start(100).unwrap();
        for _ in 0..4 {
            let _ = clock.tick();
        }
        let token = clock.request_pause().unwrap();
        let _ = clock.confirm_pause(token);
        clock.stop(false).unwrap();
        assert_eq!(clock.recorder().calls, vec![(4, false)]);
    }

    #[test]
    fn completion_clears_pending_pause() {
        let mut clock = SessionClock::new(CallLog::default());
        clock.start(1).unwrap();
        let token = clock.request_pause().unwrap();
        let _ = clock.tick();
        assert_eq!(clock.status(), ClockStatus::Completed);
        assert!(matches!(clock.confirm_pause(token), ClockEvent::Ignored));
        assert_eq!(clock.status(), ClockStatus::Completed);
    }

    #[test]
    fn completion_surfaces_persistence_warning() {
        let mut store = MemoryStore::new();
        store.fail_writes(true);
        let (ledger, _) = FocusLedger::load(store, LedgerDefaults::default());
        let mut clock = SessionClock::new(ledger);
        clock.start(60).unwrap();
        let mut last = ClockEvent::Ignored;
        for _ in 0..60 {
            last = clock.tick();
        }
        match last {
            ClockEvent::Completed {
                duration_seconds,
                credit,
                warning,
            } => {
                assert_eq!(duration_seconds, 60);
                assert_eq!(credit.coins, 1);
                assert!(matches!(warning, Some(PersistenceWarning::Write(_))));
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(clock.recorder().coin_balance(), 1);
    }
}
