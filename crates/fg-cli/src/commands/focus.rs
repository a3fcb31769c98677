//! Foreground focus session.
//!
//! A tokio interval drives [`SessionClock::tick`] while stdin carries the
//! interactive commands. Distracting apps stay blocked for the whole session
//! and are released however it ends.

use std::future::Future;
use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fg_core::{
    AppShield, ClockEvent, ClockStatus, FocusLedger, NotificationBlocker, PersistenceWarning,
    SessionClock, SessionCredit, SessionRecorder, ShieldStatus, SnapshotStore,
};
use fg_db::{Database, SessionLogRecord};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::time::MissedTickBehavior;

use super::util::{format_clock, report_warning, runtime};
use crate::blocker::Blocker;

/// Session length when neither `--minutes` nor `--seconds` is given.
pub const DEFAULT_MINUTES: u64 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusOptions {
    pub duration_seconds: u64,
    pub tick_interval: Duration,
}

impl FocusOptions {
    pub fn from_args(minutes: Option<u64>, seconds: Option<u64>, tick_interval: Duration) -> Self {
        let duration_seconds = seconds
            .unwrap_or_else(|| minutes.unwrap_or(DEFAULT_MINUTES).saturating_mul(60));
        Self {
            duration_seconds,
            tick_interval,
        }
    }
}

/// How a session ended.
#[derive(Debug)]
pub struct SessionSummary {
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub requested_seconds: u64,
    pub elapsed_seconds: u64,
    pub completed: bool,
    pub credit: SessionCredit,
    pub warning: Option<PersistenceWarning>,
}

struct Outcome {
    elapsed_seconds: u64,
    completed: bool,
    credit: SessionCredit,
    warning: Option<PersistenceWarning>,
}

impl Outcome {
    fn from_event(event: ClockEvent) -> Option<Self> {
        match event {
            ClockEvent::Stopped {
                elapsed_seconds,
                completed,
                credit,
                warning,
            } => Some(Self {
                elapsed_seconds,
                completed,
                credit,
                warning,
            }),
            ClockEvent::Completed {
                duration_seconds,
                credit,
                warning,
            } => Some(Self {
                elapsed_seconds: duration_seconds,
                completed: true,
                credit,
                warning,
            }),
            _ => None,
        }
    }
}

enum Step {
    Continue,
    Resumed,
    Finished(Outcome),
}

/// Runs a session on the current thread, then logs it to history.
pub fn run<W: Write>(
    writer: &mut W,
    ledger: &mut FocusLedger<Database>,
    blocker: Blocker,
    options: FocusOptions,
) -> Result<()> {
    let runtime = runtime()?;
    let mut shield = AppShield::new(blocker);

    let summary = runtime.block_on(async {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let shutdown = async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %err, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        };
        drive(
            &mut *ledger,
            &mut shield,
            stdin,
            &mut *writer,
            options,
            shutdown,
        )
        .await
    });
    // A pending stdin read would otherwise hold the runtime open.
    runtime.shutdown_background();
    let summary = summary?;

    report_warning(summary.warning.as_ref());

    let record = SessionLogRecord::new(
        summary.started_at,
        summary.ended_at,
        summary.requested_seconds,
        summary.elapsed_seconds,
        summary.completed,
        summary.credit.coins,
    );
    if let Err(err) = ledger.store_mut().insert_session_log(&record) {
        tracing::debug!(error = %err, "session log insert failed");
        eprintln!("warning: failed to record session history: {err}");
    }

    if summary.completed {
        writeln!(
            writer,
            "Session complete: {} focused. Earned {} coins (balance {}).",
            format_clock(summary.elapsed_seconds),
            summary.credit.coins,
            ledger.coin_balance()
        )?;
    } else {
        writeln!(
            writer,
            "Session stopped after {}. Nothing recorded.",
            format_clock(summary.elapsed_seconds)
        )?;
    }
    Ok(())
}

/// Drives one session to completion, a stop command, or `shutdown`.
///
/// The clock is started before any app is blocked, so an invalid duration
/// fails without touching the blocker.
pub async fn drive<S, B, I, W>(
    ledger: &mut FocusLedger<S>,
    shield: &mut AppShield<B>,
    input: I,
    out: &mut W,
    options: FocusOptions,
    shutdown: impl Future<Output = ()>,
) -> Result<SessionSummary>
where
    S: SnapshotStore,
    B: NotificationBlocker,
    I: AsyncBufRead + Unpin,
    W: Write,
{
    let allowed = ledger.allowed_apps().clone();
    let mut clock = SessionClock::new(ledger);
    clock.start(options.duration_seconds)?;
    let started_at = Utc::now();

    match shield.engage(&allowed).await {
        ShieldStatus::Engaged { blocked } => {
            writeln!(out, "Blocking notifications from {blocked} apps.")?;
        }
        ShieldStatus::Unavailable { reason } => {
            writeln!(out, "App blocking unavailable ({reason}); continuing without it.")?;
        }
        ShieldStatus::Inactive => {}
    }

    let result = session_loop(&mut clock, input, out, options, shutdown).await;
    let released = shield.release().await;
    tracing::debug!(released, "app shield released");
    let outcome = result?;

    Ok(SessionSummary {
        started_at,
        ended_at: Utc::now(),
        requested_seconds: options.duration_seconds,
        elapsed_seconds: outcome.elapsed_seconds,
        completed: outcome.completed,
        credit: outcome.credit,
        warning: outcome.warning,
    })
}

async fn session_loop<R, I, W>(
    clock: &mut SessionClock<R>,
    input: I,
    out: &mut W,
    options: FocusOptions,
    shutdown: impl Future<Output = ()>,
) -> Result<Outcome>
where
    R: SessionRecorder,
    I: AsyncBufRead + Unpin,
    W: Write,
{
    writeln!(
        out,
        "Focus session started: {}. Commands: pause, resume, status, stop.",
        format_clock(options.duration_seconds)
    )?;
    out.flush()?;

    let mut ticker = tokio::time::interval(options.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick fires immediately.
    ticker.tick().await;

    let mut lines = input.lines();
    let mut input_open = true;
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick(), if clock.status() == ClockStatus::Running => {
                let event = clock.tick();
                if let ClockEvent::Tick { remaining_seconds, .. } = &event {
                    if remaining_seconds % 60 == 0 {
                        writeln!(out, "{} remaining", format_clock(*remaining_seconds))?;
                        out.flush()?;
                    }
                } else if let Some(outcome) = Outcome::from_event(event) {
                    return Ok(outcome);
                }
            }
            line = lines.next_line(), if input_open => {
                match line.context("failed to read input")? {
                    Some(line) => match handle_line(clock, &line, out)? {
                        Step::Continue => {}
                        Step::Resumed => ticker.reset(),
                        Step::Finished(outcome) => return Ok(outcome),
                    },
                    None => {
                        input_open = false;
                        // Nothing can resume a paused session once input is gone.
                        if clock.status() == ClockStatus::Paused {
                            return stop_session(clock);
                        }
                    }
                }
                out.flush()?;
            }
            () = &mut shutdown => {
                writeln!(out, "Interrupted.")?;
                return stop_session(clock);
            }
        }
    }
}

fn handle_line<R: SessionRecorder, W: Write>(
    clock: &mut SessionClock<R>,
    line: &str,
    out: &mut W,
) -> Result<Step> {
    match line.trim().to_ascii_lowercase().as_str() {
        "" => {}
        "pause" | "p" => match clock.request_pause() {
            Ok(_) => writeln!(out, "Pause the session? Type yes or no.")?,
            Err(err) => writeln!(out, "{err}")?,
        },
        "yes" | "y" => {
            let event = clock
                .pending_pause()
                .map_or(ClockEvent::Ignored, |token| clock.confirm_pause(token));
            if let ClockEvent::Paused { elapsed_seconds } = event {
                writeln!(
                    out,
                    "Paused at {}. Type resume to continue.",
                    format_clock(elapsed_seconds)
                )?;
            } else {
                writeln!(out, "No pause requested.")?;
            }
        }
        "no" | "n" => match clock.cancel_pause_request() {
            ClockEvent::PauseCancelled => writeln!(out, "Keep going.")?,
            _ => writeln!(out, "No pause requested.")?,
        },
        "resume" | "r" => match clock.resume() {
            Ok(_) => {
                writeln!(
                    out,
                    "Resumed with {} left.",
                    format_clock(clock.remaining_seconds())
                )?;
                return Ok(Step::Resumed);
            }
            Err(err) => writeln!(out, "{err}")?,
        },
        "stop" | "q" | "quit" => return stop_session(clock).map(Step::Finished),
        "status" | "s" => writeln!(
            out,
            "{}: {} elapsed, {} remaining",
            clock.status(),
            format_clock(clock.elapsed_seconds()),
            format_clock(clock.remaining_seconds())
        )?,
        other => writeln!(
            out,
            "Unknown command {other:?}. Try pause, yes, no, resume, status or stop."
        )?,
    }
    Ok(Step::Continue)
}

fn stop_session<R: SessionRecorder>(clock: &mut SessionClock<R>) -> Result<Outcome> {
    let event = clock.stop(false)?;
    Outcome::from_event(event).context("stopping did not end the session")
}

#[cfg(test)]
mod tests {
    use super::*;

    use fg_core::{LedgerDefaults, LocalBlocker, MemoryStore};

    fn ledger() -> FocusLedger<MemoryStore> {
        FocusLedger::load(MemoryStore::new(), LedgerDefaults::default()).0
    }

    fn options(duration_seconds: u64, tick_ms: u64) -> FocusOptions {
        FocusOptions {
            duration_seconds,
            tick_interval: Duration::from_millis(tick_ms),
        }
    }

    #[test]
    fn options_default_to_twenty_five_minutes() {
        let tick = Duration::from_secs(1);
        assert_eq!(
            FocusOptions::from_args(None, None, tick).duration_seconds,
            25 * 60
        );
        assert_eq!(
            FocusOptions::from_args(Some(2), None, tick).duration_seconds,
            120
        );
        assert_eq!(
            FocusOptions::from_args(None, Some(45), tick).duration_seconds,
            45
        );
    }

    #[tokio::test]
    async fn session_runs_to_completion_without_input() {
        let mut ledger = ledger();
        let mut shield = AppShield::new(LocalBlocker::new());
        let mut out = Vec::new();

        let summary = drive(
            &mut ledger,
            &mut shield,
            &b""[..],
            &mut out,
            options(60, 1),
            std::future::pending(),
        )
        .await
        .unwrap();

        assert!(summary.completed);
        assert_eq!(summary.elapsed_seconds, 60);
        assert_eq!(summary.credit, SessionCredit { minutes: 1, coins: 1 });
        assert_eq!(ledger.total_focus_minutes(), 1);
        assert_eq!(ledger.coin_balance(), 1);
        assert_eq!(ledger.completed_session_count(), 1);
        assert_eq!(shield.status(), &ShieldStatus::Inactive);
        assert!(shield.blocked().is_empty());

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Blocking notifications from 8 apps."));
    }

    #[tokio::test]
    async fn stop_command_ends_session_without_credit() {
        let mut ledger = ledger();
        let mut shield = AppShield::new(LocalBlocker::new());
        let mut out = Vec::new();

        let summary = drive(
            &mut ledger,
            &mut shield,
            &b"stop\n"[..],
            &mut out,
            options(3600, 1000),
            std::future::pending(),
        )
        .await
        .unwrap();

        assert!(!summary.completed);
        assert_eq!(summary.credit, SessionCredit::default());
        assert_eq!(ledger.total_focus_minutes(), 0);
        assert_eq!(ledger.coin_balance(), 0);
        assert_eq!(ledger.completed_session_count(), 0);
        assert!(shield.blocked().is_empty());
    }

    #[tokio::test]
    async fn pause_needs_confirmation() {
        let mut ledger = ledger();
        let mut shield = AppShield::new(LocalBlocker::new());
        let mut out = Vec::new();

        drive(
            &mut ledger,
            &mut shield,
            &b"pause\nno\nyes\npause\nyes\nstatus\nstop\n"[..],
            &mut out,
            options(3600, 1000),
            std::future::pending(),
        )
        .await
        .unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Pause the session? Type yes or no."));
        assert!(out.contains("Keep going."));
        assert!(out.contains("No pause requested."));
        assert!(out.contains("Paused at 00:00."));
        assert!(out.contains("paused: 00:00 elapsed, 1:00:00 remaining"));
        assert_eq!(ledger.coin_balance(), 0);
    }

    #[tokio::test]
    async fn closed_input_while_paused_stops_session() {
        let mut ledger = ledger();
        let mut shield = AppShield::new(LocalBlocker::new());
        let mut out = Vec::new();

        let summary = drive(
            &mut ledger,
            &mut shield,
            &b"pause\nyes\n"[..],
            &mut out,
            options(3600, 1000),
            std::future::pending(),
        )
        .await
        .unwrap();

        assert!(!summary.completed);
        assert_eq!(ledger.completed_session_count(), 0);
    }

    #[tokio::test]
    async fn shutdown_signal_stops_session() {
        let mut ledger = ledger();
        let mut shield = AppShield::new(LocalBlocker::new());
        let mut out = Vec::new();

        let summary = drive(
            &mut ledger,
            &mut shield,
            &b""[..],
            &mut out,
            options(3600, 1000),
            std::future::ready(()),
        )
        .await
        .unwrap();

        assert!(!summary.completed);
        assert!(String::from_utf8(out).unwrap().contains("Interrupted."));
        assert!(shield.blocked().is_empty());
    }

    #[tokio::test]
    async fn zero_duration_fails_before_blocking() {
        let mut ledger = ledger();
        let mut shield = AppShield::new(LocalBlocker::new());
        let mut out = Vec::new();

        let err = drive(
            &mut ledger,
            &mut shield,
            &b""[..],
            &mut out,
            options(0, 1),
            std::future::pending(),
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("duration must be positive"));
        assert_eq!(shield.status(), &ShieldStatus::Inactive);
    }

    #[tokio::test]
    async fn allowed_apps_are_not_blocked() {
        let mut ledger = ledger();
        let _ = ledger.toggle_allowed_app("com.whatsapp".parse().unwrap());
        let mut shield = AppShield::new(LocalBlocker::new());
        let mut out = Vec::new();

        drive(
            &mut ledger,
            &mut shield,
            &b"stop\n"[..],
            &mut out,
            options(3600, 1000),
            std::future::pending(),
        )
        .await
        .unwrap();

        assert!(String::from_utf8(out)
            .unwrap()
            .contains("Blocking notifications from 7 apps."));
    }
}
