//! Status command for showing ledger totals.

use std::io::Write;

use anyhow::Result;
use fg_core::{FocusLedger, LedgerSnapshot, MINUTES_PER_LEVEL, SnapshotStore};
use serde::Serialize;

use super::util::format_minutes;

/// JSON view: the stored snapshot plus derived level fields.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusView<'a> {
    #[serde(flatten)]
    snapshot: &'a LedgerSnapshot,
    level: u64,
    level_progress: f64,
}

pub fn run<W: Write, S: SnapshotStore>(
    writer: &mut W,
    ledger: &FocusLedger<S>,
    json: bool,
) -> Result<()> {
    if json {
        let view = StatusView {
            snapshot: ledger.snapshot(),
            level: ledger.level(),
            level_progress: ledger.level_progress(),
        };
        serde_json::to_writer_pretty(&mut *writer, &view)?;
        writeln!(writer)?;
        return Ok(());
    }

    writeln!(writer, "FocusGem status")?;
    writeln!(
        writer,
        "Focus time: {}",
        format_minutes(ledger.total_focus_minutes())
    )?;
    let level = ledger.level();
    writeln!(
        writer,
        "Level: {level} ({} of {MINUTES_PER_LEVEL} minutes to level {})",
        ledger.total_focus_minutes() % MINUTES_PER_LEVEL,
        level + 1
    )?;
    writeln!(
        writer,
        "Sessions completed: {}",
        ledger.completed_session_count()
    )?;
    writeln!(writer, "Coins: {}", ledger.coin_balance())?;
    let days = ledger.streak_days();
    writeln!(
        writer,
        "Streak: {days} {}",
        if days == 1 { "day" } else { "days" }
    )?;

    let allowed = ledger.allowed_apps();
    if allowed.is_empty() {
        writeln!(writer, "Allowed apps: none")?;
    } else {
        writeln!(writer, "Allowed apps:")?;
        for app_id in allowed {
            writeln!(writer, "- {app_id}")?;
        }
    }

    Ok(())
}
