//! Streak adjustments.

use std::io::Write;

use anyhow::Result;
use fg_core::{FocusLedger, SnapshotStore};

use super::util::report_warning;

pub fn set<W: Write, S: SnapshotStore>(
    writer: &mut W,
    ledger: &mut FocusLedger<S>,
    days: u64,
) -> Result<()> {
    let persisted = ledger.set_streak_days(days);
    report_warning(persisted.warning.as_ref());
    writeln!(writer, "Streak set to {days} days.")?;
    Ok(())
}
