//! Direct coin adjustments.

use std::io::Write;

use anyhow::Result;
use fg_core::{FocusLedger, SnapshotStore};

use super::util::report_warning;

pub fn earn<W: Write, S: SnapshotStore>(
    writer: &mut W,
    ledger: &mut FocusLedger<S>,
    amount: u64,
) -> Result<()> {
    let balance = ledger.earn_coins(amount);
    report_warning(balance.warning.as_ref());
    writeln!(writer, "Earned {amount} coins. Balance: {}", balance.value)?;
    Ok(())
}

/// Spends coins. An insufficient balance is reported, not treated as an error.
pub fn spend<W: Write, S: SnapshotStore>(
    writer: &mut W,
    ledger: &mut FocusLedger<S>,
    amount: u64,
) -> Result<()> {
    let spent = ledger.spend_coins(amount)?;
    report_warning(spent.warning.as_ref());
    if spent.value {
        writeln!(
            writer,
            "Spent {amount} coins. Balance: {}",
            ledger.coin_balance()
        )?;
    } else {
        writeln!(
            writer,
            "Not enough coins: balance is {}, needed {amount}.",
            ledger.coin_balance()
        )?;
    }
    Ok(())
}
