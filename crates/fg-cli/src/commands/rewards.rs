//! Reward catalogue listing and purchases.

use std::io::Write;

use anyhow::{Context, Result};
use fg_core::rewards::{self, Purchase};
use fg_core::{FocusLedger, RewardId, SnapshotStore};

use super::util::report_warning;

pub fn list<W: Write, S: SnapshotStore>(writer: &mut W, ledger: &FocusLedger<S>) -> Result<()> {
    let balance = ledger.coin_balance();
    writeln!(writer, "Rewards (balance: {balance} coins)")?;
    for reward in rewards::catalogue() {
        let marker = if reward.cost <= balance { '*' } else { ' ' };
        writeln!(
            writer,
            "{marker} {:<17} {:>4}  {:<8} {}: {}",
            reward.id,
            reward.cost,
            reward.category.as_str(),
            reward.name,
            reward.description
        )?;
    }
    Ok(())
}

pub fn buy<W: Write, S: SnapshotStore>(
    writer: &mut W,
    ledger: &mut FocusLedger<S>,
    id: &str,
) -> Result<()> {
    let id: RewardId = id.parse()?;
    let reward = rewards::find(&id).with_context(|| format!("unknown reward: {id}"))?;

    let purchase = rewards::purchase(ledger, reward)?;
    report_warning(purchase.warning.as_ref());
    match purchase.value {
        Purchase::Bought { cost, balance } => writeln!(
            writer,
            "Bought {} for {cost} coins. Balance: {balance}",
            reward.name
        )?,
        Purchase::Insufficient { shortfall } => writeln!(
            writer,
            "Not enough coins for {}: {shortfall} more needed.",
            reward.name
        )?,
    }
    Ok(())
}
