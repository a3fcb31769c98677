//! Reward catalogue and purchases.

use std::fmt;

use serde::Serialize;

use crate::ledger::{FocusLedger, LedgerError, Persisted};
use crate::store::SnapshotStore;
use crate::types::RewardId;

/// Kind of reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardCategory {
    Digital,
    Feature,
}

impl RewardCategory {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Digital => "digital",
            Self::Feature => "feature",
        }
    }
}

impl fmt::Display for RewardCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something coins can buy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reward {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub cost: u64,
    pub category: RewardCategory,
}

const CATALOGUE: &[Reward] = &[
    Reward {
        id: "study-music",
        name: "Study Music Pack",
        description: "Unlock premium focus music tracks",
        cost: 100,
        category: RewardCategory::Digital,
    },
    Reward {
        id: "dark-theme",
        name: "Dark Theme",
        description: "Enable dark mode for the app",
        cost: 50,
        category: RewardCategory::Feature,
    },
    Reward {
        id: "focus-wallpapers",
        name: "Focus Wallpapers",
        description: "Beautiful wallpapers for your device",
        cost: 75,
        category: RewardCategory::Digital,
    },
    Reward {
        id: "extended-stats",
        name: "Extended Stats",
        description: "Detailed analytics of your focus sessions",
        cost: 150,
        category: RewardCategory::Feature,
    },
];

/// All rewards, in display order.
pub const fn catalogue() -> &'static [Reward] {
    CATALOGUE
}

/// Looks up a reward by ID.
pub fn find(id: &RewardId) -> Option<&'static Reward> {
    CATALOGUE.iter().find(|reward| reward.id == id.as_str())
}

/// Outcome of a purchase attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purchase {
    Bought { cost: u64, balance: u64 },
    /// The balance was `shortfall` coins short.
    Insufficient { shortfall: u64 },
}

/// Spends the reward's cost from the ledger.
pub fn purchase<S: SnapshotStore>(
    ledger: &mut FocusLedger<S>,
    reward: &Reward,
) -> Result<Persisted<Purchase>, LedgerError> {
    let balance = ledger.coin_balance();
    let spent = ledger.spend_coins(reward.cost)?;
    Ok(spent.map(|ok| {
        if ok {
            Purchase::Bought {
                cost: reward.cost,
                balance: balance - reward.cost,
            }
        } else {
            Purchase::Insufficient {
                shortfall: reward.cost - balance,
            }
        }
    }))
}
