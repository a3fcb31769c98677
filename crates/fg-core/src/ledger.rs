//! Durable gamification bookkeeping.
//!
//! The [`FocusLedger`] owns the counters that survive across runs: focused
//! minutes, completed sessions, coins, streak days, and the apps exempted from
//! blocking. Every mutation is write-through: the full snapshot is serialized
//! and handed to the [`SnapshotStore`] before the call returns.
//!
//! # Failure semantics
//!
//! Store failures never abort a mutation. The in-memory state stays
//! authoritative and the failure comes back as a [`PersistenceWarning`]
//! alongside the operation's value (see [`Persisted`]). The next successful
//! write carries the whole snapshot, so it reconciles whatever was missed.

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::store::{SnapshotStore, StoreError};
use crate::types::AppId;

/// Maps completed minutes to coins.
pub type CoinPolicy = fn(u64) -> u64;

/// Default coin policy: one coin per completed minute.
pub const fn one_coin_per_minute(minutes: u64) -> u64 {
    minutes
}

/// Minutes of focus per level.
pub const MINUTES_PER_LEVEL: u64 = 60;

/// Focus level for a minute total. Levels start at 1.
pub const fn focus_level(total_minutes: u64) -> u64 {
    total_minutes / MINUTES_PER_LEVEL + 1
}

/// Fraction of the current level completed, in `[0, 1)`.
#[expect(
    clippy::cast_precision_loss,
    reason = "the remainder is always below MINUTES_PER_LEVEL"
)]
pub fn level_progress(total_minutes: u64) -> f64 {
    (total_minutes % MINUTES_PER_LEVEL) as f64 / MINUTES_PER_LEVEL as f64
}

/// Persisted ledger state.
///
/// Serialized as camelCase JSON. Missing fields take their default value and
/// unknown fields are ignored. Allowed-app entries that are not valid IDs are
/// dropped one by one instead of rejecting the document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LedgerSnapshot {
    pub total_focus_minutes: u64,
    pub completed_session_count: u64,
    pub coin_balance: u64,
    pub streak_days: u64,
    #[serde(deserialize_with = "lenient_app_ids")]
    pub allowed_app_ids: BTreeSet<AppId>,
}

fn lenient_app_ids<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeSet<AppId>, D::Error> {
    let entries = Vec::<serde_json::Value>::deserialize(deserializer)?;
    Ok(entries
        .into_iter()
        .filter_map(|entry| {
            let parsed = match &entry {
                serde_json::Value::String(id) => AppId::new(id.as_str()).map_err(|e| e.to_string()),
                _ => Err("not a string".to_string()),
            };
            parsed
                .inspect_err(|reason| {
                    tracing::warn!(%entry, %reason, "dropping invalid allowed app ID");
                })
                .ok()
        })
        .collect())
}

/// Starting values for a ledger with no usable snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerDefaults {
    pub coin_balance: u64,
    pub streak_days: u64,
}

impl LedgerDefaults {
    fn snapshot(self) -> LedgerSnapshot {
        LedgerSnapshot {
            coin_balance: self.coin_balance,
            streak_days: self.streak_days,
            ..LedgerSnapshot::default()
        }
    }
}

/// Argument errors for ledger operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("invalid argument to {operation}: {reason}")]
    InvalidArgument {
        operation: &'static str,
        reason: &'static str,
    },
}

/// Non-fatal persistence problems.
#[derive(Debug, Error)]
pub enum PersistenceWarning {
    #[error("failed to read ledger snapshot: {0}")]
    Read(#[source] StoreError),
    #[error("ledger snapshot is malformed, starting fresh: {0}")]
    Corrupt(#[source] serde_json::Error),
    #[error("failed to serialize ledger snapshot: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to write ledger snapshot: {0}")]
    Write(#[source] StoreError),
}

/// The result of a mutation plus any warning from its write-through.
#[derive(Debug)]
#[must_use]
pub struct Persisted<T> {
    pub value: T,
    pub warning: Option<PersistenceWarning>,
}

impl<T> Persisted<T> {
    const fn clean(value: T) -> Self {
        Self {
            value,
            warning: None,
        }
    }

    /// Discards the warning and returns the value.
    pub fn into_value(self) -> T {
        self.value
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Persisted<U> {
        Persisted {
            value: f(self.value),
            warning: self.warning,
        }
    }
}

/// What a recorded session added to the ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionCredit {
    pub minutes: u64,
    pub coins: u64,
}

/// Receives the outcome of a finished focus session.
///
/// Implemented by [`FocusLedger`]; the clock only depends on this seam.
pub trait SessionRecorder {
    fn record_session(&mut self, duration_seconds: u64, completed: bool)
    -> Persisted<SessionCredit>;
}

impl<R: SessionRecorder + ?Sized> SessionRecorder for &mut R {
    fn record_session(
        &mut self,
        duration_seconds: u64,
        completed: bool,
    ) -> Persisted<SessionCredit> {
        (**self).record_session(duration_seconds, completed)
    }
}

/// Write-through ledger over a [`SnapshotStore`].
#[derive(Debug)]
pub struct FocusLedger<S> {
    store: S,
    snapshot: LedgerSnapshot,
    coin_policy: CoinPolicy,
}

impl<S: SnapshotStore> FocusLedger<S> {
    /// Loads the ledger from `store`.
    ///
    /// An absent snapshot yields `defaults`. An unreadable or malformed one
    /// also yields `defaults`, together with a warning.
    pub fn load(store: S, defaults: LedgerDefaults) -> (Self, Option<PersistenceWarning>) {
        let (snapshot, warning) = match store.read() {
            Ok(Some(payload)) => match serde_json::from_str::<LedgerSnapshot>(&payload) {
                Ok(snapshot) => (snapshot, None),
                Err(err) => {
                    tracing::warn!(error = %err, "discarding malformed ledger snapshot");
                    (defaults.snapshot(), Some(PersistenceWarning::Corrupt(err)))
                }
            },
            Ok(None) => {
                tracing::debug!("no ledger snapshot found, using defaults");
                (defaults.snapshot(), None)
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to read ledger snapshot");
                (defaults.snapshot(), Some(PersistenceWarning::Read(err)))
            }
        };

        let ledger = Self {
            store,
            snapshot,
            coin_policy: one_coin_per_minute,
        };
        (ledger, warning)
    }

    /// Replaces the coin policy.
    #[must_use]
    pub fn with_coin_policy(mut self, policy: CoinPolicy) -> Self {
        self.coin_policy = policy;
        self
    }

    /// Records the end of a focus session.
    ///
    /// Sessions that did not complete change nothing and are not persisted.
    /// Completed sessions credit `floor(duration_seconds / 60)` minutes, one
    /// session, and whatever the coin policy pays for those minutes.
    pub fn record_session(
        &mut self,
        duration_seconds: u64,
        completed: bool,
    ) -> Persisted<SessionCredit> {
        if !completed {
            tracing::debug!(duration_seconds, "session not completed, nothing accrued");
            return Persisted::clean(SessionCredit::default());
        }

        let minutes = duration_seconds / 60;
        let coins = (self.coin_policy)(minutes);
        let snapshot = &mut self.snapshot;
        snapshot.total_focus_minutes = snapshot.total_focus_minutes.saturating_add(minutes);
        snapshot.completed_session_count = snapshot.completed_session_count.saturating_add(1);
        snapshot.coin_balance = snapshot.coin_balance.saturating_add(coins);
        tracing::info!(
            minutes,
            coins,
            sessions = snapshot.completed_session_count,
            "recorded completed session"
        );

        self.persisted(SessionCredit { minutes, coins })
    }

    /// Credits coins outside the session path. Returns the new balance.
    pub fn earn_coins(&mut self, amount: u64) -> Persisted<u64> {
        self.snapshot.coin_balance = self.snapshot.coin_balance.saturating_add(amount);
        tracing::debug!(amount, balance = self.snapshot.coin_balance, "earned coins");
        self.persisted(self.snapshot.coin_balance)
    }

    /// Deducts coins if the balance covers `amount`.
    ///
    /// An insufficient balance is a normal outcome: the value is `false` and
    /// nothing is written.
    pub fn spend_coins(&mut self, amount: u64) -> Result<Persisted<bool>, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidArgument {
                operation: "spend_coins",
                reason: "amount must be positive",
            });
        }
        let Some(remaining) = self.snapshot.coin_balance.checked_sub(amount) else {
            tracing::debug!(
                amount,
                balance = self.snapshot.coin_balance,
                "insufficient coins"
            );
            return Ok(Persisted::clean(false));
        };
        self.snapshot.coin_balance = remaining;
        tracing::debug!(amount, balance = remaining, "spent coins");
        Ok(self.persisted(true))
    }

    /// Flips membership of `app_id` in the allowed set.
    ///
    /// Returns `true` if the app is allowed after the call.
    pub fn toggle_allowed_app(&mut self, app_id: AppId) -> Persisted<bool> {
        let allowed = &mut self.snapshot.allowed_app_ids;
        let now_allowed = if allowed.remove(&app_id) {
            false
        } else {
            allowed.insert(app_id);
            true
        };
        self.persisted(now_allowed)
    }

    /// Sets the streak counter. The increment policy belongs to the caller.
    pub fn set_streak_days(&mut self, days: u64) -> Persisted<()> {
        self.snapshot.streak_days = days;
        self.persisted(())
    }

    pub const fn snapshot(&self) -> &LedgerSnapshot {
        &self.snapshot
    }

    pub const fn total_focus_minutes(&self) -> u64 {
        self.snapshot.total_focus_minutes
    }

    pub const fn completed_session_count(&self) -> u64 {
        self.snapshot.completed_session_count
    }

    pub const fn coin_balance(&self) -> u64 {
        self.snapshot.coin_balance
    }

    pub const fn streak_days(&self) -> u64 {
        self.snapshot.streak_days
    }

    pub const fn level(&self) -> u64 {
        focus_level(self.snapshot.total_focus_minutes)
    }

    pub fn level_progress(&self) -> f64 {
        level_progress(self.snapshot.total_focus_minutes)
    }

    pub fn is_allowed(&self, app_id: &AppId) -> bool {
        self.snapshot.allowed_app_ids.contains(app_id)
    }

    pub const fn allowed_apps(&self) -> &BTreeSet<AppId> {
        &self.snapshot.allowed_app_ids
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn persisted<T>(&mut self, value: T) -> Persisted<T> {
        Persisted {
            value,
            warning: self.persist(),
        }
    }

    fn persist(&mut self) -> Option<PersistenceWarning> {
        let payload = match serde_json::to_string(&self.snapshot) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(error = %err, "failed to serialize ledger snapshot");
                return Some(PersistenceWarning::Serialize(err));
            }
        };
        match self.store.write(&payload) {
            Ok(()) => None,
            Err(err) => {
                tracing::warn!(error = %err, "failed to write ledger snapshot");
                Some(PersistenceWarning::Write(err))
            }
        }
    }
}

impl<S: SnapshotStore> SessionRecorder for FocusLedger<S> {
    fn record_session(
        &mut self,
        duration_seconds: u64,
        completed: bool,
    ) -> Persisted<SessionCredit> {
        Self::record_session(self, duration_seconds, completed)
    }
}
