//! Core domain logic for FocusGem.
//!
//! This crate contains the fundamental types and logic for:
//! - Session clock: the countdown state machine for one focus session
//! - Ledger: durable coins, minutes, streak and allowed-app bookkeeping
//! - Blocker: the notification-blocking capability and its degrading shield
//! - Rewards: the catalogue coins can be spent on

pub mod blocker;
pub mod clock;
pub mod ledger;
pub mod rewards;
pub mod store;
pub mod types;

pub use blocker::{
    AppShield, BlockerError, InstalledApp, LocalBlocker, NotificationBlocker, ShieldStatus,
};
pub use clock::{ClockError, ClockEvent, ClockStatus, PauseToken, SessionClock};
pub use ledger::{
    CoinPolicy, FocusLedger, LedgerDefaults, LedgerError, LedgerSnapshot, MINUTES_PER_LEVEL,
    Persisted, PersistenceWarning, SessionCredit, SessionRecorder, focus_level, level_progress,
    one_coin_per_minute,
};
pub use store::{MemoryStore, SnapshotStore, StoreError};
pub use types::{AppId, RewardId, ValidationError};
