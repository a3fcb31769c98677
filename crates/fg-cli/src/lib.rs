//! FocusGem CLI library.
//!
//! This crate provides the `fg` command-line interface over the focus clock
//! and ledger.

mod blocker;
mod cli;
pub mod commands;
mod config;

pub use blocker::Blocker;
pub use cli::{AppsAction, Cli, CoinsAction, Commands, RewardsAction, StreakAction};
pub use config::{BlockerKind, Config};
