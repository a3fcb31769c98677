//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Focus session tracker with coins, streaks and app blocking.
///
/// Run timed focus sessions, earn a coin per focused minute, and spend coins
/// on rewards.
#[derive(Debug, Parser)]
#[command(name = "fg", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show focus totals, coins, streak and allowed apps.
    Status {
        /// Output the raw snapshot as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Run a focus session in the foreground.
    ///
    /// While it runs, type `pause`, `yes`/`no`, `resume`, `status` or `stop`.
    Focus {
        /// Session length in minutes (default 25).
        #[arg(long, conflicts_with = "seconds")]
        minutes: Option<u64>,

        /// Session length in seconds.
        #[arg(long)]
        seconds: Option<u64>,
    },

    /// Earn or spend coins directly.
    #[command(subcommand)]
    Coins(CoinsAction),

    /// Browse and buy rewards.
    #[command(subcommand)]
    Rewards(RewardsAction),

    /// Manage apps allowed during focus sessions.
    #[command(subcommand)]
    Apps(AppsAction),

    /// Check or request the notification-blocking permission.
    Permission {
        /// Ask for the permission instead of only checking it.
        #[arg(long)]
        request: bool,
    },

    /// Adjust the streak counter.
    #[command(subcommand)]
    Streak(StreakAction),

    /// Show recent focus sessions.
    History {
        /// Maximum number of sessions to show.
        #[arg(long, default_value_t = 10)]
        limit: usize,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Coin actions.
#[derive(Debug, Subcommand)]
pub enum CoinsAction {
    /// Add coins to the balance.
    Earn { amount: u64 },
    /// Spend coins if the balance allows it.
    Spend { amount: u64 },
}

/// Reward actions.
#[derive(Debug, Subcommand)]
pub enum RewardsAction {
    /// List the reward catalogue.
    List,
    /// Buy a reward by ID.
    Buy { id: String },
}

/// Allowed-app actions.
#[derive(Debug, Subcommand)]
pub enum AppsAction {
    /// List installed apps and whether each is allowed.
    List,
    /// Allow an app during focus sessions, or stop allowing it.
    Toggle { app_id: String },
}

/// Streak actions.
#[derive(Debug, Subcommand)]
pub enum StreakAction {
    /// Set the streak to a number of days.
    Set { days: u64 },
}
