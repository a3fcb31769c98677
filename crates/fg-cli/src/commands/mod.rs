//! CLI subcommand implementations.

pub mod apps;
pub mod coins;
pub mod focus;
pub mod history;
pub mod permission;
pub mod rewards;
pub mod status;
pub mod streak;
pub mod util;
