//! Shared utilities for CLI commands.

use anyhow::{Context, Result};
use fg_core::PersistenceWarning;

/// Formats seconds as `mm:ss`, or `h:mm:ss` from one hour up.
pub fn format_clock(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes:02}:{secs:02}")
    }
}

/// Formats a minute count as `Xh YYm` (or `Ym` under an hour).
pub fn format_minutes(total: u64) -> String {
    let hours = total / 60;
    let minutes = total % 60;
    if hours > 0 {
        format!("{hours}h {minutes:02}m")
    } else {
        format!("{minutes}m")
    }
}

/// Prints a persistence warning to stderr. The command itself still succeeds.
pub fn report_warning(warning: Option<&PersistenceWarning>) {
    if let Some(warning) = warning {
        tracing::debug!(?warning, "persistence warning");
        eprintln!("warning: {warning}");
    }
}

/// Builds the single-threaded runtime used for blocker calls and the ticker.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to initialize tokio runtime")
}
