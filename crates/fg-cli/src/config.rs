//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use fg_core::LedgerDefaults;
use serde::{Deserialize, Serialize};

/// Which notification blocker to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockerKind {
    /// Built-in stand-in with no platform integration.
    #[default]
    Local,
    /// HTTP bridge to a native companion.
    Bridge,
}

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    /// Milliseconds between clock ticks during a focus session.
    pub tick_interval_ms: u64,
    /// Blocker implementation, chosen once at startup.
    pub blocker: BlockerKind,
    /// Base URL of the native bridge (only used with `blocker = "bridge"`).
    pub bridge_url: String,
    /// Coin balance for a brand-new ledger.
    pub starting_coins: u64,
    /// Streak for a brand-new ledger.
    pub starting_streak: u64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("tick_interval_ms", &self.tick_interval_ms)
            .field("blocker", &self.blocker)
            .field("bridge_url", &self.bridge_url)
            .finish_non_exhaustive()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("fg.db"),
            tick_interval_ms: 1000,
            blocker: BlockerKind::Local,
            bridge_url: "http://127.0.0.1:8787".to_string(),
            starting_coins: 0,
            starting_streak: 0,
        }
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (FG_*)
        figment = figment.merge(Env::prefixed("FG_"));

        figment.extract()
    }

    /// Tick cadence, never shorter than one millisecond.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub const fn ledger_defaults(&self) -> LedgerDefaults {
        LedgerDefaults {
            coin_balance: self.starting_coins,
            streak_days: self.starting_streak,
        }
    }
}

/// Returns the platform-specific config directory for fg.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("fg"))
}

/// Returns the platform-specific data directory for fg.
///
/// On Linux: `~/.local/share/fg`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("fg"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_dirs_data_path_ends_with_fg() {
        let path = dirs_data_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "fg");
    }

    #[test]
    fn test_default_config_uses_data_dir_for_db() {
        let config = Config::default();
        let data_dir = dirs_data_path().unwrap();
        assert_eq!(config.database_path, data_dir.join("fg.db"));
        assert_eq!(config.blocker, BlockerKind::Local);
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
        assert_eq!(config.ledger_defaults(), LedgerDefaults::default());
    }

    #[test]
    fn test_config_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
database_path = "/tmp/focus.db"
tick_interval_ms = 250
blocker = "bridge"
starting_coins = 120
starting_streak = 3
"#
        )
        .unwrap();
        file.flush().unwrap();

        let config = Config::load_from(Some(file.path())).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/focus.db"));
        assert_eq!(config.tick_interval(), Duration::from_millis(250));
        assert_eq!(config.blocker, BlockerKind::Bridge);
        assert_eq!(
            config.ledger_defaults(),
            LedgerDefaults {
                coin_balance: 120,
                streak_days: 3
            }
        );
    }

    #[test]
    fn test_zero_tick_interval_is_clamped() {
        let config = Config {
            tick_interval_ms: 0,
            ..Config::default()
        };
        assert_eq!(config.tick_interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_unknown_blocker_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"blocker = "carrier-pigeon""#).unwrap();
        file.flush().unwrap();
        assert!(Config::load_from(Some(file.path())).is_err());
    }
}
