//! Startup selection of the notification blocker.

use anyhow::{Context, Result};
use async_trait::async_trait;
use fg_bridge::BridgeBlocker;
use fg_core::{AppId, BlockerError, InstalledApp, LocalBlocker, NotificationBlocker};

use crate::config::{BlockerKind, Config};

/// The blocker picked from configuration.
#[derive(Debug)]
pub enum Blocker {
    Local(LocalBlocker),
    Bridge(BridgeBlocker),
}

impl Blocker {
    pub fn from_config(config: &Config) -> Result<Self> {
        let blocker = match config.blocker {
            BlockerKind::Local => Self::Local(LocalBlocker::new()),
            BlockerKind::Bridge => Self::Bridge(
                BridgeBlocker::new(&config.bridge_url).context("failed to set up blocker bridge")?,
            ),
        };
        tracing::debug!(kind = ?config.blocker, "selected notification blocker");
        Ok(blocker)
    }
}

#[async_trait]
impl NotificationBlocker for Blocker {
    async fn check_permission(&self) -> Result<bool, BlockerError> {
        match self {
            Self::Local(b) => b.check_permission().await,
            Self::Bridge(b) => b.check_permission().await,
        }
    }

    async fn request_permission(&self) -> Result<bool, BlockerError> {
        match self {
            Self::Local(b) => b.request_permission().await,
            Self::Bridge(b) => b.request_permission().await,
        }
    }

    async fn block_app(&self, app_id: &AppId) -> Result<bool, BlockerError> {
        match self {
            Self::Local(b) => b.block_app(app_id).await,
            Self::Bridge(b) => b.block_app(app_id).await,
        }
    }

    async fn unblock_app(&self, app_id: &AppId) -> Result<bool, BlockerError> {
        match self {
            Self::Local(b) => b.unblock_app(app_id).await,
            Self::Bridge(b) => b.unblock_app(app_id).await,
        }
    }

    async fn list_installed_apps(&self) -> Result<Vec<InstalledApp>, BlockerError> {
        match self {
            Self::Local(b) => b.list_installed_apps().await,
            Self::Bridge(b) => b.list_installed_apps().await,
        }
    }
}
