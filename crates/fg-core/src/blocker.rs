//! Notification/app blocking capability.
//!
//! [`NotificationBlocker`] is the contract with the platform layer that does
//! the actual blocking. Two implementations exist: [`LocalBlocker`] here, a
//! no-op stand-in for hosts without a native layer, and the HTTP bridge in
//! the `fg-bridge` crate. One of them is picked at startup.
//!
//! Callers going through [`AppShield`] never see a [`BlockerError`]: the
//! shield catches every failure and reports the feature as unavailable.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::AppId;

/// Errors at the blocker boundary.
#[derive(Debug, Error)]
pub enum BlockerError {
    /// The platform layer is missing or refused the call.
    #[error("notification blocker unavailable: {0}")]
    Unavailable(String),
    /// The user has not granted the permission blocking needs.
    #[error("notification permission denied")]
    PermissionDenied,
    /// The request never produced a response.
    #[error("blocker transport failed: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
    /// The response did not have the expected shape.
    #[error("invalid blocker response: {0}")]
    InvalidResponse(String),
}

/// An application reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledApp {
    pub app_id: AppId,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl InstalledApp {
    fn catalogue_entry(app_id: &str, display_name: &str) -> Option<Self> {
        Some(Self {
            app_id: AppId::new(app_id).ok()?,
            display_name: display_name.to_string(),
            icon: None,
        })
    }
}

/// Platform contract for blocking notifications from other apps.
#[async_trait]
pub trait NotificationBlocker: Send + Sync {
    async fn check_permission(&self) -> Result<bool, BlockerError>;

    async fn request_permission(&self) -> Result<bool, BlockerError>;

    async fn block_app(&self, app_id: &AppId) -> Result<bool, BlockerError>;

    async fn unblock_app(&self, app_id: &AppId) -> Result<bool, BlockerError>;

    async fn list_installed_apps(&self) -> Result<Vec<InstalledApp>, BlockerError>;
}

const LOCAL_CATALOGUE: &[(&str, &str)] = &[
    ("com.instagram.android", "Instagram"),
    ("com.tiktok.android", "TikTok"),
    ("com.google.android.youtube", "YouTube"),
    ("com.twitter.android", "Twitter"),
    ("com.facebook.katana", "Facebook"),
    ("com.whatsapp", "WhatsApp"),
    ("com.spotify.music", "Spotify"),
    ("com.netflix.mediaclient", "Netflix"),
];

/// Blocker for hosts without a native layer.
///
/// Grants permission, reports every block/unblock as successful, and lists a
/// fixed catalogue of common apps.
#[derive(Debug, Clone)]
pub struct LocalBlocker {
    apps: Vec<InstalledApp>,
}

impl Default for LocalBlocker {
    fn default() -> Self {
        Self {
            apps: LOCAL_CATALOGUE
                .iter()
                .filter_map(|(id, name)| InstalledApp::catalogue_entry(id, name))
                .collect(),
        }
    }
}

impl LocalBlocker {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationBlocker for LocalBlocker {
    async fn check_permission(&self) -> Result<bool, BlockerError> {
        Ok(true)
    }

    async fn request_permission(&self) -> Result<bool, BlockerError> {
        Ok(true)
    }

    async fn block_app(&self, app_id: &AppId) -> Result<bool, BlockerError> {
        tracing::debug!(%app_id, "local blocker: block");
        Ok(true)
    }

    async fn unblock_app(&self, app_id: &AppId) -> Result<bool, BlockerError> {
        tracing::debug!(%app_id, "local blocker: unblock");
        Ok(true)
    }

    async fn list_installed_apps(&self) -> Result<Vec<InstalledApp>, BlockerError> {
        Ok(self.apps.clone())
    }
}

/// Whether blocking is in effect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ShieldStatus {
    #[default]
    Inactive,
    Engaged {
        blocked: usize,
    },
    Unavailable {
        reason: String,
    },
}

/// Blocks distracting apps for the length of a session.
///
/// Every blocker failure is logged and turned into
/// [`ShieldStatus::Unavailable`]; callers carry on without blocking.
#[derive(Debug)]
pub struct AppShield<B> {
    blocker: B,
    blocked: Vec<AppId>,
    status: ShieldStatus,
}

impl<B: NotificationBlocker> AppShield<B> {
    pub const fn new(blocker: B) -> Self {
        Self {
            blocker,
            blocked: Vec::new(),
            status: ShieldStatus::Inactive,
        }
    }

    /// Blocks every installed app that is not in `allowed`.
    ///
    /// Already engaged shields are left as they are.
    pub async fn engage(&mut self, allowed: &BTreeSet<AppId>) -> &ShieldStatus {
        if matches!(self.status, ShieldStatus::Engaged { .. }) {
            return &self.status;
        }

        match self.block_all_except(allowed).await {
            Ok(()) => {
                tracing::debug!(blocked = self.blocked.len(), "app shield engaged");
                self.status = ShieldStatus::Engaged {
                    blocked: self.blocked.len(),
                };
            }
            Err(err) => {
                tracing::warn!(error = %err, "app blocking unavailable");
                self.release().await;
                self.status = ShieldStatus::Unavailable {
                    reason: err.to_string(),
                };
            }
        }
        &self.status
    }

    /// Unblocks everything this shield blocked. Returns how many were released.
    pub async fn release(&mut self) -> usize {
        let mut released = 0;
        for app_id in self.blocked.drain(..) {
            match self.blocker.unblock_app(&app_id).await {
                Ok(true) => released += 1,
                Ok(false) => tracing::warn!(%app_id, "blocker refused to unblock app"),
                Err(err) => tracing::warn!(%app_id, error = %err, "failed to unblock app"),
            }
        }
        if matches!(self.status, ShieldStatus::Engaged { .. }) {
            self.status = ShieldStatus::Inactive;
        }
        released
    }

    /// Checks (and optionally requests) the blocking permission.
    ///
    /// Failures read as "not granted".
    pub async fn permission(&self, request: bool) -> bool {
        let result = if request {
            self.blocker.request_permission().await
        } else {
            self.blocker.check_permission().await
        };
        result.unwrap_or_else(|err| {
            tracing::warn!(error = %err, "permission query failed");
            false
        })
    }

    /// Installed apps, or an empty list if the blocker cannot provide them.
    pub async fn installed_apps(&self) -> Vec<InstalledApp> {
        self.blocker
            .list_installed_apps()
            .await
            .unwrap_or_else(|err| {
                tracing::warn!(error = %err, "failed to list installed apps");
                Vec::new()
            })
    }

    pub const fn status(&self) -> &ShieldStatus {
        &self.status
    }

    pub fn blocked(&self) -> &[AppId] {
        &self.blocked
    }

    pub const fn blocker(&self) -> &B {
        &self.blocker
    }

    async fn block_all_except(&mut self, allowed: &BTreeSet<AppId>) -> Result<(), BlockerError> {
        if !self.blocker.check_permission().await? {
            return Err(BlockerError::PermissionDenied);
        }
        let apps = self.blocker.list_installed_apps().await?;
        for app in apps {
            if allowed.contains(&app.app_id) {
                continue;
            }
            if self.blocker.block_app(&app.app_id).await? {
                self.blocked.push(app.app_id);
            } else {
                tracing::warn!(app_id = %app.app_id, "blocker refused to block app");
            }
        }
        Ok(())
    }
}
