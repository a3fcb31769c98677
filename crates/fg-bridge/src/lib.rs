//! Native bridge for notification blocking.
//!
//! Talks JSON over HTTP to a companion process that owns OS-level blocking
//! (an Android notification listener, a desktop helper, ...). Each operation
//! is a `POST` to a fixed path:
//!
//! | Path                  | Request             | Response              |
//! |-----------------------|---------------------|-----------------------|
//! | `/permission/check`   | `{}`                | `{"granted": bool}`   |
//! | `/permission/request` | `{}`                | `{"granted": bool}`   |
//! | `/apps/block`         | `{"appId": "..."}`  | `{"success": bool}`   |
//! | `/apps/unblock`       | `{"appId": "..."}`  | `{"success": bool}`   |
//! | `/apps/list`          | `{}`                | `{"apps": [InstalledApp]}` |

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use fg_core::{AppId, BlockerError, InstalledApp, NotificationBlocker};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default request timeout for bridge calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Bridge client construction errors.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The base URL could not be parsed.
    #[error("invalid bridge URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

/// HTTP client for the native blocking companion.
///
/// # Thread Safety
///
/// The client is safe to clone and share across threads. Each clone shares
/// the underlying HTTP connection pool.
#[derive(Clone)]
pub struct BridgeBlocker {
    http: reqwest::Client,
    base_url: reqwest::Url,
}

impl fmt::Debug for BridgeBlocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeBlocker")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl BridgeBlocker {
    /// Creates a client for the bridge at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, BridgeError> {
        let mut parsed = reqwest::Url::parse(base_url).map_err(|err| BridgeError::InvalidUrl {
            url: base_url.to_string(),
            reason: err.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(BridgeError::InvalidUrl {
                url: base_url.to_string(),
                reason: format!("unsupported scheme {}", parsed.scheme()),
            });
        }
        // Joining relative paths replaces the last segment unless the base ends in '/'.
        if !parsed.path().ends_with('/') {
            let path = format!("{}/", parsed.path());
            parsed.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(BridgeError::ClientBuild)?;

        Ok(Self {
            http,
            base_url: parsed,
        })
    }

    pub const fn base_url(&self) -> &reqwest::Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<reqwest::Url, BlockerError> {
        self.base_url
            .join(path)
            .map_err(|err| BlockerError::Unavailable(format!("bad endpoint {path}: {err}")))
    }

    async fn call<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, BlockerError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        tracing::debug!(%url, "bridge request");

        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(BlockerError::Unavailable(format!("status {status}: {text}")));
        }

        serde_json::from_str(&text).map_err(|err| BlockerError::InvalidResponse(err.to_string()))
    }
}

#[async_trait]
impl NotificationBlocker for BridgeBlocker {
    async fn check_permission(&self) -> Result<bool, BlockerError> {
        let resp: PermissionResponse = self.call("permission/check", &Empty {}).await?;
        Ok(resp.granted)
    }

    async fn request_permission(&self) -> Result<bool, BlockerError> {
        let resp: PermissionResponse = self.call("permission/request", &Empty {}).await?;
        Ok(resp.granted)
    }

    async fn block_app(&self, app_id: &AppId) -> Result<bool, BlockerError> {
        let resp: SuccessResponse = self.call("apps/block", &AppRequest { app_id }).await?;
        Ok(resp.success)
    }

    async fn unblock_app(&self, app_id: &AppId) -> Result<bool, BlockerError> {
        let resp: SuccessResponse = self.call("apps/unblock", &AppRequest { app_id }).await?;
        Ok(resp.success)
    }

    async fn list_installed_apps(&self) -> Result<Vec<InstalledApp>, BlockerError> {
        let resp: AppsResponse = self.call("apps/list", &Empty {}).await?;
        Ok(resp.apps)
    }
}

#[derive(Debug, Serialize)]
struct Empty {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AppRequest<'a> {
    app_id: &'a AppId,
}

#[derive(Debug, Deserialize)]
struct PermissionResponse {
    granted: bool,
}

#[derive(Debug, Deserialize)]
struct SuccessResponse {
    success: bool,
}

#[derive(Debug, Deserialize)]
struct AppsResponse {
    apps: Vec<InstalledApp>,
}

fn transport_error(err: reqwest::Error) -> BlockerError {
    BlockerError::Transport {
        message: err.to_string(),
        source: Some(Box::new(err)),
    }
}
