//! Registry tag-management API.
//!
//! Per-platform tags are removed with an authenticated HTTP `DELETE`
//! against the registry's tag endpoint once the manifest lists exist.

use crate::config::{RegistryAccess, RegistryApiConfig, Secret};
use crate::error::{ConfigError, RegistryError, Result};
use std::future::Future;
use std::time::Duration;
use url::Url;

/// Longest response body kept in error messages
const MAX_ERROR_BODY: usize = 512;

/// Deletes tags from a registry repository
pub trait TagDeleter: Sync {
    /// Delete `tag` from `repository`
    fn delete_tag(&self, repository: &str, tag: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Render the tag endpoint URL for one repository/tag pair
pub fn tag_url(api: &RegistryApiConfig, login_server: &str, repository: &str, tag: &str) -> Result<Url> {
    let invalid = |reason: String| ConfigError::InvalidEndpoint {
        template: api.tag_endpoint.clone(),
        reason,
    };

    let base = Url::parse(&format!("{}://{}", api.scheme, login_server))
        .map_err(|e| invalid(format!("bad login server '{login_server}': {e}")))?;
    let path = api
        .tag_endpoint
        .replace("{repository}", repository)
        .replace("{tag}", tag);

    base.join(&path).map_err(|e| invalid(e.to_string()).into())
}

/// HTTP client for the registry tag endpoint
#[derive(Debug, Clone)]
pub struct RegistryClient {
    http: reqwest::Client,
    api: RegistryApiConfig,
    login_server: String,
    username: String,
    password: Secret,
}

impl RegistryClient {
    /// Create a client authenticated with the run's credential pair
    pub fn new(access: &RegistryAccess, api: &RegistryApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(api.timeout_secs))
            .user_agent(concat!("container_release/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RegistryError::RequestFailed {
                url: access.login_server.clone(),
                reason: format!("failed to create HTTP client: {e}"),
            })?;

        // Fail on a bad endpoint before any task starts
        tag_url(api, &access.login_server, &access.repository, "probe")?;

        Ok(Self {
            http,
            api: api.clone(),
            login_server: access.login_server.clone(),
            username: access.username.clone(),
            password: access.password.clone(),
        })
    }
}

impl TagDeleter for RegistryClient {
    async fn delete_tag(&self, repository: &str, tag: &str) -> Result<()> {
        let url = tag_url(&self.api, &self.login_server, repository, tag)?;
        log::info!("DELETE {url}");

        let response = self
            .http
            .delete(url.clone())
            .basic_auth(&self.username, Some(self.password.expose()))
            .send()
            .await
            .map_err(|e| RegistryError::RequestFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            log::debug!("Deleted {repository}:{tag} ({status})");
            return Ok(());
        }

        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }

        Err(RegistryError::DeleteFailed {
            repository: repository.to_string(),
            tag: tag.to_string(),
            status: status.as_u16(),
            body,
        }
        .into())
    }
}
