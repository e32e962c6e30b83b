//! Public keys published on GitHub.
//!
//! Two independent sources per user: `<web>/<user>.keys` (SSH, one key per
//! line) and `<web>/<user>.gpg` (armored OpenPGP). An empty `.gpg` body falls
//! back to the REST endpoint `<api>/users/<user>/gpg_keys`.

use async_trait::async_trait;
use domain::ports::key_provider::{KeyFetchError, KeyProvider};
use serde::Deserialize;
use tracing::{debug, warn};

pub const GITHUB_WEB_BASE: &str = "https://github.com";
pub const GITHUB_API_BASE: &str = "https://api.github.com";

const USER_AGENT: &str = concat!("magnet/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct ApiGpgKey {
    #[serde(default)]
    raw_key: Option<String>,
}

pub struct GithubKeyFetcher {
    client: reqwest::Client,
    web_base: String,
    api_base: String,
}

impl GithubKeyFetcher {
    pub fn new() -> Self {
        Self::with_endpoints(GITHUB_WEB_BASE, GITHUB_API_BASE)
    }

    pub fn with_endpoints(web_base: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            web_base: web_base.into().trim_end_matches('/').to_string(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    async fn get_text(&self, url: String) -> Result<String, KeyFetchError> {
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .map_err(|e| KeyFetchError::Transport {
                url: url.clone(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(KeyFetchError::Status {
                url,
                status: response.status().as_u16(),
            });
        }

        response.text().await.map_err(|e| KeyFetchError::Transport {
            url,
            message: e.to_string(),
        })
    }

    async fn ssh_keys(&self, username: &str) -> Result<Vec<String>, KeyFetchError> {
        let body = self
            .get_text(format!("{}/{}.keys", self.web_base, username))
            .await?;
        Ok(parse_ssh_keys(&body))
    }

    async fn gpg_keys(&self, username: &str) -> Result<Option<String>, KeyFetchError> {
        match self
            .get_text(format!("{}/{}.gpg", self.web_base, username))
            .await
        {
            Ok(body) if !body.trim().is_empty() => return Ok(Some(body)),
            Ok(_) => debug!(username, "empty .gpg body, trying the API"),
            Err(e) => debug!(username, error = %e, ".gpg lookup failed, trying the API"),
        }

        let url = format!("{}/users/{}/gpg_keys", self.api_base, username);
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| KeyFetchError::Transport {
                url: url.clone(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(KeyFetchError::Status {
                url,
                status: response.status().as_u16(),
            });
        }

        let keys: Vec<ApiGpgKey> = response
            .json()
            .await
            .map_err(|e| KeyFetchError::Transport {
                url,
                message: e.to_string(),
            })?;
        Ok(join_api_keys(&keys))
    }
}

impl Default for GithubKeyFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyProvider for GithubKeyFetcher {
    async fn fetch_keys(&self, username: &str) -> Result<Vec<String>, KeyFetchError> {
        if !is_valid_username(username) {
            return Err(KeyFetchError::Unavailable {
                username: username.to_string(),
                details: "not a valid GitHub username".to_string(),
            });
        }

        let (ssh, gpg) = tokio::join!(self.ssh_keys(username), self.gpg_keys(username));

        let mut keys = Vec::new();
        let mut failures = Vec::new();

        match ssh {
            Ok(found) => keys.extend(found),
            Err(e) => {
                warn!(username, error = %e, "SSH key lookup failed");
                failures.push(e.to_string());
            }
        }
        match gpg {
            Ok(found) => keys.extend(found),
            Err(e) => {
                warn!(username, error = %e, "GPG key lookup failed");
                failures.push(e.to_string());
            }
        }

        if failures.len() == 2 {
            return Err(KeyFetchError::Unavailable {
                username: username.to_string(),
                details: failures.join("; "),
            });
        }

        debug!(username, count = keys.len(), "fetched candidate keys");
        Ok(keys)
    }
}

/// One candidate per non-empty line
pub fn parse_ssh_keys(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// All API `raw_key` blocks joined into a single armored candidate
fn join_api_keys(keys: &[ApiGpgKey]) -> Option<String> {
    let joined = keys
        .iter()
        .filter_map(|key| key.raw_key.as_deref())
        .filter(|raw| !raw.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    (!joined.is_empty()).then_some(joined)
}

// GitHub logins: alphanumerics and single hyphens, at most 39 chars
fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.len() <= 39
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
}
