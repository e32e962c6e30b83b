use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyFetchError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("no key source reachable for '{username}': {details}")]
    Unavailable { username: String, details: String },
}

/// Looks up the public keys an identity has published.
///
/// Each returned entry is one candidate: an SSH public key line or an
/// armored OpenPGP key block.
#[async_trait]
pub trait KeyProvider: Send + Sync {
    async fn fetch_keys(&self, username: &str) -> Result<Vec<String>, KeyFetchError>;
}
