use super::codec::DecodeError;
use magnet_manifest::ValidationError;
use thiserror::Error;

/// Terminal reasons a link is refused before any verification happens
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeepLinkError {
    #[error("unsupported link '{found}', expected {expected}://install")]
    InvalidProtocol { expected: String, found: String },

    #[error("link has no manifest parameter")]
    MissingManifest,

    #[error("manifest parameter could not be decoded: {0}")]
    Decode(#[from] DecodeError),

    #[error("manifest rejected: {0}")]
    InvalidManifest(#[from] ValidationError),

    #[error("signed manifests must declare a 'github:<username>' author (found {})", .found.as_deref().unwrap_or("none"))]
    UnsupportedAuthor { found: Option<String> },
}
