use serde::Serialize;
use std::fmt;

/// Why a signed manifest could not be trusted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FailureReason {
    /// Keys could not be retrieved, so nothing was checked
    KeyFetch(String),
    /// Keys were retrieved but none validated the signature
    NoMatchingKey,
    UnknownSignatureFormat,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::KeyFetch(message) => {
                write!(f, "could not verify: signing keys unavailable ({})", message)
            }
            FailureReason::NoMatchingKey => {
                write!(f, "signature does not match any published key")
            }
            FailureReason::UnknownSignatureFormat => write!(f, "unrecognized signature format"),
        }
    }
}

/// Result of binding a manifest to a signer identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum VerificationOutcome {
    /// No signature was attached. Installable, but nothing is proven.
    Unsigned,
    Verified { username: String },
    Failed(FailureReason),
}

impl VerificationOutcome {
    /// Failed outcomes keep the user out of the installer
    pub fn permits_install(&self) -> bool {
        !matches!(self, VerificationOutcome::Failed(_))
    }

    pub fn is_verified(&self) -> bool {
        matches!(self, VerificationOutcome::Verified { .. })
    }
}

impl fmt::Display for VerificationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationOutcome::Unsigned => write!(f, "unsigned (publisher not verified)"),
            VerificationOutcome::Verified { username } => {
                write!(f, "signed by github:{}", username)
            }
            VerificationOutcome::Failed(reason) => write!(f, "verification failed: {}", reason),
        }
    }
}
