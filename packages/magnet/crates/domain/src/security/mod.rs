pub mod key_cache;
pub mod trust;
pub mod verification;

pub use key_cache::KeyCache;
pub use trust::{FailureReason, VerificationOutcome};
pub use verification::{SignatureFormat, SignatureVerifier, VerifyError};
