use super::error::DeepLinkError;
use super::link::{parse_link, DeepLinkPayload, ParsedLink, DEFAULT_SCHEME};
use crate::ports::key_provider::KeyProvider;
use crate::security::trust::{FailureReason, VerificationOutcome};
use crate::security::verification::{SignatureFormat, SignatureVerifier};
use magnet_manifest::Manifest;
use std::sync::Arc;
use tracing::{info, warn};

/// A link that passed every terminal check, with its trust outcome attached
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLink {
    pub manifest: Manifest,
    pub payload: DeepLinkPayload,
    pub trust: VerificationOutcome,
}

/// URL in, manifest plus trust outcome out.
pub struct DeepLinkResolver {
    scheme: String,
    keys: Arc<dyn KeyProvider>,
    verifier: SignatureVerifier,
}

impl DeepLinkResolver {
    /// `keys` is normally a shared [`crate::security::KeyCache`]
    pub fn new(keys: Arc<dyn KeyProvider>) -> Self {
        Self {
            scheme: DEFAULT_SCHEME.to_string(),
            keys,
            verifier: SignatureVerifier::new(),
        }
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Synchronous part: protocol, decoding, schema and author checks
    pub fn parse(&self, url: &str) -> Result<ParsedLink, DeepLinkError> {
        parse_link(&self.scheme, url)
    }

    pub async fn resolve(&self, url: &str) -> Result<ResolvedLink, DeepLinkError> {
        let ParsedLink { manifest, payload } = self.parse(url)?;
        let trust = self.verify(&payload).await;

        info!(manifest = %manifest.name, trust = %trust, "deep link resolved");
        Ok(ResolvedLink {
            manifest,
            payload,
            trust,
        })
    }

    async fn verify(&self, payload: &DeepLinkPayload) -> VerificationOutcome {
        let (Some(signature), Some(username)) =
            (&payload.signature_param, &payload.github_username)
        else {
            return VerificationOutcome::Unsigned;
        };

        if SignatureFormat::detect(signature).is_none() {
            return VerificationOutcome::Failed(FailureReason::UnknownSignatureFormat);
        }

        let keys = match self.keys.fetch_keys(username).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(username = %username, error = %e, "could not fetch signing keys");
                return VerificationOutcome::Failed(FailureReason::KeyFetch(e.to_string()));
            }
        };

        if self
            .verifier
            .verify_any(payload.manifest_param.as_bytes(), signature, &keys)
        {
            VerificationOutcome::Verified {
                username: username.clone(),
            }
        } else {
            VerificationOutcome::Failed(FailureReason::NoMatchingKey)
        }
    }
}
