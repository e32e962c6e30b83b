pub mod clients;
pub mod convert;
pub mod inspect;
pub mod link;
pub mod open;
pub mod schema;

use crate::core::context::AppContext;
use crate::core::error::CliError;
use crate::ui::components::Spinner;
use crate::ui::diagnostic::ManifestDiagnostic;
use magnet::domain::deeplink::{codec, DeepLinkError, ResolvedLink};
use std::io::ErrorKind;
use tracing::{debug, warn};
use url::Url;

/// Resolve `url` with a spinner, turning rejections into renderable errors
pub async fn resolve_link(ctx: &AppContext, url: &str) -> Result<ResolvedLink, CliError> {
    let service = ctx.link_service();
    let spinner = Spinner::new("Resolving link");
    spinner.set_message("decoding manifest and checking the signature");

    match service.resolve(url).await {
        Some(Ok(link)) => {
            debug!(manifest = %link.manifest.name, trust = ?link.trust, "link resolved");
            spinner.success(format!("{} resolved", link.manifest.title()));
            Ok(link)
        }
        Some(Err(DeepLinkError::InvalidManifest(error))) => {
            spinner.fail("manifest rejected");
            match decoded_manifest(url) {
                Some(source) => Err(CliError::Manifest(Box::new(ManifestDiagnostic::new(
                    "manifest (decoded from link)",
                    &source,
                    &error,
                )))),
                None => Err(CliError::Link(DeepLinkError::InvalidManifest(error))),
            }
        }
        Some(Err(e)) => {
            warn!(error = %e, "link rejected");
            spinner.fail("link rejected");
            Err(CliError::Link(e))
        }
        None => Err(CliError::Cancelled),
    }
}

// JSON text carried in the `manifest` parameter, for diagnostics
fn decoded_manifest(url: &str) -> Option<String> {
    let url = Url::parse(url.trim()).ok()?;
    let (_, param) = url.query_pairs().find(|(key, _)| key == "manifest")?;
    codec::decode(&param).ok()
}

/// Ctrl-C during a prompt surfaces as `Interrupted`
pub fn answered<T>(result: std::io::Result<T>) -> Result<T, CliError> {
    result.map_err(|e| match e.kind() {
        ErrorKind::Interrupted => CliError::Cancelled,
        _ => CliError::Io(e),
    })
}
