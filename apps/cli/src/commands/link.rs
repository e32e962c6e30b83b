use anyhow::{bail, Context, Result};
use clap::Args;
use magnet::domain::deeplink::{build_link, encode_manifest};
use magnet_manifest::{catalog, Manifest, ManifestValidator};
use std::fs;
use std::path::PathBuf;

use crate::core::context::AppContext;
use crate::core::error::CliError;
use crate::ui::diagnostic::ManifestDiagnostic;
use crate::ui::summary;

/// Signers sign the encoded `manifest` parameter, printed by `--param-only`:
///
/// ```text
/// magnet link server.json --param-only > payload
/// ssh-keygen -Y sign -f ~/.ssh/id_ed25519 -n file payload
/// magnet link server.json --signature payload.sig
/// ```
#[derive(Args, Debug)]
pub struct LinkCommand {
    /// Manifest JSON file
    #[arg(required_unless_present = "example", conflicts_with = "example")]
    pub manifest: Option<PathBuf>,

    /// Use a bundled example manifest instead of a file
    #[arg(long)]
    pub example: Option<String>,

    /// Armored SSH or PGP signature over the encoded manifest
    #[arg(long, short)]
    pub signature: Option<PathBuf>,

    /// Print only the encoded manifest parameter
    #[arg(long)]
    pub param_only: bool,
}

impl LinkCommand {
    pub fn execute(self, ctx: &AppContext) -> Result<()> {
        let manifest = self.load_manifest()?;
        for line in summary::lint(&ManifestValidator::lint(&manifest)) {
            eprintln!("{}", line);
        }
        let param = encode_manifest(&manifest).context("Failed to encode manifest")?;

        if self.param_only {
            print!("{}", param);
            return Ok(());
        }

        let signature = match &self.signature {
            Some(path) => Some(
                fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
            ),
            None => None,
        };
        if signature.is_some() && manifest.github_username().is_none() {
            bail!("signed manifests need \"manifestAuthor\": \"github:<username>\"");
        }

        let url = build_link(&ctx.config.scheme, &param, signature.as_deref())
            .with_context(|| format!("'{}' is not a usable link scheme", ctx.config.scheme))?;
        println!("{}", url);
        Ok(())
    }

    fn load_manifest(&self) -> Result<Manifest> {
        if let Some(name) = &self.example {
            let examples = catalog::examples().context("Bundled examples are invalid")?;
            return match examples.iter().find(|m| &m.name == name) {
                Some(manifest) => Ok(manifest.clone()),
                None => {
                    let names: Vec<&str> = examples.iter().map(|m| m.name.as_str()).collect();
                    bail!("no example named '{}' (available: {})", name, names.join(", "))
                }
            };
        }

        let Some(path) = &self.manifest else {
            bail!("pass a manifest file or --example <name>");
        };
        let source = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        ManifestValidator::parse(&source).map_err(|error| {
            CliError::Manifest(Box::new(ManifestDiagnostic::new(
                &path.display().to_string(),
                &source,
                &error,
            )))
            .into()
        })
    }
}
