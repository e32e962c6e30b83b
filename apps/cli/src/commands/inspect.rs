use anyhow::Result;
use clap::Args;
use magnet::domain::runtime::{Runtime, RuntimeProbe};
use magnet::domain::security::VerificationOutcome;
use magnet::domain::wizard::default_values;
use magnet_manifest::ManifestValidator;
use serde_json::json;

use super::resolve_link;
use crate::core::context::AppContext;
use crate::core::error::CliError;
use crate::ui::{summary, Theme};

#[derive(Args, Debug)]
pub struct InspectCommand {
    /// The deep link to resolve
    pub url: String,

    /// Print the resolved link as JSON
    #[arg(long)]
    pub json: bool,
}

impl InspectCommand {
    pub async fn execute(self, ctx: &AppContext) -> Result<()> {
        let link = resolve_link(ctx, &self.url).await?;
        let manifest = &link.manifest;
        let permissions = Runtime::for_command(&manifest.command)
            .and_then(|runtime| runtime.permission_summary(&manifest.args));

        if self.json {
            let report = json!({
                "manifest": manifest,
                "trust": link.trust,
                "payload": link.payload,
                "permissions": permissions,
                "lint": ManifestValidator::lint(manifest).issues,
                "serverConfig": manifest.server_config(&default_values(manifest)),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!("{}\n", summary::overview(manifest, &link.trust));
            for line in summary::lint(&ManifestValidator::lint(manifest)) {
                println!("{}", line);
            }
            if let Some(permissions) = &permissions {
                println!("{}\n", summary::permissions(permissions));
            }
            if let Some(runtime) = Runtime::for_command(&manifest.command) {
                let probe = RuntimeProbe::new(runtime, ctx.platform.os_type, ctx.shell.clone());
                let status = if probe.is_installed().await {
                    Theme::success("installed")
                } else {
                    Theme::warning("not installed")
                };
                println!("{} {} ({})\n", Theme::muted("runtime:"), runtime.name(), status);
            }
            println!(
                "{}",
                summary::server_config(&manifest.name, &manifest.server_config(&default_values(manifest)))
            );
        }

        match link.trust {
            VerificationOutcome::Failed(reason) => Err(CliError::Untrusted(reason).into()),
            _ => Ok(()),
        }
    }
}
