use anyhow::Result;
use clap::Args;
use magnet::infrastructure::ClientKind;
use tracing::info;

use crate::core::context::AppContext;
use crate::core::error::CliError;
use crate::ui::{Icon, Theme};

#[derive(Args, Debug)]
pub struct ClientsCommand {
    /// Offer this client in the installer again
    #[arg(long, value_name = "ID", conflicts_with = "disable")]
    pub enable: Option<String>,

    /// Stop offering this client in the installer
    #[arg(long, value_name = "ID")]
    pub disable: Option<String>,
}

impl ClientsCommand {
    pub async fn execute(self, ctx: &AppContext) -> Result<()> {
        let change = match (self.enable, self.disable) {
            (Some(id), _) => Some((id, true)),
            (None, Some(id)) => Some((id, false)),
            (None, None) => None,
        };

        // Reload so a --scheme override is not persisted
        let config = match change {
            Some((id, enabled)) => {
                if ClientKind::from_id(&id).is_none() {
                    return Err(CliError::UnknownClient(id).into());
                }
                let mut stored = ctx.store.load()?;
                stored.set_client_enabled(&id, enabled);
                let saved = ctx.store.save(&stored)?;
                info!(client = %id, enabled, "client preference saved");
                cliclack::log::success(format!(
                    "{} {} in {}",
                    id,
                    if enabled { "enabled" } else { "disabled" },
                    ctx.store.path().display()
                ))?;
                saved
            }
            None => ctx.config.clone(),
        };

        let registry = ctx.all_clients()?;
        for info in registry.clients() {
            let status = if config.is_client_enabled(&info.id) {
                Theme::success(Icon::Check)
            } else {
                Theme::error(Icon::Cross)
            };
            let path = match registry.get(&info.id) {
                Some(adapter) => match adapter.config_file_path().await {
                    Ok(path) => path.display().to_string(),
                    Err(e) => e.to_string(),
                },
                None => String::new(),
            };
            println!(
                "{} {} {:<16} {}",
                status,
                Theme::primary(format!("{:<12}", info.id)),
                info.name,
                Theme::muted(path)
            );
        }
        Ok(())
    }
}
