use super::json_file;
use async_trait::async_trait;
use domain::ports::config_adapter::{AdapterError, ClientInfo, ConfigAdapter};
use domain::ports::shell::{CommandName, ShellExecutor};
use domain::system::platform::OsType;
use magnet_manifest::McpServerConfig;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const CLIENT_ID: &str = "claude";
const CLIENT_NAME: &str = "Claude Desktop";
const CONFIG_FILE: &str = "claude_desktop_config.json";

/// Time the app gets to exit before it is started again
const RESTART_GRACE: Duration = Duration::from_secs(2);

pub struct ClaudeDesktopAdapter {
    home: PathBuf,
    os: OsType,
    shell: Arc<dyn ShellExecutor>,
    restart_grace: Duration,
}

impl ClaudeDesktopAdapter {
    pub fn new(home: PathBuf, os: OsType, shell: Arc<dyn ShellExecutor>) -> Self {
        Self {
            home,
            os,
            shell,
            restart_grace: RESTART_GRACE,
        }
    }

    pub fn with_restart_grace(mut self, grace: Duration) -> Self {
        self.restart_grace = grace;
        self
    }

    fn config_dir(&self) -> Option<PathBuf> {
        match self.os {
            OsType::MacOS => Some(
                self.home
                    .join("Library")
                    .join("Application Support")
                    .join("Claude"),
            ),
            OsType::Windows => Some(self.home.join("AppData").join("Roaming").join("Claude")),
            OsType::Linux => Some(self.home.join(".config").join("claude")),
            OsType::Unknown => None,
        }
    }

    fn restart_commands(&self) -> Option<(CommandName, CommandName)> {
        match self.os {
            OsType::Windows => Some((CommandName::ClaudeKillWindows, CommandName::ClaudeStartWindows)),
            OsType::MacOS => Some((CommandName::ClaudeKillMacos, CommandName::ClaudeStartMacos)),
            OsType::Linux => Some((CommandName::ClaudeKillLinux, CommandName::ClaudeStartLinux)),
            OsType::Unknown => None,
        }
    }
}

#[async_trait]
impl ConfigAdapter for ClaudeDesktopAdapter {
    fn client_info(&self) -> ClientInfo {
        ClientInfo {
            id: CLIENT_ID.to_string(),
            name: CLIENT_NAME.to_string(),
            supports_projects: false,
        }
    }

    async fn config_file_path(&self) -> Result<PathBuf, AdapterError> {
        self.config_dir()
            .map(|dir| dir.join(CONFIG_FILE))
            .ok_or_else(|| AdapterError::Location {
                client: CLIENT_NAME.to_string(),
            })
    }

    async fn upsert(&self, name: &str, config: &McpServerConfig) -> Result<(), AdapterError> {
        let path = self.config_file_path().await?;
        json_file::upsert_server(&path, name, config).await
    }

    fn supports_refresh(&self) -> bool {
        self.restart_commands().is_some()
    }

    async fn refresh(&self) -> Result<(), AdapterError> {
        let Some((kill, start)) = self.restart_commands() else {
            return Err(AdapterError::UnsupportedOperation {
                client: CLIENT_NAME.to_string(),
                operation: "automatic restart",
            });
        };

        // Not running is fine
        match self.shell.execute(kill).await {
            Ok(output) if !output.success() => {
                warn!(code = output.code, "kill command exited non-zero")
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "kill command failed"),
        }

        tokio::time::sleep(self.restart_grace).await;

        let output = self
            .shell
            .execute(start)
            .await
            .map_err(|e| AdapterError::Refresh {
                client: CLIENT_NAME.to_string(),
                message: e.to_string(),
            })?;
        if !output.success() {
            return Err(AdapterError::Refresh {
                client: CLIENT_NAME.to_string(),
                message: format!("start command exited with {}: {}", output.code, output.stderr.trim()),
            });
        }

        info!("Claude Desktop restarted");
        Ok(())
    }

    fn refresh_instructions(&self) -> Option<String> {
        Some(
            "Quit Claude Desktop (File > Quit) and start it again to load the new server."
                .to_string(),
        )
    }
}
