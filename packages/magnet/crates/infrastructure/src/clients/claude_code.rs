use super::json_file;
use async_trait::async_trait;
use domain::ports::config_adapter::{AdapterError, ClientInfo, ConfigAdapter};
use magnet_manifest::McpServerConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const CLIENT_ID: &str = "claudeCode";

/// Global entries in `~/.claude/mcp_servers.json`, project entries in `<project>/.mcp.json`
pub struct ClaudeCodeAdapter {
    home: PathBuf,
    project: Option<PathBuf>,
}

impl ClaudeCodeAdapter {
    pub fn new(home: PathBuf) -> Self {
        Self {
            home,
            project: None,
        }
    }
}

#[async_trait]
impl ConfigAdapter for ClaudeCodeAdapter {
    fn client_info(&self) -> ClientInfo {
        ClientInfo {
            id: CLIENT_ID.to_string(),
            name: "Claude Code".to_string(),
            supports_projects: true,
        }
    }

    async fn config_file_path(&self) -> Result<PathBuf, AdapterError> {
        Ok(match &self.project {
            Some(project) => project.join(".mcp.json"),
            None => self.home.join(".claude").join("mcp_servers.json"),
        })
    }

    async fn upsert(&self, name: &str, config: &McpServerConfig) -> Result<(), AdapterError> {
        let path = self.config_file_path().await?;
        json_file::upsert_server(&path, name, config).await
    }

    fn project(&self, path: &Path) -> Option<Arc<dyn ConfigAdapter>> {
        Some(Arc::new(ClaudeCodeAdapter {
            home: self.home.clone(),
            project: Some(path.to_path_buf()),
        }))
    }

    fn refresh_instructions(&self) -> Option<String> {
        Some("Start a new Claude Code session to pick up the server.".to_string())
    }
}
