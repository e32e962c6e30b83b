use super::json_file;
use async_trait::async_trait;
use domain::ports::config_adapter::{AdapterError, ClientInfo, ConfigAdapter};
use magnet_manifest::McpServerConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const CLIENT_ID: &str = "cursor";

/// `~/.cursor/mcp.json`, or `<project>/.cursor/mcp.json` when project-scoped
pub struct CursorAdapter {
    home: PathBuf,
    project: Option<PathBuf>,
}

impl CursorAdapter {
    pub fn new(home: PathBuf) -> Self {
        Self {
            home,
            project: None,
        }
    }
}

#[async_trait]
impl ConfigAdapter for CursorAdapter {
    fn client_info(&self) -> ClientInfo {
        ClientInfo {
            id: CLIENT_ID.to_string(),
            name: "Cursor".to_string(),
            supports_projects: true,
        }
    }

    async fn config_file_path(&self) -> Result<PathBuf, AdapterError> {
        let root = self.project.as_ref().unwrap_or(&self.home);
        Ok(root.join(".cursor").join("mcp.json"))
    }

    async fn upsert(&self, name: &str, config: &McpServerConfig) -> Result<(), AdapterError> {
        let path = self.config_file_path().await?;
        json_file::upsert_server(&path, name, config).await
    }

    fn project(&self, path: &Path) -> Option<Arc<dyn ConfigAdapter>> {
        Some(Arc::new(CursorAdapter {
            home: self.home.clone(),
            project: Some(path.to_path_buf()),
        }))
    }

    fn refresh_instructions(&self) -> Option<String> {
        Some("Open Cursor Settings > MCP and refresh the server list.".to_string())
    }
}
