use async_trait::async_trait;
use magnet_manifest::McpServerConfig;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientInfo {
    /// Registry key, e.g. `claude`, `cursor`, `claudeCode`
    pub id: String,
    pub name: String,
    pub supports_projects: bool,
}

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("{client} does not support {operation}")]
    UnsupportedOperation {
        client: String,
        operation: &'static str,
    },

    #[error("cannot locate the configuration directory for {client}")]
    Location { client: String },

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not a valid configuration file: {message}", .path.display())]
    Malformed { path: PathBuf, message: String },

    #[error("could not restart {client}: {message}")]
    Refresh { client: String, message: String },
}

/// A client application whose configuration file can receive server entries.
#[async_trait]
pub trait ConfigAdapter: Send + Sync {
    fn client_info(&self) -> ClientInfo;

    async fn config_file_path(&self) -> Result<PathBuf, AdapterError>;

    /// Insert or replace `mcpServers.<name>`, leaving every other entry intact
    async fn upsert(&self, name: &str, config: &McpServerConfig) -> Result<(), AdapterError>;

    /// Adapter scoped to a project directory, `None` when projects are unsupported
    fn project(&self, _path: &Path) -> Option<Arc<dyn ConfigAdapter>> {
        None
    }

    fn supports_refresh(&self) -> bool {
        false
    }

    /// Restart the client so it picks up the new entry
    async fn refresh(&self) -> Result<(), AdapterError> {
        Err(AdapterError::UnsupportedOperation {
            client: self.client_info().name,
            operation: "automatic restart",
        })
    }

    /// Manual restart instructions shown when `refresh` is unavailable
    fn refresh_instructions(&self) -> Option<String> {
        None
    }
}
