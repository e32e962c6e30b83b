pub mod claude_code;
pub mod claude_desktop;
pub mod cursor;
pub mod json_file;

pub use claude_code::ClaudeCodeAdapter;
pub use claude_desktop::ClaudeDesktopAdapter;
pub use cursor::CursorAdapter;

use crate::config::InstallerConfig;
use anyhow::{Context, Result};
use domain::ports::config_adapter::{ClientInfo, ConfigAdapter};
use domain::ports::shell::ShellExecutor;
use domain::system::platform::OsType;
use std::path::PathBuf;
use std::sync::Arc;

/// Clients the installer ships adapters for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientKind {
    ClaudeDesktop,
    Cursor,
    ClaudeCode,
}

impl ClientKind {
    pub const ALL: [ClientKind; 3] = [
        ClientKind::ClaudeDesktop,
        ClientKind::Cursor,
        ClientKind::ClaudeCode,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            ClientKind::ClaudeDesktop => claude_desktop::CLIENT_ID,
            ClientKind::Cursor => cursor::CLIENT_ID,
            ClientKind::ClaudeCode => claude_code::CLIENT_ID,
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }

    fn adapter(
        &self,
        home: PathBuf,
        os: OsType,
        shell: Arc<dyn ShellExecutor>,
    ) -> Arc<dyn ConfigAdapter> {
        match self {
            ClientKind::ClaudeDesktop => Arc::new(ClaudeDesktopAdapter::new(home, os, shell)),
            ClientKind::Cursor => Arc::new(CursorAdapter::new(home)),
            ClientKind::ClaudeCode => Arc::new(ClaudeCodeAdapter::new(home)),
        }
    }
}

/// Adapters keyed by client id, in display order
#[derive(Clone, Default)]
pub struct ClientRegistry {
    adapters: Vec<Arc<dyn ConfigAdapter>>,
}

impl ClientRegistry {
    pub fn from_adapters(adapters: Vec<Arc<dyn ConfigAdapter>>) -> Self {
        Self { adapters }
    }

    /// Every known client, rooted at `home`
    pub fn standard(home: PathBuf, os: OsType, shell: Arc<dyn ShellExecutor>) -> Self {
        let adapters = ClientKind::ALL
            .iter()
            .map(|kind| kind.adapter(home.clone(), os, shell.clone()))
            .collect();
        Self { adapters }
    }

    pub fn for_current_user(os: OsType, shell: Arc<dyn ShellExecutor>) -> Result<Self> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(Self::standard(home, os, shell))
    }

    /// Only the clients the installer config leaves enabled
    pub fn enabled(&self, config: &InstallerConfig) -> Self {
        Self {
            adapters: self
                .adapters
                .iter()
                .filter(|adapter| config.is_client_enabled(&adapter.client_info().id))
                .cloned()
                .collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn ConfigAdapter>> {
        self.adapters
            .iter()
            .find(|adapter| adapter.client_info().id == id)
            .cloned()
    }

    pub fn clients(&self) -> Vec<ClientInfo> {
        self.adapters.iter().map(|adapter| adapter.client_info()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::ProcessShell;

    fn registry() -> ClientRegistry {
        let shell: Arc<dyn ShellExecutor> = Arc::new(ProcessShell::new().unwrap());
        ClientRegistry::standard(PathBuf::from("/home/u"), OsType::Linux, shell)
    }

    #[test]
    fn test_standard_registry_order() {
        let ids: Vec<String> = registry().clients().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["claude", "cursor", "claudeCode"]);
    }

    #[test]
    fn test_lookup_by_id() {
        let registry = registry();
        assert_eq!(registry.get("cursor").unwrap().client_info().name, "Cursor");
        assert!(registry.get("vscode").is_none());
        assert_eq!(ClientKind::from_id("claudeCode"), Some(ClientKind::ClaudeCode));
    }

    #[test]
    fn test_disabled_clients_are_filtered() {
        let mut config = InstallerConfig::default();
        config.set_client_enabled("claude", false);
        config.set_client_enabled("cursor", true);

        let enabled = registry().enabled(&config);
        let ids: Vec<String> = enabled.clients().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["cursor", "claudeCode"]);
    }
}
