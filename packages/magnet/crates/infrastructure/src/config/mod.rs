use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use domain::deeplink::DEFAULT_SCHEME;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::github::{GITHUB_API_BASE, GITHUB_WEB_BASE};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GithubEndpoints {
    #[serde(default = "default_web_base")]
    pub web_base: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_web_base() -> String {
    GITHUB_WEB_BASE.to_string()
}

fn default_api_base() -> String {
    GITHUB_API_BASE.to_string()
}

fn default_scheme() -> String {
    DEFAULT_SCHEME.to_string()
}

impl Default for GithubEndpoints {
    fn default() -> Self {
        Self {
            web_base: default_web_base(),
            api_base: default_api_base(),
        }
    }
}

/// Per-user installer settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,

    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Absent entries count as enabled
    #[serde(default)]
    pub enabled_clients: BTreeMap<String, bool>,

    #[serde(default)]
    pub github: GithubEndpoints,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            last_updated: None,
            scheme: default_scheme(),
            enabled_clients: BTreeMap::new(),
            github: GithubEndpoints::default(),
        }
    }
}

impl InstallerConfig {
    pub fn is_client_enabled(&self, id: &str) -> bool {
        self.enabled_clients.get(id).copied().unwrap_or(true)
    }

    pub fn set_client_enabled(&mut self, id: &str, enabled: bool) {
        self.enabled_clients.insert(id.to_string(), enabled);
    }
}

/// Reads and writes [`InstallerConfig`] as TOML.
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// `~/.config/magnet/config.toml`
    pub fn default_location() -> Result<Self> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(Self::new(
            home.join(".config").join("magnet").join("config.toml"),
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Defaults when the file does not exist
    pub fn load(&self) -> Result<InstallerConfig> {
        if !self.path.exists() {
            return Ok(InstallerConfig::default());
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", self.path.display()))
    }

    /// Write `config` with a fresh `last_updated` stamp and return what was written
    pub fn save(&self, config: &InstallerConfig) -> Result<InstallerConfig> {
        let mut stamped = config.clone();
        stamped.last_updated = Some(Utc::now());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create config dir")?;
        }
        let content =
            toml::to_string_pretty(&stamped).context("Failed to serialize installer config")?;
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;

        Ok(stamped)
    }
}
