pub mod catalog;
pub mod types;
pub use types::*;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Env key injected at commit time to record where a server entry came from.
pub const PROVENANCE_ENV_KEY: &str = "__MCP_SERVER_MANIFEST";

/// Identity scheme prefix accepted for signed manifests.
pub const GITHUB_AUTHOR_PREFIX: &str = "github:";

/// A tool-server manifest as carried inside a deep link.
///
/// Immutable once parsed: every consumer reads it, nothing rewrites it.
/// Unknown fields are ignored so older installers keep accepting newer links.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Install key, also the entry name written into client configs
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Executable launched by the client (e.g. `npx`, `deno`)
    pub command: String,

    pub args: Vec<String>,

    /// Environment variables the server expects, keyed by variable name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<BTreeMap<String, EnvConfig>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub manifest_version: String,

    /// `github:<username>` binds the manifest to that user's published keys
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_author: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Manifest {
    /// Name shown to the user, falling back to the install key
    pub fn title(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// Username claimed through a `github:` author, if any
    pub fn github_username(&self) -> Option<&str> {
        self.manifest_author
            .as_deref()
            .and_then(|author| author.strip_prefix(GITHUB_AUTHOR_PREFIX))
            .filter(|user| !user.is_empty())
    }

    /// `<author|unknown>/<name>@<version>`
    pub fn provenance(&self) -> String {
        format!(
            "{}/{}@{}",
            self.manifest_author.as_deref().unwrap_or("unknown"),
            self.name,
            self.manifest_version
        )
    }

    pub fn env_entries(&self) -> impl Iterator<Item = (&String, &EnvConfig)> {
        self.env.iter().flat_map(|env| env.iter())
    }

    /// True when at least one env entry has something to ask the user
    pub fn requires_env_input(&self) -> bool {
        self.env_entries()
            .any(|(_, config)| !config.description().trim().is_empty())
    }

    /// Config object that lands in a client's `mcpServers` map.
    ///
    /// Empty values are dropped and the provenance entry is appended.
    pub fn server_config(&self, values: &EnvValueMap) -> McpServerConfig {
        let mut env: BTreeMap<String, String> = values
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        env.insert(PROVENANCE_ENV_KEY.to_string(), self.provenance());

        McpServerConfig {
            command: self.command.clone(),
            args: self.args.clone(),
            env: Some(env),
        }
    }

    /// JSON Schema describing the wire format
    pub fn json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(Manifest)
    }
}
