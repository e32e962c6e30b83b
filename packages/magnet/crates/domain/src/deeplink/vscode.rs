//! Conversion of VS Code MCP install links into install-scheme links.
//!
//! VS Code links carry `name`, `inputs` (prompt definitions) and `config`
//! (command, args, env with `${input:<id>}` placeholders) as JSON query params.

use super::codec;
use super::link::build_link;
use magnet_manifest::{EnvConfig, EnvOption, Manifest, ManifestValidator, ValidationError};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use url::Url;

const CONVERTED_MANIFEST_VERSION: &str = "1.0.0";

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("not a URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("query parameter '{param}' is not valid JSON: {source}")]
    Json {
        param: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("converted manifest is invalid: {0}")]
    Manifest(#[from] ValidationError),
}

#[derive(Debug, Deserialize)]
struct VsCodeInput {
    id: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    options: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct VsCodeConfig {
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    env: BTreeMap<String, String>,
}

/// Build a manifest from a VS Code MCP install link.
pub fn manifest_from_vscode_link(link: &str) -> Result<Manifest, ConvertError> {
    let url = Url::parse(link.trim())?;
    let param = |name: &str| {
        url.query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    };

    let name = param("name").unwrap_or_else(|| "app".to_string());
    let inputs: Vec<VsCodeInput> = match param("inputs") {
        Some(raw) => serde_json::from_str(&raw).map_err(|source| ConvertError::Json {
            param: "inputs",
            source,
        })?,
        None => Vec::new(),
    };
    let config: VsCodeConfig = match param("config") {
        Some(raw) => serde_json::from_str(&raw).map_err(|source| ConvertError::Json {
            param: "config",
            source,
        })?,
        None => VsCodeConfig::default(),
    };

    let mut env = BTreeMap::new();
    for (key, value) in &config.env {
        // Literal values have nothing to prompt for
        let Some(input_id) = input_reference(value) else {
            continue;
        };
        let Some(input) = inputs.iter().find(|input| input.id == input_id) else {
            continue;
        };
        env.insert(key.clone(), env_config_for(input));
    }

    let manifest = serde_json::json!({
        "name": name,
        "displayName": title_case(&name),
        "command": config.command.unwrap_or_default(),
        "args": config.args,
        "env": env,
        "manifestVersion": CONVERTED_MANIFEST_VERSION,
    });

    Ok(ManifestValidator::from_value(manifest)?)
}

/// Convert straight to an unsigned install link.
pub fn convert_vscode_link(link: &str, scheme: &str) -> Result<Url, ConvertError> {
    let manifest = manifest_from_vscode_link(link)?;
    let json = serde_json::to_string(&manifest).map_err(|source| ConvertError::Json {
        param: "manifest",
        source,
    })?;
    Ok(build_link(scheme, &codec::encode(&json), None)?)
}

/// `${input:token}` -> `token`
fn input_reference(value: &str) -> Option<&str> {
    let start = value.find("input:")? + "input:".len();
    let rest = &value[start..];
    let end = rest
        .find(|c: char| c == '}' || c.is_whitespace())
        .unwrap_or(rest.len());
    (end > 0).then(|| &rest[..end])
}

fn env_config_for(input: &VsCodeInput) -> EnvConfig {
    let description = input.description.clone().unwrap_or_default();
    let required = Some(input.required);
    let options: Vec<EnvOption> = input
        .options
        .iter()
        .filter_map(|option| match option {
            Value::String(s) => Some(EnvOption {
                value: s.clone(),
                label: s.clone(),
            }),
            other => serde_json::from_value(other.clone()).ok(),
        })
        .collect();

    match input.kind.as_deref() {
        Some("promptBoolean") => EnvConfig::Boolean {
            description,
            required,
        },
        Some("pickString") if !options.is_empty() => EnvConfig::Select {
            description,
            required,
            options,
        },
        _ => EnvConfig::Text {
            description,
            required,
            options: None,
        },
    }
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if at_word_start && c.is_alphanumeric() {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = !(c.is_alphanumeric() || c == '_');
    }
    out
}
