use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Values collected for a manifest's env entries, keyed by variable name
pub type EnvValueMap = BTreeMap<String, String>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct EnvOption {
    pub value: String,
    pub label: String,
}

/// One declared environment variable. The `type` tag decides which fields apply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EnvConfig {
    Text {
        description: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        required: Option<bool>,
        /// Suggestions only; free text is still accepted
        #[serde(default, skip_serializing_if = "Option::is_none")]
        options: Option<Vec<EnvOption>>,
    },
    Select {
        description: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        required: Option<bool>,
        options: Vec<EnvOption>,
    },
    Boolean {
        description: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        required: Option<bool>,
    },
}

impl EnvConfig {
    pub fn description(&self) -> &str {
        match self {
            EnvConfig::Text { description, .. }
            | EnvConfig::Select { description, .. }
            | EnvConfig::Boolean { description, .. } => description,
        }
    }

    pub fn is_required(&self) -> bool {
        match self {
            EnvConfig::Text { required, .. }
            | EnvConfig::Select { required, .. }
            | EnvConfig::Boolean { required, .. } => required.unwrap_or(false),
        }
    }

    pub fn options(&self) -> &[EnvOption] {
        match self {
            EnvConfig::Text { options, .. } => options.as_deref().unwrap_or_default(),
            EnvConfig::Select { options, .. } => options,
            EnvConfig::Boolean { .. } => &[],
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            EnvConfig::Text { .. } => "text",
            EnvConfig::Select { .. } => "select",
            EnvConfig::Boolean { .. } => "boolean",
        }
    }

    /// Initial form value: first option for selects, `false` for booleans
    pub fn default_value(&self) -> String {
        match self {
            EnvConfig::Text { .. } => String::new(),
            EnvConfig::Select { options, .. } => options
                .first()
                .map(|option| option.value.clone())
                .unwrap_or_default(),
            EnvConfig::Boolean { .. } => "false".to_string(),
        }
    }
}
