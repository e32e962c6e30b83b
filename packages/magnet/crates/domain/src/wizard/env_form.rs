use magnet_manifest::{EnvConfig, EnvValueMap, Manifest};
use std::fmt;
use thiserror::Error;

/// One problem with one submitted value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub key: String,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.message)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{} environment value(s) are invalid", .errors.len())]
pub struct EnvFormError {
    pub errors: Vec<FieldError>,
}

impl EnvFormError {
    pub fn for_key(&self, key: &str) -> Option<&FieldError> {
        self.errors.iter().find(|error| error.key == key)
    }
}

/// Initial form values: select -> first option, boolean -> `false`, text -> empty
pub fn default_values(manifest: &Manifest) -> EnvValueMap {
    manifest
        .env_entries()
        .map(|(key, config)| (key.clone(), config.default_value()))
        .collect()
}

/// Prompt text for an entry; the key itself when the description is blank
pub fn label<'a>(key: &'a str, config: &'a EnvConfig) -> &'a str {
    let description = config.description().trim();
    if description.is_empty() {
        key
    } else {
        description
    }
}

/// Check submitted values against the declarations and return the map to
/// commit. Blank optional values are left out; undeclared keys are dropped.
pub fn validate(manifest: &Manifest, submitted: &EnvValueMap) -> Result<EnvValueMap, EnvFormError> {
    let mut values = EnvValueMap::new();
    let mut errors = Vec::new();

    for (key, config) in manifest.env_entries() {
        let value = submitted.get(key).map(|v| v.trim()).unwrap_or_default();

        if value.is_empty() {
            if config.is_required() {
                errors.push(FieldError {
                    key: key.clone(),
                    message: "a value is required".to_string(),
                });
            }
            continue;
        }

        match check_value(config, value) {
            Ok(()) => {
                values.insert(key.clone(), value.to_string());
            }
            Err(message) => errors.push(FieldError {
                key: key.clone(),
                message,
            }),
        }
    }

    if errors.is_empty() {
        Ok(values)
    } else {
        Err(EnvFormError { errors })
    }
}

fn check_value(config: &EnvConfig, value: &str) -> Result<(), String> {
    match config {
        EnvConfig::Text { .. } => Ok(()),
        EnvConfig::Select { options, .. } => {
            if options.iter().any(|option| option.value == value) {
                Ok(())
            } else {
                let allowed: Vec<&str> = options.iter().map(|o| o.value.as_str()).collect();
                Err(format!("must be one of: {}", allowed.join(", ")))
            }
        }
        EnvConfig::Boolean { .. } => match value {
            "true" | "false" => Ok(()),
            _ => Err("must be 'true' or 'false'".to_string()),
        },
    }
}
