use crate::Manifest;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ValidationLevel {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    pub level: ValidationLevel,
    pub field: String,
    pub message: String,
}

/// Non-fatal findings about a manifest that already parsed
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            valid: true,
            issues: Vec::new(),
        }
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.valid = false;
        self.issues.push(ValidationIssue {
            level: ValidationLevel::Error,
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            level: ValidationLevel::Warning,
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_info(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            level: ValidationLevel::Info,
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.issues
            .iter()
            .any(|i| i.level == ValidationLevel::Error)
    }

    pub fn has_warnings(&self) -> bool {
        self.issues
            .iter()
            .any(|i| i.level == ValidationLevel::Warning)
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Why a manifest was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("manifest is not valid JSON: {message} (line {line}, column {column})")]
    Syntax {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("invalid `{field}`: {message}")]
    Field { field: String, message: String },
}

impl ValidationError {
    fn at(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError::Field {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Dotted path of the offending field, e.g. `env.TOKEN.options`
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::Field { field, .. } => Some(field),
            ValidationError::Syntax { .. } => None,
        }
    }
}

const MIN_NAME_LEN: usize = 3;
const ENV_TYPES: [&str; 3] = ["text", "select", "boolean"];

pub struct ManifestValidator;

impl ManifestValidator {
    /// Parse and validate manifest JSON text
    pub fn parse(json: &str) -> Result<Manifest, ValidationError> {
        let value: Value = serde_json::from_str(json).map_err(|e| ValidationError::Syntax {
            message: e.to_string(),
            line: e.line(),
            column: e.column(),
        })?;
        Self::from_value(value)
    }

    /// Structural pass on the raw JSON, typed conversion, then semantic checks
    pub fn from_value(value: Value) -> Result<Manifest, ValidationError> {
        Self::validate_structure(&value)?;

        let manifest: Manifest =
            serde_json::from_value(value).map_err(|e| ValidationError::at("manifest", e.to_string()))?;

        Self::validate_semantics(&manifest)?;
        Ok(manifest)
    }

    /// Advisory pass over an accepted manifest
    pub fn lint(manifest: &Manifest) -> ValidationResult {
        let mut result = ValidationResult::new();

        Self::lint_recommended_fields(manifest, &mut result);
        Self::lint_env(manifest, &mut result);

        result
    }

    fn validate_structure(value: &Value) -> Result<(), ValidationError> {
        let obj = value
            .as_object()
            .ok_or_else(|| ValidationError::at("manifest", "expected a JSON object"))?;

        for key in ["name", "command", "manifestVersion"] {
            require_string(obj, key, key)?;
        }
        for key in ["displayName", "description", "manifestAuthor", "url"] {
            optional_string(obj, key, key)?;
        }

        match obj.get("args") {
            None => return Err(ValidationError::at("args", "required field is missing")),
            Some(Value::Array(items)) => {
                for (i, item) in items.iter().enumerate() {
                    if !item.is_string() {
                        return Err(ValidationError::at(
                            format!("args[{}]", i),
                            "expected a string",
                        ));
                    }
                }
            }
            Some(_) => return Err(ValidationError::at("args", "expected an array of strings")),
        }

        match obj.get("env") {
            None | Some(Value::Null) => {}
            Some(Value::Object(env)) => {
                for (name, entry) in env {
                    Self::validate_env_entry(name, entry)?;
                }
            }
            Some(_) => return Err(ValidationError::at("env", "expected an object")),
        }

        Ok(())
    }

    fn validate_env_entry(name: &str, entry: &Value) -> Result<(), ValidationError> {
        let path = format!("env.{}", name);
        let obj = entry
            .as_object()
            .ok_or_else(|| ValidationError::at(&path, "expected an object"))?;

        let kind = require_string(obj, "type", &format!("{}.type", path))?;
        if !ENV_TYPES.contains(&kind) {
            return Err(ValidationError::at(
                format!("{}.type", path),
                format!("unknown type '{}', expected one of {}", kind, ENV_TYPES.join(", ")),
            ));
        }

        require_string(obj, "description", &format!("{}.description", path))?;

        match obj.get("required") {
            None | Some(Value::Null) | Some(Value::Bool(_)) => {}
            Some(_) => {
                return Err(ValidationError::at(
                    format!("{}.required", path),
                    "expected a boolean",
                ))
            }
        }

        let options_path = format!("{}.options", path);
        match (kind, obj.get("options")) {
            ("select", None) | ("select", Some(Value::Null)) => {
                return Err(ValidationError::at(
                    options_path,
                    "select entries need at least one option",
                ))
            }
            ("select", Some(Value::Array(options))) if options.is_empty() => {
                return Err(ValidationError::at(
                    options_path,
                    "select entries need at least one option",
                ))
            }
            (_, Some(Value::Array(options))) => {
                for (i, option) in options.iter().enumerate() {
                    let option_path = format!("{}[{}]", options_path, i);
                    let option = option
                        .as_object()
                        .ok_or_else(|| ValidationError::at(&option_path, "expected an object"))?;
                    require_string(option, "value", &format!("{}.value", option_path))?;
                    require_string(option, "label", &format!("{}.label", option_path))?;
                }
            }
            (_, None) | (_, Some(Value::Null)) => {}
            (_, Some(_)) => {
                return Err(ValidationError::at(options_path, "expected an array"));
            }
        }

        Ok(())
    }

    fn validate_semantics(manifest: &Manifest) -> Result<(), ValidationError> {
        if manifest.name.chars().count() < MIN_NAME_LEN {
            return Err(ValidationError::at(
                "name",
                format!("must be at least {} characters", MIN_NAME_LEN),
            ));
        }

        if !manifest
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ValidationError::at(
                "name",
                "may only contain letters, digits, '_' and '-'",
            ));
        }

        if manifest.command.trim().is_empty() {
            return Err(ValidationError::at("command", "must not be empty"));
        }

        if manifest.manifest_version.trim().is_empty() {
            return Err(ValidationError::at("manifestVersion", "must not be empty"));
        }

        Ok(())
    }

    fn lint_recommended_fields(manifest: &Manifest, result: &mut ValidationResult) {
        if manifest.display_name.is_none() {
            result.add_info("displayName", "Not set, the install key will be shown instead");
        }

        if manifest.description.is_none() {
            result.add_warning(
                "description",
                "RECOMMENDED: Add 'description' so users know what they are installing",
            );
        }

        match manifest.manifest_author.as_deref() {
            None => result.add_warning("manifestAuthor", "Author is not declared"),
            Some(_) if manifest.github_username().is_none() => result.add_info(
                "manifestAuthor",
                "Only 'github:<username>' authors can be verified",
            ),
            Some(_) => {}
        }
    }

    fn lint_env(manifest: &Manifest, result: &mut ValidationResult) {
        for (name, config) in manifest.env_entries() {
            if config.description().trim().is_empty() {
                result.add_warning(
                    format!("env.{}.description", name),
                    format!("'{}' has no description and will not be prompted for", name),
                );
            }
        }
    }
}

fn require_string<'a>(
    obj: &'a Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<&'a str, ValidationError> {
    match obj.get(key) {
        Some(Value::String(s)) => Ok(s),
        None | Some(Value::Null) => Err(ValidationError::at(path, "required field is missing")),
        Some(_) => Err(ValidationError::at(path, "expected a string")),
    }
}

fn optional_string(obj: &Map<String, Value>, key: &str, path: &str) -> Result<(), ValidationError> {
    match obj.get(key) {
        None | Some(Value::Null) | Some(Value::String(_)) => Ok(()),
        Some(_) => Err(ValidationError::at(path, "expected a string")),
    }
}
