//! Bundled example manifests, used to generate demo links.

use crate::{Manifest, ManifestValidator, ValidationError};
use serde_json::Value;

const EXAMPLES_JSON: &str = include_str!("../catalog/examples.json");

/// Every bundled manifest, validated the same way a link payload would be
pub fn examples() -> Result<Vec<Manifest>, ValidationError> {
    let values: Vec<Value> = serde_json::from_str(EXAMPLES_JSON).map_err(|e| {
        ValidationError::Syntax {
            message: e.to_string(),
            line: e.line(),
            column: e.column(),
        }
    })?;

    values.into_iter().map(ManifestValidator::from_value).collect()
}

pub fn example(name: &str) -> Result<Option<Manifest>, ValidationError> {
    Ok(examples()?.into_iter().find(|m| m.name == name))
}
