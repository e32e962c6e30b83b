use crate::ui::{Icon, Theme};
use magnet::domain::runtime::PermissionSummary;
use magnet::domain::security::VerificationOutcome;
use magnet_manifest::{
    Manifest, McpServerConfig, ValidationLevel, ValidationResult, PROVENANCE_ENV_KEY,
};
use std::collections::BTreeMap;

/// Name, trust badge, command line and publisher details
pub fn overview(manifest: &Manifest, trust: &VerificationOutcome) -> String {
    let mut lines = vec![
        format!("{} {}", Icon::Package, Theme::primary(manifest.title())),
        Theme::trust(trust),
    ];
    if let Some(description) = &manifest.description {
        lines.push(description.clone());
    }
    lines.push(format!(
        "{} {}",
        Theme::muted("command:"),
        command_line(manifest)
    ));
    lines.push(format!(
        "{} {}",
        Theme::muted("author: "),
        manifest.manifest_author.as_deref().unwrap_or("unknown")
    ));
    lines.push(format!(
        "{} {}",
        Theme::muted("version:"),
        manifest.manifest_version
    ));
    if let Some(url) = &manifest.url {
        lines.push(format!("{} {}", Theme::muted("url:    "), url));
    }
    lines.join("\n")
}

pub fn command_line(manifest: &Manifest) -> String {
    std::iter::once(manifest.command.as_str())
        .chain(manifest.args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn permissions(summary: &PermissionSummary) -> String {
    let mut lines = vec![Theme::bold(&summary.title), summary.description.clone()];
    for permission in &summary.permissions {
        lines.push(format!(
            "  • {}",
            Theme::severity(permission.severity, permission.display())
        ));
    }
    lines.join("\n")
}

/// Advisory findings, one line each
pub fn lint(result: &ValidationResult) -> Vec<String> {
    result
        .issues
        .iter()
        .map(|issue| {
            let label = match issue.level {
                ValidationLevel::Error => Theme::error("error"),
                ValidationLevel::Warning => Theme::warning("warning"),
                ValidationLevel::Info => Theme::muted("info"),
            };
            format!("{} {}: {}", label, Theme::bold(&issue.field), issue.message)
        })
        .collect()
}

/// Config entry as it will be written, with secrets masked
pub fn server_config(name: &str, config: &McpServerConfig) -> String {
    let mut masked = config.clone();
    if let Some(env) = masked.env.as_mut() {
        for (key, value) in env.iter_mut() {
            if key != PROVENANCE_ENV_KEY && !value.is_empty() {
                *value = "•".repeat(value.chars().count().min(8));
            }
        }
    }
    let mut entry = BTreeMap::new();
    entry.insert(name, &masked);
    serde_json::to_string_pretty(&entry).unwrap_or_else(|_| format!("{:?}", masked))
}
