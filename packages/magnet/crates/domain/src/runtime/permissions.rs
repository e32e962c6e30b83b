//! Human-readable summary of the permissions a Deno invocation requests.
//!
//! Advisory only: the summary is shown for consent and never used to
//! restrict what actually runs. `--deny-*` flags are not interpreted.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

pub const DENO_TITLE: &str = "Deno Permissions";
pub const DEFAULT_PERMISSION_LABEL: &str = "Default (no specific permissions requested)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Standard,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Permission {
    /// `read`, `net`, ... or `all`/`default` for the two sentinel entries
    pub category: String,
    pub label: String,
    pub scope: Option<String>,
    pub severity: Severity,
}

impl Permission {
    pub fn display(&self) -> String {
        match &self.scope {
            Some(scope) => format!("{}: {}", self.label, scope),
            None => self.label.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionSummary {
    pub title: String,
    pub description: String,
    pub allow_all: bool,
    pub permissions: Vec<Permission>,
}

impl PermissionSummary {
    pub fn highest_severity(&self) -> Severity {
        self.permissions
            .iter()
            .map(|p| p.severity)
            .max()
            .unwrap_or(Severity::Standard)
    }
}

fn allow_flag() -> &'static Regex {
    static ALLOW: OnceLock<Regex> = OnceLock::new();
    ALLOW.get_or_init(|| {
        Regex::new(r"^--allow-([a-z]+)(=(.+))?$").expect("allow-flag pattern is valid")
    })
}

/// Flags before the first positional token. Everything after belongs to the script.
fn cli_flags(argv: &[String]) -> &[String] {
    let boundary = argv
        .iter()
        .position(|arg| !arg.starts_with('-'))
        .unwrap_or(argv.len());
    &argv[..boundary]
}

fn category_label(category: &str) -> Option<(&'static str, Severity)> {
    let entry = match category {
        "read" => ("File system read", Severity::Standard),
        "write" => ("File system write", Severity::Medium),
        "net" => ("Network", Severity::Standard),
        "env" => ("Environment variables", Severity::Standard),
        "run" => ("Subprocess execution", Severity::High),
        "ffi" => ("Foreign libraries (FFI)", Severity::High),
        "hrtime" => ("High-resolution timers", Severity::Standard),
        "sys" => ("System information", Severity::Standard),
        _ => return None,
    };
    Some(entry)
}

/// Summarize the permission flags in a `deno run` argument vector
/// (the sub-command itself excluded).
pub fn describe_deno_permissions(argv: &[String]) -> PermissionSummary {
    let flags = cli_flags(argv);

    if flags.iter().any(|arg| arg == "-A" || arg == "--allow-all") {
        return PermissionSummary {
            title: DENO_TITLE.to_string(),
            description: "Warning: every permission is granted. The script can access the file system, network, environment variables and any other system resource.".to_string(),
            allow_all: true,
            permissions: vec![Permission {
                category: "all".to_string(),
                label: "All permissions (-A)".to_string(),
                scope: None,
                severity: Severity::High,
            }],
        };
    }

    let mut permissions = Vec::new();
    for flag in flags {
        let Some(caps) = allow_flag().captures(flag) else {
            continue;
        };
        let category = &caps[1];
        let (label, severity) = match category_label(category) {
            Some((label, severity)) => (label.to_string(), severity),
            None => (format!("Permission '{}'", category), Severity::Standard),
        };

        // hrtime takes no scope
        let scopes: Vec<Option<String>> = match caps.get(3) {
            Some(scope) if category != "hrtime" => scope
                .as_str()
                .split(',')
                .map(|s| Some(s.to_string()))
                .collect(),
            _ => vec![None],
        };

        for scope in scopes {
            permissions.push(Permission {
                category: category.to_string(),
                label: label.clone(),
                scope,
                severity,
            });
        }
    }

    if permissions.is_empty() {
        permissions.push(Permission {
            category: "default".to_string(),
            label: DEFAULT_PERMISSION_LABEL.to_string(),
            scope: None,
            severity: Severity::Standard,
        });
    }

    PermissionSummary {
        title: DENO_TITLE.to_string(),
        description: "Permissions requested by the Deno script.".to_string(),
        allow_all: false,
        permissions,
    }
}
