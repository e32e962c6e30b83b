use console::style;
use magnet::domain::runtime::permissions::Severity;
use magnet::domain::security::trust::VerificationOutcome;
use std::fmt;

/// The central theme definition for the magnet CLI.
pub struct Theme;

impl Theme {
    /// Primary color (cyan), used for names and links
    pub fn primary(text: impl fmt::Display) -> String {
        style(text).cyan().bold().to_string()
    }

    pub fn bold(text: impl fmt::Display) -> String {
        style(text).bold().to_string()
    }

    pub fn success(text: impl fmt::Display) -> String {
        style(text).green().bold().to_string()
    }

    pub fn warning(text: impl fmt::Display) -> String {
        style(text).yellow().bold().to_string()
    }

    pub fn error(text: impl fmt::Display) -> String {
        style(text).red().bold().to_string()
    }

    /// Metadata such as paths and command lines
    pub fn muted(text: impl fmt::Display) -> String {
        style(text).dim().to_string()
    }

    pub fn severity(severity: Severity, text: impl fmt::Display) -> String {
        match severity {
            Severity::High => Self::error(text),
            Severity::Medium => Self::warning(text),
            Severity::Standard => text.to_string(),
        }
    }

    /// Trust badge shown next to the server name
    pub fn trust(outcome: &VerificationOutcome) -> String {
        match outcome {
            VerificationOutcome::Verified { .. } => {
                format!("{} {}", Self::success(Icon::Shield), Self::success(outcome))
            }
            VerificationOutcome::Unsigned => {
                format!("{} {}", Self::warning(Icon::Warning), Self::warning(outcome))
            }
            VerificationOutcome::Failed(_) => {
                format!("{} {}", Self::error(Icon::Cross), Self::error(outcome))
            }
        }
    }
}

pub enum Icon {
    Magnet,
    Shield,
    Warning,
    Check,
    Cross,
    Package,
    File,
}

impl fmt::Display for Icon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let icon = match self {
            Icon::Magnet => "🧲",
            Icon::Shield => "🛡️ ",
            Icon::Warning => "⚠️ ",
            Icon::Check => "✔",
            Icon::Cross => "✖",
            Icon::Package => "📦",
            Icon::File => "📄",
        };
        write!(f, "{}", icon)
    }
}
