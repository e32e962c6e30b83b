use crate::ui::diagnostic::ManifestDiagnostic;
use magnet::domain::deeplink::DeepLinkError;
use magnet::domain::security::trust::FailureReason;
use miette::GraphicalReportHandler;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Link rejected: {0}")]
    Link(DeepLinkError),

    /// Manifest problems carry their source so they render as a diagnostic
    #[error("{0}")]
    Manifest(Box<ManifestDiagnostic>),

    #[error("Refusing to install: {0}")]
    Untrusted(FailureReason),

    #[error("Unknown client '{0}'")]
    UnknownClient(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Operation cancelled by user")]
    Cancelled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Returns a themed, actionable suggestion for the error.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            CliError::Config(_) => Some(
                "Check config.toml for syntax errors, or pass --config to use another file."
                    .to_string(),
            ),
            CliError::Link(DeepLinkError::InvalidProtocol { expected, .. }) => Some(format!(
                "Links must start with {}://install. Pass --scheme if you use a custom scheme.",
                expected
            )),
            CliError::Link(DeepLinkError::UnsupportedAuthor { .. }) => Some(
                "Signed manifests need \"manifestAuthor\": \"github:<username>\".".to_string(),
            ),
            CliError::Link(_) => {
                Some("Ask the publisher for a fresh link; this one is damaged.".to_string())
            }
            CliError::Untrusted(FailureReason::KeyFetch(_)) => {
                Some("Check your network connection and open the link again.".to_string())
            }
            CliError::Untrusted(_) => Some(
                "Do not install this server. The manifest was changed after it was signed, or the signer is not who the link claims."
                    .to_string(),
            ),
            CliError::UnknownClient(_) => {
                Some("Run `magnet clients` to list the known client ids.".to_string())
            }
            _ => None,
        }
    }

    pub fn render(&self) {
        match self {
            CliError::Manifest(diagnostic) => {
                let mut out = String::new();
                match GraphicalReportHandler::new().render_report(&mut out, diagnostic.as_ref()) {
                    Ok(()) => eprint!("{}", out),
                    Err(_) => eprintln!("{} {}", console::style("Error:").red().bold(), diagnostic),
                }
                return;
            }
            CliError::Other(err) => {
                eprintln!("\n{} {:#}", console::style("Error:").red().bold(), err);
            }
            _ => eprintln!("\n{} {}", console::style("Error:").red().bold(), self),
        }
        if let Some(s) = self.suggestion() {
            eprintln!("{} {}", console::style("  help:").dim(), s);
        }
    }
}
