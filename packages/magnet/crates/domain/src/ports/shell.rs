use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

/// Closed set of commands the installer may run. Nothing else is executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandName {
    DenoVersionCheck,
    DenoInstallWindowsWinget,
    DenoInstallWindowsFallback,
    DenoInstallUnix,
    NodeVersionCheck,
    NodeInstallWindowsWinget,
    NodeInstallWindowsFallback,
    NodeInstallMacos,
    NodeInstallLinux,
    Python3VersionCheck,
    PythonVersionCheck,
    PythonInstallMacos,
    WingetVersionCheck,
    HomebrewVersionCheck,
    ClaudeKillWindows,
    ClaudeKillMacos,
    ClaudeKillLinux,
    ClaudeStartWindows,
    ClaudeStartMacos,
    ClaudeStartLinux,
}

impl CommandName {
    pub const ALL: [CommandName; 20] = [
        CommandName::DenoVersionCheck,
        CommandName::DenoInstallWindowsWinget,
        CommandName::DenoInstallWindowsFallback,
        CommandName::DenoInstallUnix,
        CommandName::NodeVersionCheck,
        CommandName::NodeInstallWindowsWinget,
        CommandName::NodeInstallWindowsFallback,
        CommandName::NodeInstallMacos,
        CommandName::NodeInstallLinux,
        CommandName::Python3VersionCheck,
        CommandName::PythonVersionCheck,
        CommandName::PythonInstallMacos,
        CommandName::WingetVersionCheck,
        CommandName::HomebrewVersionCheck,
        CommandName::ClaudeKillWindows,
        CommandName::ClaudeKillMacos,
        CommandName::ClaudeKillLinux,
        CommandName::ClaudeStartWindows,
        CommandName::ClaudeStartMacos,
        CommandName::ClaudeStartLinux,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandName::DenoVersionCheck => "deno_version_check",
            CommandName::DenoInstallWindowsWinget => "deno_install_windows_winget",
            CommandName::DenoInstallWindowsFallback => "deno_install_windows_fallback",
            CommandName::DenoInstallUnix => "deno_install_unix",
            CommandName::NodeVersionCheck => "node_version_check",
            CommandName::NodeInstallWindowsWinget => "node_install_windows_winget",
            CommandName::NodeInstallWindowsFallback => "node_install_windows_fallback",
            CommandName::NodeInstallMacos => "node_install_macos",
            CommandName::NodeInstallLinux => "node_install_linux",
            CommandName::Python3VersionCheck => "python3_version_check",
            CommandName::PythonVersionCheck => "python_version_check",
            CommandName::PythonInstallMacos => "python_install_macos",
            CommandName::WingetVersionCheck => "winget_version_check",
            CommandName::HomebrewVersionCheck => "homebrew_version_check",
            CommandName::ClaudeKillWindows => "claude_kill_windows",
            CommandName::ClaudeKillMacos => "claude_kill_macos",
            CommandName::ClaudeKillLinux => "claude_kill_linux",
            CommandName::ClaudeStartWindows => "claude_start_windows",
            CommandName::ClaudeStartMacos => "claude_start_macos",
            CommandName::ClaudeStartLinux => "claude_start_linux",
        }
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Concrete program and arguments behind a [`CommandName`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShellCommand {
    pub name: CommandName,
    pub program: String,
    pub args: Vec<String>,
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Streamed execution events: `Started`, any number of output lines, then
/// exactly one of `Finished` or `Error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "event", content = "data")]
pub enum ShellEvent {
    Started { command: String, args: Vec<String> },
    Stdout { line: String },
    Stderr { line: String },
    Finished { code: i32 },
    Error { message: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShellError {
    #[error("command '{0}' is not available on this system")]
    Unavailable(CommandName),

    #[error("failed to run '{command}': {message}")]
    Spawn { command: String, message: String },
}

#[async_trait]
pub trait ShellExecutor: Send + Sync {
    fn command_details(&self, name: CommandName) -> Option<ShellCommand>;

    async fn execute(&self, name: CommandName) -> Result<CommandOutput, ShellError>;

    /// Run and forward output line by line. Returns the exit code.
    async fn execute_with_stream(
        &self,
        name: CommandName,
        events: UnboundedSender<ShellEvent>,
    ) -> Result<i32, ShellError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_match_serde_representation() {
        for name in CommandName::ALL {
            let json = serde_json::to_string(&name).unwrap();
            assert_eq!(json, format!("\"{}\"", name.as_str()));
        }
    }

    #[test]
    fn test_command_display_quotes_spaced_args() {
        let command = ShellCommand {
            name: CommandName::DenoInstallUnix,
            program: "sh".into(),
            args: vec!["-c".into(), "curl -fsSL https://deno.land/install.sh | sh".into()],
        };
        assert_eq!(
            command.to_string(),
            "sh -c \"curl -fsSL https://deno.land/install.sh | sh\""
        );
    }
}
