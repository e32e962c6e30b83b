pub mod permissions;

pub use permissions::{describe_deno_permissions, Permission, PermissionSummary, Severity};

use crate::ports::shell::{CommandName, ShellExecutor};
use crate::system::platform::OsType;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

/// Command-line runtimes the installer can detect and install
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Runtime {
    Deno,
    Node,
    Python,
}

// Deno sub-commands that take permission flags
const DENO_SUBCOMMANDS: [&str; 3] = ["run", "serve", "x"];

impl Runtime {
    pub const ALL: [Runtime; 3] = [Runtime::Deno, Runtime::Node, Runtime::Python];

    pub fn name(&self) -> &'static str {
        match self {
            Runtime::Deno => "Deno",
            Runtime::Node => "Node.js",
            Runtime::Python => "Python",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Runtime::Deno => "A secure JavaScript and TypeScript runtime",
            Runtime::Node => "JavaScript runtime built on Chrome's V8 engine",
            Runtime::Python => "A general-purpose programming language",
        }
    }

    /// Manifest commands served by this runtime
    pub fn commands(&self) -> &'static [&'static str] {
        match self {
            Runtime::Deno => &["deno"],
            Runtime::Node => &["node", "npm", "npx"],
            Runtime::Python => &["python", "python3", "pip", "pip3"],
        }
    }

    pub fn install_instruction_url(&self) -> &'static str {
        match self {
            Runtime::Deno => "https://deno.land/#installation",
            Runtime::Node => "https://nodejs.org/en/download/",
            Runtime::Python => "https://www.python.org/downloads/",
        }
    }

    /// Platforms where an automated install may exist
    pub fn auto_install_platforms(&self) -> &'static [OsType] {
        match self {
            Runtime::Deno | Runtime::Node => &[OsType::Windows, OsType::MacOS, OsType::Linux],
            Runtime::Python => &[OsType::MacOS],
        }
    }

    /// Tried in order; any success means installed
    fn version_checks(&self) -> &'static [CommandName] {
        match self {
            Runtime::Deno => &[CommandName::DenoVersionCheck],
            Runtime::Node => &[CommandName::NodeVersionCheck],
            Runtime::Python => &[
                CommandName::Python3VersionCheck,
                CommandName::PythonVersionCheck,
            ],
        }
    }

    pub fn for_command(command: &str) -> Option<Runtime> {
        Self::ALL
            .into_iter()
            .find(|runtime| runtime.commands().contains(&command))
    }

    /// Permission summary for the manifest's args, when this runtime has one.
    ///
    /// A leading Deno sub-command (`run`, `serve`) is skipped first.
    pub fn permission_summary(&self, args: &[String]) -> Option<PermissionSummary> {
        match self {
            Runtime::Deno => {
                let argv = match args.first() {
                    Some(first) if DENO_SUBCOMMANDS.contains(&first.as_str()) => &args[1..],
                    _ => args,
                };
                Some(describe_deno_permissions(argv))
            }
            Runtime::Node | Runtime::Python => None,
        }
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Runtime bound to the current machine. `is_installed` is memoized.
pub struct RuntimeProbe {
    runtime: Runtime,
    os: OsType,
    shell: Arc<dyn ShellExecutor>,
    installed: OnceCell<bool>,
}

impl RuntimeProbe {
    pub fn new(runtime: Runtime, os: OsType, shell: Arc<dyn ShellExecutor>) -> Self {
        Self {
            runtime,
            os,
            shell,
            installed: OnceCell::new(),
        }
    }

    pub fn runtime(&self) -> Runtime {
        self.runtime
    }

    pub async fn is_installed(&self) -> bool {
        *self
            .installed
            .get_or_init(|| async {
                for check in self.runtime.version_checks() {
                    if self.command_succeeds(*check).await {
                        return true;
                    }
                }
                false
            })
            .await
    }

    /// Installer for this platform, `None` when no automated install exists
    pub async fn install_command(&self) -> Option<CommandName> {
        match (self.runtime, self.os) {
            (Runtime::Deno, OsType::Windows) => Some(
                if self.command_succeeds(CommandName::WingetVersionCheck).await {
                    CommandName::DenoInstallWindowsWinget
                } else {
                    CommandName::DenoInstallWindowsFallback
                },
            ),
            (Runtime::Deno, OsType::MacOS | OsType::Linux) => Some(CommandName::DenoInstallUnix),
            (Runtime::Node, OsType::Windows) => Some(
                if self.command_succeeds(CommandName::WingetVersionCheck).await {
                    CommandName::NodeInstallWindowsWinget
                } else {
                    CommandName::NodeInstallWindowsFallback
                },
            ),
            (Runtime::Node, OsType::MacOS) => self
                .command_succeeds(CommandName::HomebrewVersionCheck)
                .await
                .then_some(CommandName::NodeInstallMacos),
            (Runtime::Node, OsType::Linux) => Some(CommandName::NodeInstallLinux),
            (Runtime::Python, OsType::MacOS) => self
                .command_succeeds(CommandName::HomebrewVersionCheck)
                .await
                .then_some(CommandName::PythonInstallMacos),
            _ => None,
        }
    }

    async fn command_succeeds(&self, command: CommandName) -> bool {
        match self.shell.execute(command).await {
            Ok(output) => output.success(),
            Err(e) => {
                debug!(command = %command, error = %e, "probe command failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::shell::{CommandOutput, ShellCommand, ShellError, ShellEvent};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use tokio::sync::mpsc::UnboundedSender;

    /// Succeeds for the listed commands, records every call
    struct FakeShell {
        succeeding: HashSet<CommandName>,
        calls: Mutex<Vec<CommandName>>,
    }

    impl FakeShell {
        fn new(succeeding: &[CommandName]) -> Arc<Self> {
            Arc::new(Self {
                succeeding: succeeding.iter().copied().collect(),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<CommandName> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ShellExecutor for FakeShell {
        fn command_details(&self, _name: CommandName) -> Option<ShellCommand> {
            None
        }

        async fn execute(&self, name: CommandName) -> Result<CommandOutput, ShellError> {
            self.calls.lock().unwrap().push(name);
            Ok(CommandOutput {
                code: if self.succeeding.contains(&name) { 0 } else { 1 },
                stdout: String::new(),
                stderr: String::new(),
            })
        }

        async fn execute_with_stream(
            &self,
            name: CommandName,
            _events: UnboundedSender<ShellEvent>,
        ) -> Result<i32, ShellError> {
            Ok(self.execute(name).await?.code)
        }
    }

    #[test]
    fn test_for_command() {
        assert_eq!(Runtime::for_command("npx"), Some(Runtime::Node));
        assert_eq!(Runtime::for_command("deno"), Some(Runtime::Deno));
        assert_eq!(Runtime::for_command("pip3"), Some(Runtime::Python));
        assert_eq!(Runtime::for_command("uvx"), None);
    }

    #[test]
    fn test_deno_summary_skips_subcommand() {
        let args: Vec<String> = ["run", "-A", "main.ts"].iter().map(|s| s.to_string()).collect();
        assert!(Runtime::Deno.permission_summary(&args).unwrap().allow_all);
        assert!(Runtime::Node.permission_summary(&args).is_none());
    }

    #[tokio::test]
    async fn test_is_installed_is_memoized() {
        let shell = FakeShell::new(&[CommandName::NodeVersionCheck]);
        let probe = RuntimeProbe::new(Runtime::Node, OsType::Linux, shell.clone());

        assert!(probe.is_installed().await);
        assert!(probe.is_installed().await);
        assert_eq!(shell.calls(), vec![CommandName::NodeVersionCheck]);
    }

    #[tokio::test]
    async fn test_python_falls_back_to_python_binary() {
        let shell = FakeShell::new(&[CommandName::PythonVersionCheck]);
        let probe = RuntimeProbe::new(Runtime::Python, OsType::Linux, shell.clone());

        assert!(probe.is_installed().await);
        assert_eq!(
            shell.calls(),
            vec![CommandName::Python3VersionCheck, CommandName::PythonVersionCheck]
        );
    }

    #[tokio::test]
    async fn test_install_command_per_platform() {
        let none = FakeShell::new(&[]);
        let brew = FakeShell::new(&[CommandName::HomebrewVersionCheck]);
        let winget = FakeShell::new(&[CommandName::WingetVersionCheck]);

        let cases = [
            (Runtime::Deno, OsType::Windows, winget.clone(), Some(CommandName::DenoInstallWindowsWinget)),
            (Runtime::Deno, OsType::Windows, none.clone(), Some(CommandName::DenoInstallWindowsFallback)),
            (Runtime::Deno, OsType::MacOS, none.clone(), Some(CommandName::DenoInstallUnix)),
            (Runtime::Node, OsType::MacOS, brew.clone(), Some(CommandName::NodeInstallMacos)),
            (Runtime::Node, OsType::MacOS, none.clone(), None),
            (Runtime::Node, OsType::Linux, none.clone(), Some(CommandName::NodeInstallLinux)),
            (Runtime::Python, OsType::MacOS, brew.clone(), Some(CommandName::PythonInstallMacos)),
            (Runtime::Python, OsType::Linux, brew.clone(), None),
        ];

        for (runtime, os, shell, expected) in cases {
            let probe = RuntimeProbe::new(runtime, os, shell);
            assert_eq!(probe.install_command().await, expected, "{runtime} on {os}");
        }
    }
}
