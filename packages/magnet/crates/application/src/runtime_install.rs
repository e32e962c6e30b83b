use domain::ports::shell::{CommandName, ShellEvent, ShellExecutor};
use domain::runtime::{Runtime, RuntimeProbe};
use domain::system::platform::OsType;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Installer ran and the runtime now answers its version check
    Installed,
    /// Installer ran but the runtime is still missing
    StillMissing { code: Option<i32> },
    /// No automated installer on this platform
    Manual { instructions_url: &'static str },
}

/// Installs a runtime through the named command catalog
pub struct RuntimeInstaller {
    runtime: Runtime,
    os: OsType,
    shell: Arc<dyn ShellExecutor>,
}

impl RuntimeInstaller {
    pub fn new(runtime: Runtime, os: OsType, shell: Arc<dyn ShellExecutor>) -> Self {
        Self { runtime, os, shell }
    }

    fn probe(&self) -> RuntimeProbe {
        RuntimeProbe::new(self.runtime, self.os, self.shell.clone())
    }

    /// Installer that would run, for previewing before consent
    pub async fn planned_command(&self) -> Option<CommandName> {
        self.probe().install_command().await
    }

    /// Run the installer, streaming its output into `events`, then re-check.
    pub async fn install(&self, events: UnboundedSender<ShellEvent>) -> InstallOutcome {
        let Some(command) = self.planned_command().await else {
            return InstallOutcome::Manual {
                instructions_url: self.runtime.install_instruction_url(),
            };
        };

        info!(runtime = %self.runtime, command = %command, "installing runtime");
        let code = match self.shell.execute_with_stream(command, events).await {
            Ok(code) => Some(code),
            Err(e) => {
                warn!(runtime = %self.runtime, error = %e, "runtime installer failed");
                None
            }
        };

        // A fresh probe; the wizard's memoized answer predates the install
        if self.probe().is_installed().await {
            InstallOutcome::Installed
        } else {
            warn!(runtime = %self.runtime, ?code, "runtime still not detected after install");
            InstallOutcome::StillMissing { code }
        }
    }
}
