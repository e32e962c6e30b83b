use crate::runtime_install::{InstallOutcome, RuntimeInstaller};
use domain::deeplink::ResolvedLink;
use domain::ports::config_adapter::{AdapterError, ClientInfo, ConfigAdapter};
use domain::ports::shell::{CommandName, ShellEvent, ShellExecutor};
use domain::runtime::{PermissionSummary, Runtime, RuntimeProbe};
use domain::security::trust::{FailureReason, VerificationOutcome};
use domain::system::platform::OsType;
use domain::wizard::env_form::{self, EnvFormError};
use domain::wizard::{
    next_step, previous_step, InstallSelection, InstallTarget, RuntimeState, SelectionError,
    Step, WizardState,
};
use infrastructure::ClientRegistry;
use magnet_manifest::{EnvValueMap, Manifest, McpServerConfig};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum WizardError {
    #[error("refusing to install: {0}")]
    Untrusted(FailureReason),

    #[error(transparent)]
    EnvForm(#[from] EnvFormError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("unknown client '{0}'")]
    UnknownClient(String),

    #[error("select at least one application")]
    EmptySelection,

    #[error("this action is only available at {expected}, the wizard is at {actual}")]
    WrongStep { expected: Step, actual: Step },

    #[error("confirm and write the configuration to continue")]
    CommitRequired,

    #[error("no step after {0}")]
    NoNextStep(Step),

    #[error("no step before {0}")]
    NoPreviousStep(Step),

    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

#[derive(Error, Debug)]
pub enum CommitError {
    #[error("unknown client '{0}'")]
    UnknownClient(String),

    #[error("{client} cannot be configured per project ({})", .path.display())]
    UnsupportedOperation { client: String, path: PathBuf },

    #[error("a commit is already running")]
    CommitInFlight,

    #[error("configuration can only be written from the confirmation step, not {0}")]
    NotReady(Step),

    #[error("select at least one application")]
    EmptySelection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetStatus {
    Written(PathBuf),
    WriteFailed(String),
    /// An earlier target failed and the commit stopped
    NotAttempted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReport {
    pub results: Vec<(InstallTarget, TargetStatus)>,
}

impl CommitReport {
    pub fn is_complete(&self) -> bool {
        self.results
            .iter()
            .all(|(_, status)| matches!(status, TargetStatus::Written(_)))
    }
}

/// How a client picks up the new entry once it is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshMode {
    Automatic,
    Manual(String),
    Nothing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionAction {
    pub client: ClientInfo,
    pub refresh: RefreshMode,
}

// Clears the in-flight flag on every exit path
struct CommitGuard<'a>(&'a AtomicBool);

impl Drop for CommitGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Installer flow for one resolved link
pub struct InstallerWizard {
    link: ResolvedLink,
    clients: ClientRegistry,
    shell: Arc<dyn ShellExecutor>,
    os: OsType,
    state: Mutex<WizardState>,
    runtime: Mutex<RuntimeState>,
    committing: AtomicBool,
}

impl InstallerWizard {
    /// Links whose verification failed never reach the wizard
    pub async fn new(
        link: ResolvedLink,
        clients: ClientRegistry,
        shell: Arc<dyn ShellExecutor>,
        os: OsType,
    ) -> Result<Self, WizardError> {
        if let VerificationOutcome::Failed(reason) = &link.trust {
            return Err(WizardError::Untrusted(reason.clone()));
        }

        let runtime = match Runtime::for_command(&link.manifest.command) {
            Some(runtime) => RuntimeState {
                runtime: Some(runtime),
                installed: RuntimeProbe::new(runtime, os, shell.clone())
                    .is_installed()
                    .await,
            },
            None => RuntimeState::default(),
        };

        let state = WizardState {
            env: env_form::default_values(&link.manifest),
            ..WizardState::default()
        };

        Ok(Self {
            link,
            clients,
            shell,
            os,
            state: Mutex::new(state),
            runtime: Mutex::new(runtime),
            committing: AtomicBool::new(false),
        })
    }

    pub fn manifest(&self) -> &Manifest {
        &self.link.manifest
    }

    pub fn trust(&self) -> &VerificationOutcome {
        &self.link.trust
    }

    pub fn step(&self) -> Step {
        self.state().step
    }

    pub fn env(&self) -> EnvValueMap {
        self.state().env.clone()
    }

    pub fn installs(&self) -> InstallSelection {
        self.state().installs.clone()
    }

    pub fn clients(&self) -> Vec<ClientInfo> {
        self.clients.clients()
    }

    pub fn runtime_state(&self) -> RuntimeState {
        *self.runtime_lock()
    }

    pub fn permission_summary(&self) -> Option<PermissionSummary> {
        let runtime = Runtime::for_command(&self.link.manifest.command)?;
        runtime.permission_summary(&self.link.manifest.args)
    }

    /// Advance past the current step after checking what it collected
    pub fn next(&self) -> Result<Step, WizardError> {
        let runtime = self.runtime_state();
        let mut state = self.state();

        match state.step {
            Step::EnvConfig => {
                let accepted = env_form::validate(&self.link.manifest, &state.env)?;
                state.env = accepted;
            }
            Step::AppSelection if state.installs.is_empty() => {
                return Err(WizardError::EmptySelection);
            }
            Step::ConfigConfirmation => return Err(WizardError::CommitRequired),
            _ => {}
        }

        let next = next_step(state.step, &self.link.manifest, &runtime)
            .ok_or(WizardError::NoNextStep(state.step))?;
        state.step = next;
        Ok(next)
    }

    pub fn back(&self) -> Result<Step, WizardError> {
        let runtime = self.runtime_state();
        let mut state = self.state();

        let previous = previous_step(state.step, &self.link.manifest, &runtime)
            .ok_or(WizardError::NoPreviousStep(state.step))?;
        state.step = previous;
        Ok(previous)
    }

    /// Validate and store the env form, then advance
    pub fn submit_env(&self, values: EnvValueMap) -> Result<Step, WizardError> {
        {
            let mut state = self.state();
            expect_step(&state, Step::EnvConfig)?;
            state.env = env_form::validate(&self.link.manifest, &values)?;
        }
        self.next()
    }

    pub fn toggle_app(&self, app_id: &str) -> Result<bool, WizardError> {
        self.client(app_id)?;
        Ok(self.state().installs.toggle_app(app_id))
    }

    pub fn toggle_global(&self, app_id: &str) -> Result<bool, WizardError> {
        self.client(app_id)?;
        Ok(self.state().installs.toggle_global(app_id))
    }

    /// `Ok(false)` when the project was already selected
    pub fn add_project(&self, app_id: &str, path: impl Into<PathBuf>) -> Result<bool, WizardError> {
        let info = self.client(app_id)?.client_info();
        Ok(self.state().installs.add_project(&info, path)?)
    }

    pub fn remove_project(&self, app_id: &str, path: &Path) -> bool {
        self.state().installs.remove_project(app_id, path)
    }

    /// Exactly what gets written, provenance entry included
    pub fn pending_config(&self) -> McpServerConfig {
        self.link.manifest.server_config(&self.state().env)
    }

    /// Config file each selected target resolves to
    pub async fn config_targets(&self) -> Vec<(InstallTarget, Result<PathBuf, String>)> {
        let targets = self.installs().targets().to_vec();
        let mut resolved = Vec::with_capacity(targets.len());
        for target in targets {
            let path = match self.commit_adapter(&target) {
                Ok(adapter) => adapter
                    .config_file_path()
                    .await
                    .map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };
            resolved.push((target, path));
        }
        resolved
    }

    pub async fn planned_runtime_install(&self) -> Option<CommandName> {
        let installer = self.runtime_installer()?;
        installer.planned_command().await
    }

    /// Install the manifest's runtime. Failure only warns; the flow can continue.
    pub async fn install_runtime(&self, events: UnboundedSender<ShellEvent>) -> Option<InstallOutcome> {
        let installer = self.runtime_installer()?;
        let outcome = installer.install(events).await;
        if outcome == InstallOutcome::Installed {
            self.runtime_lock().installed = true;
        }
        Some(outcome)
    }

    /// Write the server entry into every selected target, in order.
    ///
    /// Every target is resolved to an adapter before anything is written. A
    /// write failure stops the loop; earlier writes stay in place.
    pub async fn commit(&self) -> Result<CommitReport, CommitError> {
        if self
            .committing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(CommitError::CommitInFlight);
        }
        let _guard = CommitGuard(&self.committing);

        let (targets, config) = {
            let state = self.state();
            if state.step != Step::ConfigConfirmation {
                return Err(CommitError::NotReady(state.step));
            }
            if state.installs.is_empty() {
                return Err(CommitError::EmptySelection);
            }
            (
                state.installs.targets().to_vec(),
                self.link.manifest.server_config(&state.env),
            )
        };

        let mut planned = Vec::with_capacity(targets.len());
        for target in targets {
            let adapter = self.commit_adapter(&target)?;
            planned.push((target, adapter));
        }

        let name = &self.link.manifest.name;
        let mut results = Vec::with_capacity(planned.len());
        let mut stopped = false;
        for (target, adapter) in planned {
            if stopped {
                results.push((target, TargetStatus::NotAttempted));
                continue;
            }

            let written = match adapter.upsert(name, &config).await {
                Ok(()) => adapter.config_file_path().await,
                Err(e) => Err(e),
            };
            match written {
                Ok(path) => {
                    info!(target = %target, path = %path.display(), "server installed");
                    results.push((target, TargetStatus::Written(path)));
                }
                Err(e) => {
                    warn!(target = %target, error = %e, "write failed, stopping commit");
                    results.push((target, TargetStatus::WriteFailed(e.to_string())));
                    stopped = true;
                }
            }
        }

        let report = CommitReport { results };
        if report.is_complete() {
            // The flow may have moved (back, close) while the writes ran
            let mut state = self.state();
            if state.step == Step::ConfigConfirmation {
                state.step = Step::Completion;
            } else {
                warn!(step = %state.step, "wizard left confirmation during commit");
            }
        }
        Ok(report)
    }

    /// One entry per selected client
    pub fn completion_actions(&self) -> Vec<CompletionAction> {
        let installs = self.installs();
        installs
            .apps()
            .into_iter()
            .filter_map(|id| self.clients.get(id))
            .map(|adapter| CompletionAction {
                client: adapter.client_info(),
                refresh: if adapter.supports_refresh() {
                    RefreshMode::Automatic
                } else {
                    adapter
                        .refresh_instructions()
                        .map(RefreshMode::Manual)
                        .unwrap_or(RefreshMode::Nothing)
                },
            })
            .collect()
    }

    pub async fn refresh(&self, app_id: &str) -> Result<(), WizardError> {
        let adapter = self.client(app_id)?;
        adapter.refresh().await?;
        Ok(())
    }

    /// Back to a blank overview
    pub fn close(&self) {
        let mut state = self.state();
        state.reset();
        state.env = env_form::default_values(&self.link.manifest);
    }

    fn client(&self, app_id: &str) -> Result<Arc<dyn ConfigAdapter>, WizardError> {
        self.clients
            .get(app_id)
            .ok_or_else(|| WizardError::UnknownClient(app_id.to_string()))
    }

    fn commit_adapter(&self, target: &InstallTarget) -> Result<Arc<dyn ConfigAdapter>, CommitError> {
        let adapter = self
            .clients
            .get(&target.app_id)
            .ok_or_else(|| CommitError::UnknownClient(target.app_id.clone()))?;

        match &target.project {
            None => Ok(adapter),
            Some(path) => adapter
                .project(path)
                .ok_or_else(|| CommitError::UnsupportedOperation {
                    client: adapter.client_info().name,
                    path: path.clone(),
                }),
        }
    }

    fn runtime_installer(&self) -> Option<RuntimeInstaller> {
        let runtime = self.runtime_state().runtime?;
        Some(RuntimeInstaller::new(runtime, self.os, self.shell.clone()))
    }

    fn state(&self) -> MutexGuard<'_, WizardState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn runtime_lock(&self) -> MutexGuard<'_, RuntimeState> {
        self.runtime.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn expect_step(state: &WizardState, expected: Step) -> Result<(), WizardError> {
    if state.step == expected {
        Ok(())
    } else {
        Err(WizardError::WrongStep {
            expected,
            actual: state.step,
        })
    }
}
