use application::{
    CommitError, InstallOutcome, InstallerWizard, RefreshMode, TargetStatus, WizardError,
};
use async_trait::async_trait;
use domain::deeplink::{DeepLinkPayload, ResolvedLink};
use domain::ports::config_adapter::{AdapterError, ClientInfo, ConfigAdapter};
use domain::ports::shell::{
    CommandName, CommandOutput, ShellCommand, ShellError, ShellEvent, ShellExecutor,
};
use domain::security::trust::{FailureReason, VerificationOutcome};
use domain::system::platform::OsType;
use domain::wizard::{InstallTarget, Step};
use infrastructure::ClientRegistry;
use magnet_manifest::{EnvValueMap, Manifest, ManifestValidator, McpServerConfig, PROVENANCE_ENV_KEY};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::sync::Notify;

/// Records upserts in memory; optionally fails or blocks
struct MemoryAdapter {
    id: &'static str,
    supports_projects: bool,
    project: Option<PathBuf>,
    fail: bool,
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
    writes: Arc<Mutex<Vec<(PathBuf, String, McpServerConfig)>>>,
}

impl MemoryAdapter {
    fn new(id: &'static str, supports_projects: bool) -> Self {
        Self {
            id,
            supports_projects,
            project: None,
            fail: false,
            gate: None,
            writes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn path(&self) -> PathBuf {
        match &self.project {
            Some(project) => project.join(format!("{}.json", self.id)),
            None => PathBuf::from(format!("/home/u/{}.json", self.id)),
        }
    }
}

#[async_trait]
impl ConfigAdapter for MemoryAdapter {
    fn client_info(&self) -> ClientInfo {
        ClientInfo {
            id: self.id.to_string(),
            name: self.id.to_uppercase(),
            supports_projects: self.supports_projects,
        }
    }

    async fn config_file_path(&self) -> Result<PathBuf, AdapterError> {
        Ok(self.path())
    }

    async fn upsert(&self, name: &str, config: &McpServerConfig) -> Result<(), AdapterError> {
        if let Some((entered, release)) = &self.gate {
            entered.notify_one();
            release.notified().await;
        }
        if self.fail {
            return Err(AdapterError::Write {
                path: self.path(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        self.writes
            .lock()
            .unwrap()
            .push((self.path(), name.to_string(), config.clone()));
        Ok(())
    }

    fn project(&self, path: &Path) -> Option<Arc<dyn ConfigAdapter>> {
        self.supports_projects.then(|| {
            Arc::new(MemoryAdapter {
                id: self.id,
                supports_projects: true,
                project: Some(path.to_path_buf()),
                fail: self.fail,
                gate: None,
                writes: self.writes.clone(),
            }) as Arc<dyn ConfigAdapter>
        })
    }

    fn refresh_instructions(&self) -> Option<String> {
        Some(format!("restart {}", self.id))
    }
}

/// Commands in `installed` succeed; installers flip their runtime to installed
#[derive(Default)]
struct FakeShell {
    installed: Mutex<HashSet<CommandName>>,
}

impl FakeShell {
    fn with(installed: &[CommandName]) -> Arc<Self> {
        Arc::new(Self {
            installed: Mutex::new(installed.iter().copied().collect()),
        })
    }
}

#[async_trait]
impl ShellExecutor for FakeShell {
    fn command_details(&self, _name: CommandName) -> Option<ShellCommand> {
        None
    }

    async fn execute(&self, name: CommandName) -> Result<CommandOutput, ShellError> {
        let ok = self.installed.lock().unwrap().contains(&name);
        Ok(CommandOutput {
            code: if ok { 0 } else { 1 },
            stdout: String::new(),
            stderr: String::new(),
        })
    }

    async fn execute_with_stream(
        &self,
        name: CommandName,
        events: UnboundedSender<ShellEvent>,
    ) -> Result<i32, ShellError> {
        let _ = events.send(ShellEvent::Started {
            command: name.to_string(),
            args: vec![],
        });
        if name == CommandName::DenoInstallUnix {
            self.installed
                .lock()
                .unwrap()
                .insert(CommandName::DenoVersionCheck);
        }
        let _ = events.send(ShellEvent::Finished { code: 0 });
        Ok(0)
    }
}

fn manifest(command: &str, env: serde_json::Value) -> Manifest {
    ManifestValidator::from_value(serde_json::json!({
        "name": "slack",
        "command": command,
        "args": ["-y", "pkg"],
        "env": env,
        "manifestVersion": "1.2.0",
        "manifestAuthor": "github:alice"
    }))
    .unwrap()
}

fn resolved(manifest: Manifest, trust: VerificationOutcome) -> ResolvedLink {
    ResolvedLink {
        manifest,
        payload: DeepLinkPayload {
            manifest_param: String::new(),
            signature_param: None,
            github_username: None,
        },
        trust,
    }
}

fn token_env() -> serde_json::Value {
    serde_json::json!({
        "TOKEN": {"type": "text", "description": "Bot token", "required": true},
        "TEAM": {"type": "text", "description": "Team"}
    })
}

async fn wizard_with(
    manifest: Manifest,
    adapters: Vec<Arc<dyn ConfigAdapter>>,
    shell: Arc<FakeShell>,
) -> InstallerWizard {
    InstallerWizard::new(
        resolved(manifest, VerificationOutcome::Unsigned),
        ClientRegistry::from_adapters(adapters),
        shell,
        OsType::Linux,
    )
    .await
    .unwrap()
}

fn values(pairs: &[(&str, &str)]) -> EnvValueMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn test_failed_trust_never_reaches_wizard() {
    let result = InstallerWizard::new(
        resolved(
            manifest("npx", token_env()),
            VerificationOutcome::Failed(FailureReason::NoMatchingKey),
        ),
        ClientRegistry::default(),
        FakeShell::with(&[]),
        OsType::Linux,
    )
    .await;

    assert!(matches!(
        result,
        Err(WizardError::Untrusted(FailureReason::NoMatchingKey))
    ));
}

#[tokio::test]
async fn test_full_flow_writes_every_target() {
    let cursor = MemoryAdapter::new("cursor", true);
    let writes = cursor.writes.clone();
    let wizard = wizard_with(
        manifest("npx", token_env()),
        vec![Arc::new(cursor)],
        FakeShell::with(&[CommandName::NodeVersionCheck]),
    )
    .await;

    assert_eq!(wizard.next().unwrap(), Step::EnvConfig);
    assert!(matches!(wizard.next(), Err(WizardError::EnvForm(_))));
    assert_eq!(
        wizard.submit_env(values(&[("TOKEN", "xoxb"), ("TEAM", "")])).unwrap(),
        Step::AppSelection
    );

    assert!(matches!(wizard.next(), Err(WizardError::EmptySelection)));
    wizard.toggle_app("cursor").unwrap();
    wizard.add_project("cursor", "/work/a").unwrap();
    assert!(!wizard.add_project("cursor", "/work/a").unwrap());

    // Node is installed, so the runtime check is skipped
    assert_eq!(wizard.next().unwrap(), Step::ConfigConfirmation);
    assert!(matches!(wizard.next(), Err(WizardError::CommitRequired)));

    let targets = wizard.config_targets().await;
    assert_eq!(targets[1].1, Ok(PathBuf::from("/work/a/cursor.json")));

    let report = wizard.commit().await.unwrap();
    assert!(report.is_complete());
    assert_eq!(wizard.step(), Step::Completion);

    let writes = writes.lock().unwrap();
    assert_eq!(writes.len(), 2);
    let env = writes[0].2.env.as_ref().unwrap();
    assert_eq!(env["TOKEN"], "xoxb");
    assert!(!env.contains_key("TEAM"));
    assert_eq!(env[PROVENANCE_ENV_KEY], "github:alice/slack@1.2.0");
}

#[tokio::test]
async fn test_back_from_app_selection_skips_env_config() {
    let wizard = wizard_with(
        manifest("npx", serde_json::json!({})),
        vec![Arc::new(MemoryAdapter::new("claude", false))],
        FakeShell::with(&[]),
    )
    .await;

    assert_eq!(wizard.next().unwrap(), Step::AppSelection);
    assert_eq!(wizard.back().unwrap(), Step::Overview);
    assert!(matches!(wizard.back(), Err(WizardError::NoPreviousStep(Step::Overview))));
}

#[tokio::test]
async fn test_project_on_app_without_projects_is_rejected() {
    let wizard = wizard_with(
        manifest("npx", serde_json::json!({})),
        vec![Arc::new(MemoryAdapter::new("claude", false))],
        FakeShell::with(&[]),
    )
    .await;

    assert!(matches!(
        wizard.add_project("claude", "/work"),
        Err(WizardError::Selection(_))
    ));
    assert!(matches!(
        wizard.toggle_app("vscode"),
        Err(WizardError::UnknownClient(_))
    ));
}

#[tokio::test]
async fn test_write_failure_stops_commit() {
    let ok = MemoryAdapter::new("claude", false);
    let written = ok.writes.clone();
    let mut broken = MemoryAdapter::new("cursor", true);
    broken.fail = true;

    let wizard = wizard_with(
        manifest("uvx", serde_json::json!({})),
        vec![Arc::new(ok), Arc::new(broken), Arc::new(MemoryAdapter::new("claudeCode", true))],
        FakeShell::with(&[]),
    )
    .await;

    wizard.next().unwrap();
    wizard.toggle_app("claude").unwrap();
    wizard.toggle_app("cursor").unwrap();
    wizard.toggle_app("claudeCode").unwrap();
    assert_eq!(wizard.next().unwrap(), Step::ConfigConfirmation);

    let report = wizard.commit().await.unwrap();
    let statuses: Vec<&TargetStatus> = report.results.iter().map(|(_, s)| s).collect();
    assert!(matches!(statuses[0], TargetStatus::Written(_)));
    assert!(matches!(statuses[1], TargetStatus::WriteFailed(_)));
    assert_eq!(statuses[2], &TargetStatus::NotAttempted);

    // Earlier writes stay, and the wizard stays on confirmation
    assert_eq!(written.lock().unwrap().len(), 1);
    assert_eq!(wizard.step(), Step::ConfigConfirmation);
}

#[tokio::test]
async fn test_commit_outside_confirmation_is_refused() {
    let wizard = wizard_with(
        manifest("npx", serde_json::json!({})),
        vec![Arc::new(MemoryAdapter::new("claude", false))],
        FakeShell::with(&[]),
    )
    .await;

    assert!(matches!(
        wizard.commit().await,
        Err(CommitError::NotReady(Step::Overview))
    ));
}

#[tokio::test]
async fn test_concurrent_commit_is_refused() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let mut gated = MemoryAdapter::new("claude", false);
    gated.gate = Some((entered.clone(), release.clone()));

    let wizard = Arc::new(
        wizard_with(
            manifest("uvx", serde_json::json!({})),
            vec![Arc::new(gated)],
            FakeShell::with(&[]),
        )
        .await,
    );
    wizard.next().unwrap();
    wizard.toggle_app("claude").unwrap();
    wizard.next().unwrap();

    let first = {
        let wizard = wizard.clone();
        tokio::spawn(async move { wizard.commit().await })
    };
    entered.notified().await;

    assert!(matches!(
        wizard.commit().await,
        Err(CommitError::CommitInFlight)
    ));

    release.notify_one();
    let report = first.await.unwrap().unwrap();
    assert!(report.is_complete());
}

#[tokio::test]
async fn test_runtime_install_reenables_flow() {
    let wizard = wizard_with(
        manifest("deno", serde_json::json!({})),
        vec![Arc::new(MemoryAdapter::new("claude", false))],
        FakeShell::with(&[]),
    )
    .await;

    assert!(!wizard.runtime_state().installed);
    wizard.next().unwrap();
    wizard.toggle_app("claude").unwrap();
    assert_eq!(wizard.next().unwrap(), Step::RuntimeCheck);
    assert_eq!(
        wizard.planned_runtime_install().await,
        Some(CommandName::DenoInstallUnix)
    );

    let (tx, mut rx) = mpsc::unbounded_channel();
    let outcome = wizard.install_runtime(tx).await;
    assert_eq!(outcome, Some(InstallOutcome::Installed));
    assert!(wizard.runtime_state().installed);
    assert!(matches!(rx.recv().await, Some(ShellEvent::Started { .. })));

    // Installed now, so going back skips the runtime check
    assert_eq!(wizard.next().unwrap(), Step::ConfigConfirmation);
    assert_eq!(wizard.back().unwrap(), Step::AppSelection);
}

#[tokio::test]
async fn test_completion_actions_and_close() {
    let wizard = wizard_with(
        manifest("uvx", serde_json::json!({})),
        vec![
            Arc::new(MemoryAdapter::new("claude", false)),
            Arc::new(MemoryAdapter::new("cursor", true)),
        ],
        FakeShell::with(&[]),
    )
    .await;

    wizard.next().unwrap();
    wizard.toggle_app("cursor").unwrap();
    wizard.add_project("cursor", "/p").unwrap();
    wizard.next().unwrap();
    wizard.commit().await.unwrap();

    let actions = wizard.completion_actions();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].client.id, "cursor");
    assert_eq!(actions[0].refresh, RefreshMode::Manual("restart cursor".into()));

    wizard.close();
    assert_eq!(wizard.step(), Step::Overview);
    assert!(wizard.installs().is_empty());
    assert!(!wizard.installs().contains(&InstallTarget::global("cursor")));
}

#[tokio::test]
async fn test_deno_permission_summary_is_exposed() {
    let mut m = manifest("deno", serde_json::json!({}));
    m.args = vec!["run".into(), "--allow-net=api.example.com".into(), "main.ts".into()];
    let wizard = wizard_with(m, vec![], FakeShell::with(&[CommandName::DenoVersionCheck])).await;

    let summary = wizard.permission_summary().unwrap();
    assert!(!summary.allow_all);
    assert_eq!(summary.permissions[0].scope.as_deref(), Some("api.example.com"));
}

#[tokio::test]
async fn test_undescribed_required_entry_is_part_of_the_form() {
    let wizard = wizard_with(
        manifest(
            "npx",
            serde_json::json!({
                "TOKEN": {"type": "text", "description": "Token", "required": true},
                "SECRET": {"type": "text", "description": "", "required": true}
            }),
        ),
        vec![Arc::new(MemoryAdapter::new("claude", false))],
        FakeShell::with(&[CommandName::NodeVersionCheck]),
    )
    .await;

    assert_eq!(wizard.next().unwrap(), Step::EnvConfig);
    let labels: Vec<&str> = wizard
        .manifest()
        .env_entries()
        .map(|(key, config)| domain::wizard::label(key, config))
        .collect();
    assert_eq!(labels, vec!["SECRET", "Token"]);

    match wizard.submit_env(values(&[("TOKEN", "t-1")])) {
        Err(WizardError::EnvForm(errors)) => {
            assert_eq!(errors.errors.len(), 1);
            assert_eq!(errors.for_key("SECRET").unwrap().message, "a value is required");
        }
        other => panic!("expected an env form error, got {:?}", other),
    }
    assert_eq!(wizard.step(), Step::EnvConfig);

    assert_eq!(
        wizard
            .submit_env(values(&[("TOKEN", "t-1"), ("SECRET", "s-1")]))
            .unwrap(),
        Step::AppSelection
    );
    assert_eq!(wizard.env()["SECRET"], "s-1");
}

#[tokio::test]
async fn test_commit_with_emptied_selection_writes_nothing() {
    let claude = MemoryAdapter::new("claude", false);
    let writes = claude.writes.clone();
    let wizard = wizard_with(
        manifest("uvx", serde_json::json!({})),
        vec![Arc::new(claude)],
        FakeShell::with(&[]),
    )
    .await;

    wizard.next().unwrap();
    wizard.toggle_app("claude").unwrap();
    assert_eq!(wizard.next().unwrap(), Step::ConfigConfirmation);

    // Deselected after reaching confirmation
    wizard.toggle_app("claude").unwrap();
    assert!(matches!(
        wizard.commit().await,
        Err(CommitError::EmptySelection)
    ));
    assert!(writes.lock().unwrap().is_empty());
    assert_eq!(wizard.step(), Step::ConfigConfirmation);
}

#[tokio::test]
async fn test_leaving_confirmation_during_commit_keeps_new_step() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let mut gated = MemoryAdapter::new("claude", false);
    gated.gate = Some((entered.clone(), release.clone()));

    let wizard = Arc::new(
        wizard_with(
            manifest("uvx", serde_json::json!({})),
            vec![Arc::new(gated)],
            FakeShell::with(&[]),
        )
        .await,
    );
    wizard.next().unwrap();
    wizard.toggle_app("claude").unwrap();
    wizard.next().unwrap();

    let commit = {
        let wizard = wizard.clone();
        tokio::spawn(async move { wizard.commit().await })
    };
    entered.notified().await;
    wizard.close();
    release.notify_one();

    let report = commit.await.unwrap().unwrap();
    assert!(report.is_complete());
    assert_eq!(wizard.step(), Step::Overview);
}
