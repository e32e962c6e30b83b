use crate::runtime::Runtime;
use magnet_manifest::Manifest;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Overview,
    EnvConfig,
    AppSelection,
    RuntimeCheck,
    ConfigConfirmation,
    Completion,
}

impl Step {
    pub const ORDER: [Step; 6] = [
        Step::Overview,
        Step::EnvConfig,
        Step::AppSelection,
        Step::RuntimeCheck,
        Step::ConfigConfirmation,
        Step::Completion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Overview => "overview",
            Step::EnvConfig => "env_config",
            Step::AppSelection => "app_selection",
            Step::RuntimeCheck => "runtime_check",
            Step::ConfigConfirmation => "config_confirmation",
            Step::Completion => "completion",
        }
    }

    fn index(&self) -> usize {
        Self::ORDER
            .iter()
            .position(|step| step == self)
            .unwrap_or_default()
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the skip rules know about the manifest's runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RuntimeState {
    pub runtime: Option<Runtime>,
    pub installed: bool,
}

impl RuntimeState {
    pub fn for_manifest(manifest: &Manifest, installed: bool) -> Self {
        Self {
            runtime: Runtime::for_command(&manifest.command),
            installed,
        }
    }
}

/// Whether `step` is skipped for this manifest. Pure, so forward and backward
/// navigation always agree.
pub fn is_skipped(step: Step, manifest: &Manifest, runtime: &RuntimeState) -> bool {
    match step {
        Step::EnvConfig => !manifest.requires_env_input(),
        Step::RuntimeCheck => runtime.runtime.is_none() || runtime.installed,
        _ => false,
    }
}

/// Next step that is not skipped; `None` past completion
pub fn next_step(current: Step, manifest: &Manifest, runtime: &RuntimeState) -> Option<Step> {
    Step::ORDER[current.index() + 1..]
        .iter()
        .copied()
        .find(|step| !is_skipped(*step, manifest, runtime))
}

/// Previous step that is not skipped; `None` before overview
pub fn previous_step(current: Step, manifest: &Manifest, runtime: &RuntimeState) -> Option<Step> {
    Step::ORDER[..current.index()]
        .iter()
        .rev()
        .copied()
        .find(|step| !is_skipped(*step, manifest, runtime))
}
