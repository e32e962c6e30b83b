pub mod env_form;
pub mod selection;
pub mod step;

pub use env_form::{default_values, label, EnvFormError, FieldError};
pub use selection::{InstallSelection, InstallTarget, SelectionError};
pub use step::{is_skipped, next_step, previous_step, RuntimeState, Step};

use magnet_manifest::EnvValueMap;

/// Everything the installer flow accumulates between steps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardState {
    pub step: Step,
    pub env: EnvValueMap,
    pub installs: InstallSelection,
}

impl Default for WizardState {
    fn default() -> Self {
        Self {
            step: Step::Overview,
            env: EnvValueMap::new(),
            installs: InstallSelection::new(),
        }
    }
}

impl WizardState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
