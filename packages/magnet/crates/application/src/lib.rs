pub mod installer;
pub mod resolution;
pub mod runtime_install;

pub use installer::{
    CommitError, CommitReport, CompletionAction, InstallerWizard, RefreshMode, TargetStatus,
    WizardError,
};
pub use resolution::{DeepLinkService, ResolutionState};
pub use runtime_install::{InstallOutcome, RuntimeInstaller};
