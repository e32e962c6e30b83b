pub mod deeplink;
pub mod ports;
pub mod runtime;
pub mod security;
pub mod system;
pub mod wizard;

pub use deeplink::{DeepLinkError, DeepLinkResolver, ResolvedLink};
pub use ports::{ConfigAdapter, KeyProvider, ShellExecutor};
pub use runtime::{Runtime, RuntimeProbe};
pub use security::{KeyCache, VerificationOutcome};
pub use system::platform::{OsType, PlatformDetector, PlatformInfo};
pub use wizard::{Step, WizardState};
