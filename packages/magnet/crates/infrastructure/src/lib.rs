pub mod clients;
pub mod config;
pub mod github;
pub mod shell;

pub use clients::{ClientKind, ClientRegistry};
pub use config::{ConfigStore, InstallerConfig};
pub use github::GithubKeyFetcher;
pub use shell::ProcessShell;
