pub mod config_adapter;
pub mod key_provider;
pub mod shell;

pub use config_adapter::{AdapterError, ClientInfo, ConfigAdapter};
pub use key_provider::{KeyFetchError, KeyProvider};
pub use shell::{CommandName, CommandOutput, ShellCommand, ShellError, ShellEvent, ShellExecutor};
