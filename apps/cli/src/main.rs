mod commands;
mod core;
mod ui;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::core::context::AppContext;
use crate::core::error::CliError;

const LOG_ENV: &str = "MAGNET_LOG";

#[derive(Parser)]
#[command(name = "magnet")]
#[command(about = "Verify and install tool servers from mcp-magnet deep links", long_about = None)]
#[command(version)]
struct Cli {
    /// Link scheme to accept (overrides the installer config)
    #[arg(long, global = true)]
    scheme: Option<String>,

    /// Installer config file [default: ~/.config/magnet/config.toml]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a deep link and run the installer wizard
    #[command(alias = "install")]
    Open(commands::open::OpenCommand),
    /// Resolve a deep link and print what it would install
    Inspect(commands::inspect::InspectCommand),
    /// Build a deep link from a manifest file
    Link(commands::link::LinkCommand),
    /// Turn a VS Code MCP install link into a deep link
    ConvertVscode(commands::convert::ConvertCommand),
    /// Print the manifest JSON Schema
    Schema(commands::schema::SchemaCommand),
    /// List client applications and enable or disable them
    Clients(commands::clients::ClientsCommand),
}

// Logs go to stderr so they never interleave with prompts on stdout
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = AppContext::load(cli.config, cli.scheme)
        .map_err(|e| CliError::Config(format!("{:#}", e)))?;

    match cli.command {
        Commands::Open(cmd) => cmd.execute(&ctx).await,
        Commands::Inspect(cmd) => cmd.execute(&ctx).await,
        Commands::Link(cmd) => cmd.execute(&ctx),
        Commands::ConvertVscode(cmd) => cmd.execute(&ctx),
        Commands::Schema(cmd) => cmd.execute(),
        Commands::Clients(cmd) => cmd.execute(&ctx).await,
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        match err.downcast::<CliError>() {
            Ok(cli_err) => cli_err.render(),
            Err(other) => CliError::Other(other).render(),
        }
        std::process::exit(1);
    }
}
