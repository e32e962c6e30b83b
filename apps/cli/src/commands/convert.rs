use anyhow::Result;
use clap::Args;
use magnet::domain::deeplink::vscode::{convert_vscode_link, manifest_from_vscode_link};

use crate::core::context::AppContext;

#[derive(Args, Debug)]
pub struct ConvertCommand {
    /// VS Code MCP install link (vscode:mcp/install?...)
    pub url: String,

    /// Print the converted manifest instead of a link
    #[arg(long)]
    pub manifest: bool,
}

impl ConvertCommand {
    pub fn execute(self, ctx: &AppContext) -> Result<()> {
        if self.manifest {
            let manifest = manifest_from_vscode_link(&self.url)?;
            println!("{}", serde_json::to_string_pretty(&manifest)?);
        } else {
            println!("{}", convert_vscode_link(&self.url, &ctx.config.scheme)?);
        }
        Ok(())
    }
}
