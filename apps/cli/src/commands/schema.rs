use anyhow::Result;
use clap::Args;
use magnet_manifest::Manifest;

#[derive(Args, Debug)]
pub struct SchemaCommand {}

impl SchemaCommand {
    pub fn execute(self) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(&Manifest::json_schema())?);
        Ok(())
    }
}
