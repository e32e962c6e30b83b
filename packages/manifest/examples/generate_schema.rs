use magnet_manifest::Manifest;

fn main() -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(&Manifest::json_schema())?);
    Ok(())
}
