use domain::ports::config_adapter::AdapterError;
use magnet_manifest::McpServerConfig;
use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::Path;
use tracing::info;

const SERVERS_KEY: &str = "mcpServers";

/// Parsed config file, or an empty object when it does not exist yet
pub async fn read_object(path: &Path) -> Result<Map<String, Value>, AdapterError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
        Err(source) => {
            return Err(AdapterError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if content.trim().is_empty() {
        return Ok(Map::new());
    }

    match serde_json::from_str(&content) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(AdapterError::Malformed {
            path: path.to_path_buf(),
            message: "top level is not a JSON object".to_string(),
        }),
        Err(e) => Err(AdapterError::Malformed {
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
    }
}

pub async fn write_object(path: &Path, object: &Map<String, Value>) -> Result<(), AdapterError> {
    let write_err = |source| AdapterError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut content = serde_json::to_string_pretty(object).map_err(|e| AdapterError::Malformed {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    content.push('\n');

    tokio::fs::write(path, content).await.map_err(write_err)
}

/// Replace `mcpServers.<name>` and keep everything else in the file.
pub async fn upsert_server(
    path: &Path,
    name: &str,
    config: &McpServerConfig,
) -> Result<(), AdapterError> {
    let mut object = read_object(path).await?;

    let servers = object
        .entry(SERVERS_KEY)
        .or_insert_with(|| Value::Object(Map::new()));
    let Value::Object(servers) = servers else {
        return Err(AdapterError::Malformed {
            path: path.to_path_buf(),
            message: format!("'{}' is not an object", SERVERS_KEY),
        });
    };

    let entry = serde_json::to_value(config).map_err(|e| AdapterError::Malformed {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    servers.insert(name.to_string(), entry);

    write_object(path, &object).await?;
    info!(server = name, path = %path.display(), "server entry written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn config(token: &str) -> McpServerConfig {
        McpServerConfig {
            command: "npx".into(),
            args: vec!["-y".into(), "pkg".into()],
            env: Some(BTreeMap::from([("TOKEN".to_string(), token.to_string())])),
        }
    }

    #[tokio::test]
    async fn test_creates_missing_file_and_parents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("mcp.json");

        upsert_server(&path, "slack", &config("a")).await.unwrap();

        let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["mcpServers"]["slack"]["command"], "npx");
        assert_eq!(written["mcpServers"]["slack"]["env"]["TOKEN"], "a");
    }

    #[tokio::test]
    async fn test_preserves_unrelated_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"theme":"dark","mcpServers":{"git":{"command":"uvx","args":["mcp-server-git"]}}}"#,
        )
        .unwrap();

        upsert_server(&path, "slack", &config("a")).await.unwrap();

        let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["theme"], "dark");
        assert_eq!(written["mcpServers"]["git"]["command"], "uvx");
        assert_eq!(written["mcpServers"]["slack"]["args"][1], "pkg");
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        upsert_server(&path, "slack", &config("a")).await.unwrap();
        let first = std::fs::read_to_string(&path).unwrap();
        upsert_server(&path, "slack", &config("a")).await.unwrap();
        let second = std::fs::read_to_string(&path).unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_rejects_non_object_servers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"mcpServers":[1,2]}"#).unwrap();

        let err = upsert_server(&path, "slack", &config("a")).await.unwrap_err();
        assert!(matches!(err, AdapterError::Malformed { .. }));
    }
}
