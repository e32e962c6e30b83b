//! Runs the named commands from `commands.json` with `tokio::process`.
//!
//! Nothing outside the catalog can be executed through this type.

use async_trait::async_trait;
use domain::ports::shell::{
    CommandName, CommandOutput, ShellCommand, ShellError, ShellEvent, ShellExecutor,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

const COMMANDS_JSON: &str = include_str!("commands.json");

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    name: CommandName,
    command: String,
    args: Vec<String>,
}

/// Parse the bundled catalog
pub fn catalog() -> Result<Vec<ShellCommand>, serde_json::Error> {
    let entries: Vec<CatalogEntry> = serde_json::from_str(COMMANDS_JSON)?;
    Ok(entries
        .into_iter()
        .map(|entry| ShellCommand {
            name: entry.name,
            program: entry.command,
            args: entry.args,
        })
        .collect())
}

pub struct ProcessShell {
    commands: HashMap<CommandName, ShellCommand>,
}

impl ProcessShell {
    pub fn new() -> Result<Self, serde_json::Error> {
        Ok(Self::with_commands(catalog()?))
    }

    pub fn with_commands(commands: Vec<ShellCommand>) -> Self {
        Self {
            commands: commands
                .into_iter()
                .map(|command| (command.name, command))
                .collect(),
        }
    }

    fn lookup(&self, name: CommandName) -> Result<&ShellCommand, ShellError> {
        self.commands.get(&name).ok_or(ShellError::Unavailable(name))
    }
}

#[async_trait]
impl ShellExecutor for ProcessShell {
    fn command_details(&self, name: CommandName) -> Option<ShellCommand> {
        self.commands.get(&name).cloned()
    }

    async fn execute(&self, name: CommandName) -> Result<CommandOutput, ShellError> {
        let command = self.lookup(name)?;
        debug!(command = %command, "executing");

        let output = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| ShellError::Spawn {
                command: command.to_string(),
                message: e.to_string(),
            })?;

        Ok(CommandOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn execute_with_stream(
        &self,
        name: CommandName,
        events: UnboundedSender<ShellEvent>,
    ) -> Result<i32, ShellError> {
        let command = self.lookup(name)?;
        // Receiver gone means nobody is watching; keep running regardless
        let _ = events.send(ShellEvent::Started {
            command: command.program.clone(),
            args: command.args.clone(),
        });

        let spawned = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                let _ = events.send(ShellEvent::Error {
                    message: e.to_string(),
                });
                return Err(ShellError::Spawn {
                    command: command.to_string(),
                    message: e.to_string(),
                });
            }
        };

        let stdout = child
            .stdout
            .take()
            .map(|out| tokio::spawn(forward_lines(out, events.clone(), stdout_event)));
        let stderr = child
            .stderr
            .take()
            .map(|err| tokio::spawn(forward_lines(err, events.clone(), stderr_event)));

        let status = child.wait().await;
        for task in [stdout, stderr].into_iter().flatten() {
            let _ = task.await;
        }

        match status {
            Ok(status) => {
                let code = status.code().unwrap_or(-1);
                info!(command = %command, code, "command finished");
                let _ = events.send(ShellEvent::Finished { code });
                Ok(code)
            }
            Err(e) => {
                let _ = events.send(ShellEvent::Error {
                    message: e.to_string(),
                });
                Err(ShellError::Spawn {
                    command: command.to_string(),
                    message: e.to_string(),
                })
            }
        }
    }
}

fn stdout_event(line: String) -> ShellEvent {
    ShellEvent::Stdout { line }
}

fn stderr_event(line: String) -> ShellEvent {
    ShellEvent::Stderr { line }
}

async fn forward_lines<R>(reader: R, events: UnboundedSender<ShellEvent>, wrap: fn(String) -> ShellEvent)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if !line.is_empty() {
            let _ = events.send(wrap(line));
        }
    }
}
