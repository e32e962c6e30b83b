use anyhow::Result;
use clap::Args;
use magnet::application::{
    CommitError, InstallOutcome, InstallerWizard, RefreshMode, TargetStatus, WizardError,
};
use magnet::domain::ports::ShellEvent;
use magnet::domain::security::VerificationOutcome;
use magnet::domain::wizard::{env_form, InstallTarget, Step};
use magnet_manifest::EnvConfig;
use std::path::{Path, PathBuf};
use tracing::info;

use super::{answered, resolve_link};
use crate::core::context::AppContext;
use crate::core::error::CliError;
use crate::ui::components::Spinner;
use crate::ui::{summary, Icon, Theme};

#[derive(Args, Debug)]
pub struct OpenCommand {
    /// The deep link, e.g. mcp-magnet://install?manifest=...
    pub url: String,

    /// Do not offer to restart clients after installing
    #[arg(long)]
    pub no_refresh: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Nav {
    Next,
    Back,
    Quit,
}

enum Flow {
    Continue,
    Quit,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Global,
    Project,
    Both,
}

impl OpenCommand {
    pub async fn execute(self, ctx: &AppContext) -> Result<()> {
        cliclack::intro(console::style(format!("{} magnet", Icon::Magnet)).bold())?;

        let link = resolve_link(ctx, &self.url).await?;
        if let VerificationOutcome::Failed(reason) = &link.trust {
            cliclack::outro_cancel(Theme::trust(&link.trust))?;
            return Err(CliError::Untrusted(reason.clone()).into());
        }

        let clients = ctx.clients()?;
        if clients.is_empty() {
            return Err(CliError::Config(
                "every client is disabled; enable one with `magnet clients --enable <id>`".into(),
            )
            .into());
        }

        let wizard = match InstallerWizard::new(link, clients, ctx.shell.clone(), ctx.platform.os_type).await {
            Ok(wizard) => wizard,
            Err(WizardError::Untrusted(reason)) => return Err(CliError::Untrusted(reason).into()),
            Err(e) => return Err(e.into()),
        };

        loop {
            let flow = match wizard.step() {
                Step::Overview => overview(&wizard)?,
                Step::EnvConfig => env_config(&wizard)?,
                Step::AppSelection => app_selection(&wizard)?,
                Step::RuntimeCheck => runtime_check(&wizard).await?,
                Step::ConfigConfirmation => confirmation(&wizard).await?,
                Step::Completion => completion(&wizard, self.no_refresh).await?,
            };

            match flow {
                Flow::Continue => {}
                Flow::Done => return Ok(()),
                Flow::Quit => {
                    wizard.close();
                    cliclack::outro_cancel("Nothing was written")?;
                    return Ok(());
                }
            }
        }
    }
}

fn navigate(prompt: &str, next_label: &str, allow_back: bool) -> Result<Nav, CliError> {
    let mut select = cliclack::select(prompt).item(Nav::Next, next_label, "");
    if allow_back {
        select = select.item(Nav::Back, "Back", "");
    }
    select = select.item(Nav::Quit, "Cancel", "nothing is written");
    answered(select.interact())
}

// Applies a navigation choice; `Next` is left to the caller
fn follow(wizard: &InstallerWizard, nav: Nav) -> Result<Option<Flow>> {
    match nav {
        Nav::Next => Ok(None),
        Nav::Back => {
            wizard.back()?;
            Ok(Some(Flow::Continue))
        }
        Nav::Quit => Ok(Some(Flow::Quit)),
    }
}

fn overview(wizard: &InstallerWizard) -> Result<Flow> {
    cliclack::note(
        "Install tool server",
        summary::overview(wizard.manifest(), wizard.trust()),
    )?;

    if let Some(permissions) = wizard.permission_summary() {
        cliclack::note("Permissions", summary::permissions(&permissions))?;
    }
    if !wizard.trust().is_verified() {
        cliclack::log::warning(
            "This link is not signed. Only continue if you trust where it came from.",
        )?;
    }

    if let Some(flow) = follow(wizard, navigate("Continue?", "Continue", false)?)? {
        return Ok(flow);
    }
    wizard.next()?;
    Ok(Flow::Continue)
}

fn env_config(wizard: &InstallerWizard) -> Result<Flow> {
    let entries: Vec<(String, EnvConfig)> = wizard
        .manifest()
        .env_entries()
        .map(|(key, config)| (key.clone(), config.clone()))
        .collect();

    cliclack::log::step("Configure environment variables")?;
    let mut values = wizard.env();
    for (key, config) in &entries {
        let current = values.get(key).cloned().unwrap_or_default();
        let value = ask_env_value(key, config, &current)?;
        values.insert(key.clone(), value);
    }

    if let Some(flow) = follow(wizard, navigate("Save these values?", "Continue", true)?)? {
        return Ok(flow);
    }

    match wizard.submit_env(values) {
        Ok(_) => Ok(Flow::Continue),
        Err(WizardError::EnvForm(errors)) => {
            for error in &errors.errors {
                cliclack::log::error(format!("{}: {}", error.key, error.message))?;
            }
            Ok(Flow::Continue)
        }
        Err(e) => Err(e.into()),
    }
}

fn ask_env_value(key: &str, config: &EnvConfig, current: &str) -> Result<String, CliError> {
    let label = env_form::label(key, config);
    let prompt = if label == key {
        Theme::bold(key)
    } else {
        format!("{} {}", Theme::bold(key), Theme::muted(label))
    };

    match config {
        EnvConfig::Boolean { .. } => {
            let enabled = answered(
                cliclack::confirm(prompt)
                    .initial_value(current == "true")
                    .interact(),
            )?;
            Ok(enabled.to_string())
        }
        EnvConfig::Select { options, .. } => {
            let mut select = cliclack::select(prompt);
            for option in options {
                select = select.item(option.value.clone(), &option.label, "");
            }
            if !current.is_empty() {
                select = select.initial_value(current.to_string());
            }
            answered(select.interact())
        }
        EnvConfig::Text { options, .. } => {
            let suggestions = options.as_deref().unwrap_or_default();
            if !suggestions.is_empty() {
                let mut select = cliclack::select(prompt.clone());
                for option in suggestions {
                    select = select.item(Some(option.value.clone()), &option.label, "");
                }
                select = select.item(None, "Something else", "type a value");
                if let Some(choice) = answered(select.interact())? {
                    return Ok(choice);
                }
            }

            let mut input = cliclack::input(prompt).required(config.is_required());
            if !current.is_empty() {
                input = input.default_input(current);
            }
            answered(input.interact::<String>())
        }
    }
}

fn app_selection(wizard: &InstallerWizard) -> Result<Flow> {
    let clients = wizard.clients();
    let selected: Vec<String> = wizard
        .installs()
        .apps()
        .into_iter()
        .map(str::to_string)
        .collect();

    let mut multiselect = cliclack::multiselect("Install into which applications?")
        .initial_values(selected)
        .required(true);
    for client in &clients {
        let hint = if client.supports_projects {
            "global or per project"
        } else {
            ""
        };
        multiselect = multiselect.item(client.id.clone(), &client.name, hint);
    }
    let chosen = answered(multiselect.interact())?;

    for client in &clients {
        let wanted = chosen.contains(&client.id);
        if wanted != wizard.installs().is_app_selected(&client.id) {
            wizard.toggle_app(&client.id)?;
        }
        if wanted && client.supports_projects {
            choose_scope(wizard, &client.id, &client.name)?;
        }
    }

    if let Some(flow) = follow(wizard, navigate("Continue?", "Continue", true)?)? {
        return Ok(flow);
    }
    match wizard.next() {
        Ok(_) => Ok(Flow::Continue),
        Err(WizardError::EmptySelection) => {
            cliclack::log::error("Select at least one application.")?;
            Ok(Flow::Continue)
        }
        Err(e) => Err(e.into()),
    }
}

fn choose_scope(wizard: &InstallerWizard, app_id: &str, name: &str) -> Result<()> {
    let scope = answered(
        cliclack::select(format!("Where should {} pick it up?", name))
            .item(Scope::Global, "Globally", "every workspace")
            .item(Scope::Project, "In a project", "one directory")
            .item(Scope::Both, "Both", "")
            .interact(),
    )?;

    let has_global = wizard.installs().contains(&InstallTarget::global(app_id));
    let wants_global = scope != Scope::Project;
    if has_global != wants_global {
        wizard.toggle_global(app_id)?;
    }

    if scope != Scope::Global {
        let path: String = answered(
            cliclack::input("Project directory")
                .placeholder(".")
                .validate(|input: &String| {
                    if Path::new(input).is_dir() {
                        Ok(())
                    } else {
                        Err("not an existing directory")
                    }
                })
                .interact(),
        )?;
        let path = std::fs::canonicalize(&path).unwrap_or_else(|_| PathBuf::from(&path));
        if !wizard.add_project(app_id, path.clone())? {
            cliclack::log::warning(format!("{} is already selected", path.display()))?;
        }
    }
    Ok(())
}

async fn runtime_check(wizard: &InstallerWizard) -> Result<Flow> {
    let Some(runtime) = wizard.runtime_state().runtime else {
        wizard.next()?;
        return Ok(Flow::Continue);
    };

    cliclack::log::warning(format!(
        "{} is required to run this server but was not found.",
        runtime.name()
    ))?;

    let Some(command) = wizard.planned_runtime_install().await else {
        cliclack::log::info(format!(
            "Install it manually: {}",
            Theme::primary(runtime.install_instruction_url())
        ))?;
        if let Some(flow) = follow(wizard, navigate("Continue without it?", "Continue", true)?)? {
            return Ok(flow);
        }
        wizard.next()?;
        return Ok(Flow::Continue);
    };

    let install = answered(
        cliclack::confirm(format!("Install {} now? ({})", runtime.name(), Theme::muted(command)))
            .initial_value(true)
            .interact(),
    )?;
    if !install {
        if let Some(flow) = follow(wizard, navigate("Continue without it?", "Continue", true)?)? {
            return Ok(flow);
        }
        wizard.next()?;
        return Ok(Flow::Continue);
    }

    let spinner = Spinner::new(format!("Installing {}", runtime.name()));
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                ShellEvent::Stdout { line } | ShellEvent::Stderr { line } => {
                    crate::ui::println(Theme::muted(line));
                }
                ShellEvent::Error { message } => crate::ui::println(Theme::error(message)),
                ShellEvent::Started { .. } | ShellEvent::Finished { .. } => {}
            }
        }
    });
    let outcome = wizard.install_runtime(tx).await;
    let _ = printer.await;

    match outcome {
        Some(InstallOutcome::Installed) => {
            spinner.success(format!("{} installed", runtime.name()));
            wizard.next()?;
            Ok(Flow::Continue)
        }
        Some(InstallOutcome::StillMissing { code }) => {
            spinner.fail(format!(
                "{} still not detected (exit code {})",
                runtime.name(),
                code.map(|c| c.to_string()).unwrap_or_else(|| "none".into())
            ));
            Ok(Flow::Continue)
        }
        Some(InstallOutcome::Manual { instructions_url }) => {
            spinner.fail(format!("Install it manually: {}", instructions_url));
            Ok(Flow::Continue)
        }
        None => {
            wizard.next()?;
            Ok(Flow::Continue)
        }
    }
}

async fn confirmation(wizard: &InstallerWizard) -> Result<Flow> {
    let name = &wizard.manifest().name;
    cliclack::note("Configuration", summary::server_config(name, &wizard.pending_config()))?;

    let mut targets = Vec::new();
    for (target, path) in wizard.config_targets().await {
        let path = match path {
            Ok(path) => path.display().to_string(),
            Err(e) => Theme::error(e),
        };
        targets.push(format!("{} {} → {}", Icon::File, target, Theme::muted(path)));
    }
    cliclack::note("Files to update", targets.join("\n"))?;

    if let Some(flow) = follow(wizard, navigate("Write the configuration?", "Write", true)?)? {
        return Ok(flow);
    }

    let report = match wizard.commit().await {
        Ok(report) => report,
        Err(
            e @ (CommitError::UnknownClient(_)
            | CommitError::UnsupportedOperation { .. }
            | CommitError::EmptySelection),
        ) => {
            cliclack::log::error(format!("Nothing was written: {}", e))?;
            return Ok(Flow::Continue);
        }
        Err(e) => return Err(e.into()),
    };
    info!(
        targets = report.results.len(),
        complete = report.is_complete(),
        "configuration written"
    );

    for (target, status) in &report.results {
        match status {
            TargetStatus::Written(path) => cliclack::log::success(format!(
                "{} {}",
                target,
                Theme::muted(path.display())
            ))?,
            TargetStatus::WriteFailed(message) => {
                cliclack::log::error(format!("{}: {}", target, message))?
            }
            TargetStatus::NotAttempted => {
                cliclack::log::remark(format!("{}: skipped", target))?
            }
        }
    }
    if !report.is_complete() {
        cliclack::log::warning("Some files were not updated. Fix the problem and write again.")?;
    }
    Ok(Flow::Continue)
}

async fn completion(wizard: &InstallerWizard, no_refresh: bool) -> Result<Flow> {
    for action in wizard.completion_actions() {
        match action.refresh {
            RefreshMode::Automatic if !no_refresh => {
                let restart = answered(
                    cliclack::confirm(format!("Restart {} to load the server?", action.client.name))
                        .initial_value(true)
                        .interact(),
                )?;
                if restart {
                    let spinner = Spinner::new(format!("Restarting {}", action.client.name));
                    match wizard.refresh(&action.client.id).await {
                        Ok(()) => spinner.success(format!("{} restarted", action.client.name)),
                        Err(e) => spinner.fail(e.to_string()),
                    }
                }
            }
            RefreshMode::Automatic => {}
            RefreshMode::Manual(instructions) => {
                cliclack::log::info(format!("{}: {}", action.client.name, instructions))?
            }
            RefreshMode::Nothing => {}
        }
    }

    cliclack::outro(format!(
        "{} {} installed",
        Theme::success(Icon::Check),
        wizard.manifest().title()
    ))?;
    wizard.close();
    Ok(Flow::Done)
}
