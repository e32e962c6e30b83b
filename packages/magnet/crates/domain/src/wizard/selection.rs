use crate::ports::config_adapter::ClientInfo;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// One place to write the server entry: an app's global config or one of its projects
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct InstallTarget {
    pub app_id: String,
    pub project: Option<PathBuf>,
}

impl InstallTarget {
    pub fn global(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            project: None,
        }
    }

    pub fn project(app_id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            app_id: app_id.into(),
            project: Some(path.into()),
        }
    }
}

impl fmt::Display for InstallTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.project {
            Some(path) => write!(f, "{} ({})", self.app_id, path.display()),
            None => write!(f, "{} (global)", self.app_id),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("{app} does not support project-level configuration")]
    ProjectsUnsupported { app: String },
}

/// Insertion-ordered set of install targets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallSelection {
    targets: Vec<InstallTarget>,
}

impl InstallSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn targets(&self) -> &[InstallTarget] {
        &self.targets
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn contains(&self, target: &InstallTarget) -> bool {
        self.targets.contains(target)
    }

    pub fn is_app_selected(&self, app_id: &str) -> bool {
        self.targets.iter().any(|target| target.app_id == app_id)
    }

    /// Distinct app ids, in selection order
    pub fn apps(&self) -> Vec<&str> {
        let mut apps: Vec<&str> = Vec::new();
        for target in &self.targets {
            if !apps.contains(&target.app_id.as_str()) {
                apps.push(&target.app_id);
            }
        }
        apps
    }

    /// Checking an app selects its global config; unchecking drops every
    /// entry for it. Returns whether the app is selected afterwards.
    pub fn toggle_app(&mut self, app_id: &str) -> bool {
        if self.is_app_selected(app_id) {
            self.targets.retain(|target| target.app_id != app_id);
            false
        } else {
            self.targets.push(InstallTarget::global(app_id));
            true
        }
    }

    pub fn toggle_global(&mut self, app_id: &str) -> bool {
        let global = InstallTarget::global(app_id);
        if self.contains(&global) {
            self.targets.retain(|target| target != &global);
            false
        } else {
            self.targets.push(global);
            true
        }
    }

    /// Returns `Ok(false)` when the project was already selected.
    pub fn add_project(
        &mut self,
        client: &ClientInfo,
        path: impl Into<PathBuf>,
    ) -> Result<bool, SelectionError> {
        if !client.supports_projects {
            return Err(SelectionError::ProjectsUnsupported {
                app: client.name.clone(),
            });
        }

        let target = InstallTarget::project(&client.id, path);
        if self.contains(&target) {
            warn!(target = %target, "project already selected");
            return Ok(false);
        }
        self.targets.push(target);
        Ok(true)
    }

    pub fn remove_project(&mut self, app_id: &str, path: &Path) -> bool {
        let before = self.targets.len();
        self.targets.retain(|target| {
            !(target.app_id == app_id && target.project.as_deref() == Some(path))
        });
        self.targets.len() != before
    }

    pub fn clear(&mut self) {
        self.targets.clear();
    }
}
