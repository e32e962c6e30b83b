use anyhow::{Context, Result};
use magnet::application::DeepLinkService;
use magnet::domain::deeplink::DeepLinkResolver;
use magnet::domain::ports::ShellExecutor;
use magnet::domain::security::KeyCache;
use magnet::domain::{PlatformDetector, PlatformInfo};
use magnet::infrastructure::{ClientRegistry, ConfigStore, GithubKeyFetcher, InstallerConfig, ProcessShell};
use std::path::PathBuf;
use std::sync::Arc;

/// Everything a command needs: installer config, platform and the shell catalog
pub struct AppContext {
    pub store: ConfigStore,
    pub config: InstallerConfig,
    pub platform: PlatformInfo,
    pub shell: Arc<dyn ShellExecutor>,
}

impl AppContext {
    /// Load the installer config; `scheme` overrides the stored one for this run
    pub fn load(config_path: Option<PathBuf>, scheme: Option<String>) -> Result<Self> {
        let store = match config_path {
            Some(path) => ConfigStore::new(path),
            None => ConfigStore::default_location()?,
        };
        let mut config = store.load()?;
        if let Some(scheme) = scheme {
            config.scheme = scheme;
        }

        let shell = ProcessShell::new().context("Failed to load the shell command catalog")?;

        Ok(Self {
            store,
            config,
            platform: PlatformDetector::detect(),
            shell: Arc::new(shell),
        })
    }

    /// Resolver backed by a fresh key cache for this process
    pub fn link_service(&self) -> DeepLinkService {
        let fetcher = GithubKeyFetcher::with_endpoints(
            self.config.github.web_base.clone(),
            self.config.github.api_base.clone(),
        );
        let keys = KeyCache::new(Arc::new(fetcher));
        DeepLinkService::new(
            DeepLinkResolver::new(Arc::new(keys)).with_scheme(self.config.scheme.clone()),
        )
    }

    /// All known clients, enabled or not
    pub fn all_clients(&self) -> Result<ClientRegistry> {
        ClientRegistry::for_current_user(self.platform.os_type, self.shell.clone())
    }

    /// Clients the installer config leaves enabled
    pub fn clients(&self) -> Result<ClientRegistry> {
        Ok(self.all_clients()?.enabled(&self.config))
    }
}
