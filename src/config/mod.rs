// ABOUTME: Configuration types and parsing for siteswap.yml.
// ABOUTME: Handles YAML parsing, discovery, validation and per-site update settings.

mod deserialize;
mod host;
mod init;

pub use host::HostConfig;
pub use init::init_config;

use crate::error::{Error, Result};
use crate::host::CommandHost;
use crate::types::{ArtifactSource, ServiceName};
use crate::update::{DEFAULT_FETCH_TIMEOUT, UpdateConfig};
use deserialize::deserialize_artifact_option;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "siteswap.yml";
pub const CONFIG_FILENAME_ALT: &str = "siteswap.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".siteswap/config.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub snapshot_root: Option<PathBuf>,

    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    pub host: HostConfig,

    pub sites: BTreeMap<ServiceName, SiteConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    pub root: PathBuf,

    #[serde(default, deserialize_with = "deserialize_artifact_option")]
    pub artifact: Option<ArtifactSource>,

    /// Overrides the top-level `snapshot_root` for this site.
    #[serde(default)]
    pub snapshot_root: Option<PathBuf>,
}

fn default_timeout() -> Duration {
    DEFAULT_FETCH_TIMEOUT
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    fn validate(&self) -> Result<()> {
        if self.sites.is_empty() {
            return Err(Error::InvalidConfig(
                "at least one site is required".to_string(),
            ));
        }

        for (name, site) in &self.sites {
            if !site.root.is_absolute() {
                return Err(Error::InvalidConfig(format!(
                    "root of site {} must be an absolute path: {}",
                    name,
                    site.root.display()
                )));
            }
            if site.root.parent().is_none() {
                return Err(Error::InvalidConfig(format!(
                    "root of site {} cannot be the filesystem root",
                    name
                )));
            }
        }

        // A snapshot inside any site root would be copied into itself or
        // overlaid by that site's artifacts.
        for name in self.sites.keys() {
            let Some(dir) = self.snapshot_root_for(name) else {
                continue;
            };
            if let Some((owner, _)) = self
                .sites
                .iter()
                .find(|(_, site)| dir.starts_with(&site.root))
            {
                return Err(Error::InvalidConfig(format!(
                    "snapshot directory {} of site {} is inside the root of site {}",
                    dir.display(),
                    name,
                    owner
                )));
            }
        }

        Ok(())
    }

    pub fn site(&self, name: &ServiceName) -> Result<&SiteConfig> {
        self.sites
            .get(name)
            .ok_or_else(|| Error::UnknownSite(name.to_string()))
    }

    /// Snapshot directory for a site, if configured anywhere.
    pub fn snapshot_root_for(&self, name: &ServiceName) -> Option<PathBuf> {
        self.sites
            .get(name)
            .and_then(|site| site.snapshot_root.clone())
            .or_else(|| self.snapshot_root.clone())
    }

    /// Directory holding the snapshot slot and run lock of a site.
    ///
    /// Falls back to the parent of the site root.
    pub fn snapshot_dir(&self, name: &ServiceName) -> Result<PathBuf> {
        let site = self.site(name)?;
        self.snapshot_root_for(name)
            .or_else(|| site.root.parent().map(Path::to_path_buf))
            .ok_or_else(|| Error::InvalidConfig(format!("site {} has no parent directory", name)))
    }

    /// Build the per-call settings for updating `name`.
    ///
    /// `artifact` overrides the site's configured artifact.
    pub fn update_config(
        &self,
        name: &ServiceName,
        artifact: Option<ArtifactSource>,
        force: bool,
    ) -> Result<UpdateConfig> {
        let site = self.site(name)?;
        let artifact = artifact
            .or_else(|| site.artifact.clone())
            .ok_or_else(|| Error::NoArtifact(name.to_string()))?;

        let mut update = UpdateConfig::new(name.clone(), artifact)
            .timeout(self.timeout)
            .force(force);
        if let Some(dir) = self.snapshot_root_for(name) {
            update = update.snapshot_root(dir);
        }
        Ok(update)
    }

    /// Hosting controller driven by the `host` commands.
    pub fn command_host(&self) -> CommandHost {
        CommandHost::new(
            &self.host,
            self.sites
                .iter()
                .map(|(name, site)| (name.clone(), site.root.clone())),
        )
    }
}
