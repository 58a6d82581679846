//! # Build Configuration
//!
//! Optional `lehrer.yaml` holding registry coordinates, per-release and
//! per-deployment overrides, and engine settings.
//!
//! ## Resolution
//!
//! 1. `--config <path>` or `LEHRER_CONFIG` (must exist)
//! 2. `./lehrer.yaml` when present
//! 3. Built-in defaults
//!
//! Command-line flags override config values; config values override the
//! built-in defaults.
//!
//! ## Example
//!
//! ```yaml
//! registry:
//!   host: ghcr.io
//!   platform_repository: mitodl/openedx-platform
//! releases:
//!   sumac:
//!     python_version: "3.11"
//!     platform_branch: open-release/sumac.master
//! deployments:
//!   mitxonline:
//!     theme_repo: https://github.com/mitodl/mitxonline-theme
//!     theme_branch: main
//! engine:
//!   platform: linux/amd64
//! ```

mod deployment;
mod engine;
mod registry;
mod release;

pub use deployment::DeploymentConfig;
pub use engine::EngineConfig;
pub use registry::RegistryConfig;
pub use release::ReleaseConfig;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::domain::release::default_python_version;
use crate::error::ConfigError;

/// Name of the config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "lehrer.yaml";

/// Root of `lehrer.yaml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LehrerConfig {
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Overrides keyed by release name
    #[serde(default)]
    pub releases: BTreeMap<String, ReleaseConfig>,

    /// Settings keyed by deployment name
    #[serde(default)]
    pub deployments: BTreeMap<String, DeploymentConfig>,

    #[serde(default)]
    pub engine: EngineConfig,
}

impl LehrerConfig {
    /// Load the config from an explicit path, `./lehrer.yaml`, or defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(ConfigError::FileNotFound {
                        path: path.display().to_string(),
                    });
                }
                Self::from_file(path)
            }
            None => {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                if local.is_file() {
                    Self::from_file(&local)
                } else {
                    debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    Ok(Self::default())
                }
            }
        }
    }

    /// Parse one YAML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config = Self::from_yaml(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        // An empty file is a valid, all-defaults config
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    pub fn release(&self, release_name: &str) -> Option<&ReleaseConfig> {
        self.releases.get(release_name)
    }

    pub fn deployment(&self, deployment_name: &str) -> Option<&DeploymentConfig> {
        self.deployments.get(deployment_name)
    }

    /// Configured Python version for a release, else the built-in default
    pub fn python_version_for(&self, release_name: &str) -> String {
        self.release(release_name)
            .and_then(|r| r.python_version.clone())
            .unwrap_or_else(|| default_python_version(release_name).to_string())
    }

    /// Configured platform ref for a release
    pub fn platform_branch_for(&self, release_name: &str) -> Option<&str> {
        self.release(release_name)
            .and_then(|r| r.platform_branch.as_deref())
    }

    /// Configured notes ref for a release, else the release name itself
    pub fn notes_branch_for<'a>(&'a self, release_name: &'a str) -> &'a str {
        self.release(release_name)
            .and_then(|r| r.notes_branch.as_deref())
            .unwrap_or(release_name)
    }
}
