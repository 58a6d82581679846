//! Registry configuration for published images.

use serde::{Deserialize, Serialize};

/// Where the platform and companion images are pushed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Registry host (e.g., "ghcr.io", "docker.io")
    #[serde(default = "default_registry_host")]
    pub host: String,

    /// Repository of the platform image
    #[serde(default = "default_platform_repository")]
    pub platform_repository: String,

    /// Repository of the codejail service image
    #[serde(default = "default_codejail_repository")]
    pub codejail_repository: String,

    /// Repository of the notes service image
    #[serde(default = "default_notes_repository")]
    pub notes_repository: String,

    /// Default registry username; the password is never stored in config
    #[serde(default)]
    pub username: Option<String>,
}

fn default_registry_host() -> String {
    "ghcr.io".to_string()
}

fn default_platform_repository() -> String {
    "mitodl/openedx-platform".to_string()
}

fn default_codejail_repository() -> String {
    "mitodl/codejail".to_string()
}

fn default_notes_repository() -> String {
    "mitodl/openedx-notes".to_string()
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            host: default_registry_host(),
            platform_repository: default_platform_repository(),
            codejail_repository: default_codejail_repository(),
            notes_repository: default_notes_repository(),
            username: None,
        }
    }
}
