//! Container engine settings.

use serde::{Deserialize, Serialize};

/// How builds are run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Target platform (e.g., "linux/amd64"); engine default when unset
    #[serde(default)]
    pub platform: Option<String>,

    /// BuildKit progress output: auto, plain, tty, quiet
    #[serde(default = "default_progress")]
    pub progress: String,
}

fn default_progress() -> String {
    "plain".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            platform: None,
            progress: default_progress(),
        }
    }
}
