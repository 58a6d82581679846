//! Per-deployment settings.

use serde::{Deserialize, Serialize};

/// Settings for one deployment (keyed by deployment name in `deployments:`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Theme repository cloned into `/openedx/themes/{deployment}`
    #[serde(default)]
    pub theme_repo: Option<String>,

    /// Theme git ref
    #[serde(default)]
    pub theme_branch: Option<String>,

    /// Translations repository passed to atlas
    #[serde(default)]
    pub translations_repo: Option<String>,

    /// Translations git ref
    #[serde(default)]
    pub translations_branch: Option<String>,
}
