//! Per-release overrides.

use serde::{Deserialize, Serialize};

/// Overrides for one release line (keyed by release name in `releases:`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseConfig {
    /// Python version instead of the built-in release default
    #[serde(default)]
    pub python_version: Option<String>,

    /// Platform git ref to build when no branch is given
    /// (e.g. "open-release/sumac.master")
    #[serde(default)]
    pub platform_branch: Option<String>,

    /// Notes API ref for this release
    #[serde(default)]
    pub notes_branch: Option<String>,
}
