//! Runtime tool path resolution
//!
//! For each external tool (e.g. `docker`) we:
//! 1. Check for an environment variable `{TOOL}_BIN` (e.g. `DOCKER_BIN`)
//! 2. Fall back to PATH-based invocation if the envvar is not set
//!
//! This lets CI pin an exact binary (or swap in a docker-compatible CLI such
//! as podman) without any code change.

use std::env;
use std::path::PathBuf;

/// Tool names used by lehrer
pub mod names {
    pub const DOCKER: &str = "docker";
}

/// Environment variable consulted for a tool
fn env_var_for(tool: &str) -> String {
    format!("{}_BIN", tool.to_uppercase().replace('-', "_"))
}

/// Get the path to an external tool
///
/// Returns the value of `{TOOL}_BIN` when set, otherwise the bare tool name.
///
/// ```rust,ignore
/// // With DOCKER_BIN="/usr/bin/podman"
/// assert_eq!(get_tool_path("docker"), "/usr/bin/podman");
/// ```
pub fn get_tool_path(tool: &str) -> String {
    env::var(env_var_for(tool)).unwrap_or_else(|_| tool.to_string())
}

/// Locate a tool binary, honoring `{TOOL}_BIN` and then PATH
pub fn locate(tool: &str) -> Option<PathBuf> {
    which::which(get_tool_path(tool)).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_for() {
        assert_eq!(env_var_for("docker"), "DOCKER_BIN");
        assert_eq!(env_var_for("test-tool"), "TEST_TOOL_BIN");
    }

    #[test]
    fn test_get_tool_path_from_env() {
        env::set_var("LEHRER_FAKE_TOOL_BIN", "/custom/path/to/tool");
        assert_eq!(get_tool_path("lehrer-fake-tool"), "/custom/path/to/tool");
        env::remove_var("LEHRER_FAKE_TOOL_BIN");
    }

    #[test]
    fn test_get_tool_path_fallback() {
        env::remove_var("LEHRER_MISSING_TOOL_BIN");
        assert_eq!(get_tool_path("lehrer-missing-tool"), "lehrer-missing-tool");
    }

    #[test]
    fn test_locate_missing_tool() {
        env::remove_var("LEHRER_NOT_A_REAL_TOOL_BIN");
        assert!(locate("lehrer-not-a-real-tool").is_none());
    }
}
