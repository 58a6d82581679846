//! Centralized error types for lehrer
//!
//! Uses thiserror for typed errors that can be matched on,
//! while still being compatible with anyhow for propagation.

use thiserror::Error;

/// Errors raised while composing a build plan
#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Must provide either {local} or both {repo} and {branch}")]
    MissingSource {
        local: &'static str,
        repo: &'static str,
        branch: &'static str,
    },

    #[error("app user may not be root")]
    RootAppUser,

    #[error("Expected a {expected} artifact, got a {actual} artifact")]
    WrongArtifact {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Invalid image reference {reference}: {reason}")]
    InvalidImageRef { reference: String, reason: String },

    #[error("Invalid environment assignment {0}. Expected NAME=VALUE")]
    InvalidEnvAssignment(String),

    #[error("Failed to read artifact: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Container engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Container engine `{binary}` not found. Install docker with buildx or set DOCKER_BIN")]
    NotInstalled { binary: String },

    #[error("Build of {target} failed with exit code {code:?}")]
    BuildFailed { target: String, code: Option<i32> },

    #[error("Container for {target} exited with code {code:?}")]
    RunFailed { target: String, code: Option<i32> },

    #[error("Artifact already lives on the host at {path}")]
    HostArtifact { path: String },

    #[error("Build produced no image id")]
    MissingImageId,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Container registry errors
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Authentication to {registry} failed: {message}")]
    AuthFailed { registry: String, message: String },

    #[error("Push of {reference} failed: {message}")]
    PushFailed { reference: String, message: String },

    #[error("Tagging {reference} failed: {message}")]
    TagFailed { reference: String, message: String },

    #[error("Registry password given without a username")]
    MissingUsername,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to parse config {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("Path does not exist: {path}")]
    MissingPath { path: String },

    #[error("Expected a directory at {path}")]
    NotADirectory { path: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_source_display() {
        let err = PlanError::MissingSource {
            local: "source",
            repo: "edx_platform_git_repo",
            branch: "edx_platform_git_branch",
        };
        assert_eq!(
            err.to_string(),
            "Must provide either source or both edx_platform_git_repo and edx_platform_git_branch"
        );
    }

    #[test]
    fn test_errors_convert_to_anyhow() {
        let err: anyhow::Error = PlanError::RootAppUser.into();
        assert!(err.downcast_ref::<PlanError>().is_some());
        assert!(err.to_string().contains("may not be root"));
    }

    #[test]
    fn test_engine_not_installed_mentions_override() {
        let err = EngineError::NotInstalled {
            binary: "docker".into(),
        };
        assert!(err.to_string().contains("DOCKER_BIN"));
    }
}
