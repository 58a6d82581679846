//! Artifact and host-path plumbing shared by commands

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

use crate::domain::{Artifact, DirectoryRef};
use crate::error::ConfigError;

/// Read an artifact from a file, or stdin for `-`
pub async fn read_artifact(input: &str) -> Result<Artifact> {
    let text = if input == "-" {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("Failed to read artifact from stdin")?;
        text
    } else {
        tokio::fs::read_to_string(input)
            .await
            .with_context(|| format!("Failed to read artifact from {}", input))?
    };

    let artifact = Artifact::from_json(&text)
        .with_context(|| format!("Failed to parse artifact from {}", describe(input)))?;
    debug!("Read {} artifact from {}", artifact.kind(), describe(input));
    Ok(artifact)
}

/// Read an artifact from an optional JSON file
pub async fn read_optional_artifact(path: Option<&Path>) -> Result<Option<Artifact>> {
    match path {
        Some(path) => Ok(Some(read_artifact(&path.to_string_lossy()).await?)),
        None => Ok(None),
    }
}

/// Write an artifact to a file, or stdout
pub async fn write_artifact(artifact: &Artifact, output: Option<&Path>) -> Result<()> {
    let mut json = artifact.to_json()?;
    json.push('\n');

    match output {
        Some(path) => {
            tokio::fs::write(path, json)
                .await
                .with_context(|| format!("Failed to write artifact to {}", path.display()))?;
            debug!("Wrote {} artifact to {}", artifact.kind(), path.display());
        }
        None => write_stdout(&json).await?,
    }
    Ok(())
}

/// Write raw text to stdout
pub async fn write_stdout(text: &str) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(text.as_bytes())
        .await
        .context("Failed to write to stdout")?;
    stdout.flush().await.context("Failed to flush stdout")?;
    Ok(())
}

fn describe(input: &str) -> &str {
    if input == "-" {
        "stdin"
    } else {
        input
    }
}

/// Absolute path of an existing host directory
pub fn host_directory(path: &Path) -> Result<DirectoryRef, ConfigError> {
    let absolute = canonical(path)?;
    if !absolute.is_dir() {
        return Err(ConfigError::NotADirectory {
            path: path.display().to_string(),
        });
    }
    Ok(DirectoryRef::host(absolute))
}

pub fn optional_host_directory(path: Option<&Path>) -> Result<Option<DirectoryRef>, ConfigError> {
    path.map(host_directory).transpose()
}

fn canonical(path: &Path) -> Result<PathBuf, ConfigError> {
    path.canonicalize().map_err(|_| ConfigError::MissingPath {
        path: path.display().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Container;

    #[test]
    fn test_host_directory_is_absolute() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("lists");
        std::fs::create_dir(&nested).unwrap();

        match host_directory(&nested).unwrap() {
            DirectoryRef::Host { path } => {
                assert!(path.is_absolute());
                assert!(path.ends_with("lists"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_host_directory_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        assert!(matches!(
            host_directory(&missing),
            Err(ConfigError::MissingPath { .. })
        ));

        let file = dir.path().join("01-sandbox");
        std::fs::write(&file, "sandbox ALL=(ALL) NOPASSWD: ALL").unwrap();
        assert!(matches!(
            host_directory(&file),
            Err(ConfigError::NotADirectory { .. })
        ));
    }

    #[test]
    fn test_optional_host_directory() {
        assert!(optional_host_directory(None).unwrap().is_none());
        let dir = tempfile::tempdir().unwrap();
        assert!(optional_host_directory(Some(dir.path())).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_artifact_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("base.json");
        let artifact = Artifact::Container(Container::from_image("python:3.11-bookworm"));

        write_artifact(&artifact, Some(&path)).await.unwrap();
        let read = read_artifact(&path.to_string_lossy()).await.unwrap();
        assert_eq!(read, artifact);
    }

    #[tokio::test]
    async fn test_read_malformed_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{\"artifact\": \"spaceship\"}").unwrap();

        let err = read_artifact(&path.to_string_lossy()).await.unwrap_err();
        assert!(err.to_string().contains("Failed to parse artifact"));
    }
}
