//! Companion service commands: `build-codejail` and `build-notes`

use anyhow::Result;
use std::path::Path;
use tracing::info;

use super::io;
use crate::cli::OutputArgs;
use crate::config::LehrerConfig;
use crate::domain::services::{self, DEFAULT_NOTES_PYTHON};
use crate::domain::{Artifact, Container};

/// Codejail plan for a release; Python follows flag, config, then release default
pub fn codejail_plan(
    release_name: &str,
    python_version: Option<String>,
    codejail_config: &Path,
    config: &LehrerConfig,
) -> Result<Container> {
    let python = python_version.unwrap_or_else(|| config.python_version_for(release_name));
    let config_dir = io::host_directory(codejail_config)?;
    Ok(services::build_codejail(release_name, Some(&python), &config_dir))
}

/// Notes plan for a release; the notes branch may be remapped in config
pub fn notes_plan(
    release_name: &str,
    python_version: Option<String>,
    notes_config: &Path,
    config: &LehrerConfig,
) -> Result<Container> {
    let python = python_version.unwrap_or_else(|| DEFAULT_NOTES_PYTHON.to_string());
    let branch = config.notes_branch_for(release_name);
    let config_dir = io::host_directory(notes_config)?;
    Ok(services::build_notes(branch, &python, &config_dir))
}

pub async fn build_codejail(
    release_name: String,
    python_version: Option<String>,
    codejail_config: &Path,
    output: OutputArgs,
    config: &LehrerConfig,
) -> Result<()> {
    let container = codejail_plan(&release_name, python_version, codejail_config, config)?;
    info!("🔒 codejail for {} on {}", release_name, container.base);
    io::write_artifact(&Artifact::Container(container), output.output.as_deref()).await
}

pub async fn build_notes(
    release_name: String,
    python_version: Option<String>,
    notes_config: &Path,
    output: OutputArgs,
    config: &LehrerConfig,
) -> Result<()> {
    let container = notes_plan(&release_name, python_version, notes_config, config)?;
    info!("📝 notes for {} on {}", release_name, container.base);
    io::write_artifact(&Artifact::Container(container), output.output.as_deref()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codejail_python_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let defaults = LehrerConfig::default();

        let plan = codejail_plan("master", None, dir.path(), &defaults).unwrap();
        assert_eq!(plan.base, "python:3.12-slim-trixie");

        let plan = codejail_plan("master", Some("3.11".into()), dir.path(), &defaults).unwrap();
        assert_eq!(plan.base, "python:3.11-slim-trixie");

        let config =
            LehrerConfig::from_yaml("releases:\n  teak:\n    python_version: \"3.12\"\n")
                .unwrap();
        let plan = codejail_plan("teak", None, dir.path(), &config).unwrap();
        assert_eq!(plan.base, "python:3.12-slim-trixie");
    }

    #[test]
    fn test_notes_branch_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let config = LehrerConfig::from_yaml(
            "releases:\n  sumac:\n    notes_branch: open-release/sumac.master\n",
        )
        .unwrap();

        let plan = notes_plan("sumac", None, dir.path(), &config).unwrap();
        assert_eq!(plan.base, "python:3.11-slim");
        assert!(plan
            .execs()
            .any(|e| e.contains(&"open-release/sumac.master".to_string())));
    }

    #[test]
    fn test_missing_config_directory() {
        let err = notes_plan(
            "master",
            None,
            Path::new("/no/such/notes_config"),
            &LehrerConfig::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("/no/such/notes_config"));
    }
}
