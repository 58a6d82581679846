//! `export`: copy a file or directory artifact to the host

use anyhow::{Context, Result};
use std::path::PathBuf;

use super::io;
use crate::config::LehrerConfig;
use crate::infrastructure::ContainerEngine;
use crate::observability::EventMetadata;
use crate::services::BuildService;
use crate::ui;

pub async fn execute(input: String, dest: PathBuf, config: &LehrerConfig) -> Result<()> {
    let artifact = io::read_artifact(&input).await?;
    tokio::fs::create_dir_all(&dest)
        .await
        .with_context(|| format!("Failed to create {}", dest.display()))?;

    let service = BuildService::new(ContainerEngine::new(&config.engine));
    service
        .export(&artifact, &dest, EventMetadata::new("export"))
        .await?;

    ui::print_success(&format!("Exported {} to {}", artifact.kind(), dest.display()));
    Ok(())
}
