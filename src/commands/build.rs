//! `build`: realize a container artifact into the local image store

use anyhow::Result;

use super::io;
use crate::config::LehrerConfig;
use crate::infrastructure::ContainerEngine;
use crate::observability::EventMetadata;
use crate::services::BuildService;
use crate::ui;

/// Build and print the image id on stdout
pub async fn execute(input: String, tags: Vec<String>, config: &LehrerConfig) -> Result<()> {
    let container = io::read_artifact(&input).await?.into_container()?;
    let service = BuildService::new(ContainerEngine::new(&config.engine));

    let image_id = service
        .build(&container, EventMetadata::new("build"), &tags, Vec::new())
        .await?;

    for tag in &tags {
        ui::print_success(&format!("Tagged {}", tag));
    }
    io::write_stdout(&format!("{}\n", image_id)).await
}
