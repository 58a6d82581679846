//! `publish-platform`: build a container artifact and push it

use anyhow::Result;

use super::io;
use crate::cli::RegistryArgs;
use crate::config::LehrerConfig;
use crate::domain::ImageRef;
use crate::infrastructure::{ContainerEngine, RegistryClient, RegistryCredentials};
use crate::observability::EventMetadata;
use crate::services::BuildService;
use crate::ui;

/// Registry host from the flag, else config
pub fn registry_host(args: &RegistryArgs, config: &LehrerConfig) -> String {
    args.registry
        .clone()
        .unwrap_or_else(|| config.registry.host.clone())
}

/// Registry client for the engine binary with flag/env/config credentials
pub fn registry_client(
    args: &RegistryArgs,
    config: &LehrerConfig,
    engine: &ContainerEngine,
) -> Result<RegistryClient> {
    let username = args
        .username
        .clone()
        .or_else(|| config.registry.username.clone());
    let credentials = RegistryCredentials::from_parts(username, args.password.clone())?;
    Ok(RegistryClient::new(engine.binary(), credentials))
}

/// One reference per tag
pub fn image_refs(registry: &str, repository: &str, tags: &[String]) -> Result<Vec<ImageRef>> {
    tags.iter()
        .map(|tag| Ok(ImageRef::new(registry, repository, tag.as_str())?))
        .collect()
}

pub async fn execute(
    input: String,
    repository: Option<String>,
    tags: Vec<String>,
    registry: RegistryArgs,
    config: &LehrerConfig,
) -> Result<()> {
    let container = io::read_artifact(&input).await?.into_container()?;

    let host = registry_host(&registry, config);
    let repository = repository.unwrap_or_else(|| config.registry.platform_repository.clone());
    let images = image_refs(&host, &repository, &tags)?;

    let engine = ContainerEngine::new(&config.engine);
    let client = registry_client(&registry, config, &engine)?;
    let service = BuildService::new(engine);

    ui::print_header(&format!("Publish: {}/{}", host, repository));
    let pushed = service
        .publish(
            &container,
            EventMetadata::new(repository.clone()),
            &client,
            &images,
            Vec::new(),
        )
        .await?;

    let mut lines = String::new();
    for image in &pushed {
        lines.push_str(&format!("{}\n", image));
    }
    io::write_stdout(&lines).await
}
