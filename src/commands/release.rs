//! `release`: build and publish platform, codejail and notes under shared tags

use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

use super::io;
use super::platform::platform_build;
use super::publish::{image_refs, registry_client, registry_host};
use super::services::{codejail_plan, notes_plan};
use crate::cli::{PlatformArgs, RegistryArgs};
use crate::config::LehrerConfig;
use crate::infrastructure::ContainerEngine;
use crate::observability::{EventMetadata, StepStatus};
use crate::services::{BuildService, ReleaseEntry, ReleaseService, ReleaseTarget};

/// Flags of `release` beyond the platform build inputs
#[derive(Debug, Clone)]
pub struct ReleaseOptions {
    pub tags: Vec<String>,
    pub codejail_config: PathBuf,
    pub notes_config: PathBuf,
    pub skip_codejail: bool,
    pub skip_notes: bool,
}

/// Compose every plan of the release before anything is built
///
/// Entries come back in release order: platform, codejail, notes. Missing
/// inputs for any image fail the release up front.
pub fn release_entries(
    platform: &PlatformArgs,
    options: &ReleaseOptions,
    registry: &str,
    config: &LehrerConfig,
) -> Result<Vec<ReleaseEntry>> {
    let release_name = &platform.release_name;
    let build = platform_build(platform, config)?;
    let stages: Vec<String> = build.stages().iter().map(|s| s.name().to_string()).collect();

    let mut entries = vec![ReleaseEntry::Publish(
        ReleaseTarget::new(
            "platform",
            build.plan()?,
            image_refs(registry, &config.registry.platform_repository, &options.tags)?,
        )
        .with_stages(stages),
    )];

    entries.push(if options.skip_codejail {
        ReleaseEntry::Skip("codejail".to_string())
    } else {
        ReleaseEntry::Publish(ReleaseTarget::new(
            "codejail",
            codejail_plan(release_name, None, &options.codejail_config, config)?,
            image_refs(registry, &config.registry.codejail_repository, &options.tags)?,
        ))
    });

    entries.push(if options.skip_notes {
        ReleaseEntry::Skip("notes".to_string())
    } else {
        ReleaseEntry::Publish(ReleaseTarget::new(
            "notes",
            notes_plan(release_name, None, &options.notes_config, config)?,
            image_refs(registry, &config.registry.notes_repository, &options.tags)?,
        ))
    });

    Ok(entries)
}

pub async fn execute(
    platform: PlatformArgs,
    options: ReleaseOptions,
    registry: RegistryArgs,
    config: &LehrerConfig,
) -> Result<()> {
    let host = registry_host(&registry, config);
    let entries = release_entries(&platform, &options, &host, config)?;

    let engine = ContainerEngine::new(&config.engine);
    let client = registry_client(&registry, config, &engine)?;
    let builds = BuildService::new(engine);

    let metadata = EventMetadata::new("release")
        .with_deployment(&platform.deployment_name)
        .with_release(&platform.release_name);
    let report = ReleaseService::new(&builds, &client)
        .execute(metadata, entries)
        .await?;
    let skipped = report
        .steps
        .iter()
        .filter(|step| step.status == StepStatus::Skipped)
        .count();
    info!(
        "Release {} published {} image(s), {} skipped",
        platform.release_name,
        report.published.len(),
        skipped
    );

    let mut lines = String::new();
    for image in &report.published {
        lines.push_str(&format!("{}\n", image));
    }
    io::write_stdout(&lines).await
}
