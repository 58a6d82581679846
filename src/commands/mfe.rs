//! Micro-frontend commands: `build-mfe` and `watch-mfe`

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

use super::io;
use crate::cli::OutputArgs;
use crate::config::LehrerConfig;
use crate::domain::mfe::{self, MfeBuild, MfeWatch};
use crate::domain::Artifact;
use crate::infrastructure::ContainerEngine;
use crate::observability::EventMetadata;
use crate::services::BuildService;
use crate::ui;

/// Flags of `build-mfe`
#[derive(Debug, Clone)]
pub struct BuildMfeOptions {
    pub mfe_name: String,
    pub mfe_repo: String,
    pub mfe_branch: String,
    pub node_version: String,
    pub deployment_name: String,
    pub slot_config: PathBuf,
    pub enable_smoot_design: bool,
    pub enable_ai_drawer: bool,
    pub styles_file: Option<String>,
    pub env: Vec<String>,
}

/// Flags of `watch-mfe`
#[derive(Debug, Clone)]
pub struct WatchMfeOptions {
    pub mfe_source: PathBuf,
    pub slot_config: PathBuf,
    pub node_version: String,
    pub deployment_name: String,
    pub mfe_name: String,
    pub port: u16,
    pub env: Vec<String>,
}

fn parse_env(raw: &[String]) -> Result<Vec<(String, String)>> {
    raw.iter()
        .map(|assignment| Ok(mfe::parse_env_assignment(assignment)?))
        .collect()
}

pub fn mfe_build(options: &BuildMfeOptions) -> Result<MfeBuild> {
    let mut build = MfeBuild::new(
        &options.mfe_name,
        &options.mfe_repo,
        io::host_directory(&options.slot_config)?,
    );
    build.mfe_branch = options.mfe_branch.clone();
    build.node_version = options.node_version.clone();
    build.deployment_name = options.deployment_name.clone();
    build.enable_smoot_design = options.enable_smoot_design;
    build.enable_ai_drawer = options.enable_ai_drawer;
    build.styles_file = options.styles_file.clone();
    build.env = parse_env(&options.env)?;
    Ok(build)
}

pub fn mfe_watch(options: &WatchMfeOptions) -> Result<MfeWatch> {
    let mut watch = MfeWatch::new(
        io::host_directory(&options.mfe_source)?,
        io::host_directory(&options.slot_config)?,
    );
    watch.node_version = options.node_version.clone();
    watch.deployment_name = options.deployment_name.clone();
    watch.mfe_name = options.mfe_name.clone();
    watch.port = options.port;
    watch.env = parse_env(&options.env)?;
    Ok(watch)
}

/// Print the `dist` artifact, or export it when `dest` is given
pub async fn build(
    options: BuildMfeOptions,
    dest: Option<PathBuf>,
    output: OutputArgs,
    config: &LehrerConfig,
) -> Result<()> {
    let build = mfe_build(&options)?;
    let dist = Artifact::Directory(build.dist());
    info!(
        "📦 {} from {}@{} for {}",
        build.mfe_name, build.mfe_repo, build.mfe_branch, build.deployment_name
    );

    match dest {
        Some(dest) => {
            tokio::fs::create_dir_all(&dest)
                .await
                .with_context(|| format!("Failed to create {}", dest.display()))?;
            let service = BuildService::new(ContainerEngine::new(&config.engine));
            let metadata = EventMetadata::new(format!("mfe:{}", build.mfe_name))
                .with_deployment(&build.deployment_name);
            service.export(&dist, &dest, metadata).await?;
            ui::print_success(&format!("{} built into {}", build.mfe_name, dest.display()));
            Ok(())
        }
        None => io::write_artifact(&dist, output.output.as_deref()).await,
    }
}

/// Run the dev server until interrupted
pub async fn watch(options: WatchMfeOptions, config: &LehrerConfig) -> Result<()> {
    let watch = mfe_watch(&options)?;
    let service = BuildService::new(ContainerEngine::new(&config.engine));
    let metadata = EventMetadata::new(format!("mfe-watch:{}", watch.mfe_name))
        .with_deployment(&watch.deployment_name);
    service.serve(&watch.container(), metadata, watch.port).await
}
