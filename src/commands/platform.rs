//! `build-platform`: compose the full platform plan

use anyhow::Result;
use tracing::info;

use super::io;
use crate::cli::{OutputArgs, PlatformArgs};
use crate::config::LehrerConfig;
use crate::domain::platform::PlatformBuild;
use crate::domain::Artifact;

/// Merge flags, config and built-in defaults into build parameters
///
/// Flags win over `lehrer.yaml`, which wins over the built-in defaults.
pub fn platform_build(args: &PlatformArgs, config: &LehrerConfig) -> Result<PlatformBuild> {
    let mut build = PlatformBuild::new(
        &args.deployment_name,
        &args.release_name,
        io::host_directory(&args.pip_package_lists)?,
        io::host_directory(&args.pip_package_overrides)?,
        io::host_directory(&args.custom_settings)?,
    );
    let deployment = config.deployment(&args.deployment_name);

    build.source = io::optional_host_directory(args.source.as_deref())?;
    if let Some(repo) = &args.platform_repo {
        build.platform_repo = repo.clone();
    }
    if let Some(branch) = args
        .platform_branch
        .as_deref()
        .or_else(|| config.platform_branch_for(&args.release_name))
    {
        build.platform_branch = branch.to_string();
    }

    build.theme_source = io::optional_host_directory(args.theme_source.as_deref())?;
    build.theme_repo = args
        .theme_repo
        .clone()
        .or_else(|| deployment.and_then(|d| d.theme_repo.clone()));
    build.theme_branch = args
        .theme_branch
        .clone()
        .or_else(|| deployment.and_then(|d| d.theme_branch.clone()));

    build.python_version = Some(
        args.python_version
            .clone()
            .unwrap_or_else(|| config.python_version_for(&args.release_name)),
    );
    build.node_version = args.node_version.clone();
    build.locale_version = args.locale_version.clone();

    if let Some(repo) = args
        .translations_repo
        .clone()
        .or_else(|| deployment.and_then(|d| d.translations_repo.clone()))
    {
        build.translations_repo = repo;
    }
    if let Some(branch) = args
        .translations_branch
        .clone()
        .or_else(|| deployment.and_then(|d| d.translations_branch.clone()))
    {
        build.translations_branch = branch;
    }

    build.include_locales = args.include_locales;
    build.tutor_version = args.tutor_version.clone();
    build.app_user_id = args.app_user_id;
    Ok(build)
}

pub async fn execute(args: PlatformArgs, output: OutputArgs, config: &LehrerConfig) -> Result<()> {
    let build = platform_build(&args, config)?;

    for stage in build.stages() {
        info!("{} {}", stage.emoji(), stage.name());
    }
    let container = build.plan()?;
    info!(
        "Platform plan for {}/{}: python {}, {} operations, digest {}",
        build.deployment_name,
        build.release_name,
        build.python_version(),
        container.ops.len(),
        container.digest()
    );

    io::write_artifact(&Artifact::Container(container), output.output.as_deref()).await
}
