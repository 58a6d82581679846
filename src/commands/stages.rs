//! Individual platform stage commands
//!
//! Each command reads a container artifact, applies one stage and writes
//! the extended plan, so stages compose with shell pipes.

use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

use super::io;
use crate::cli::{InputArgs, OutputArgs};
use crate::domain::platform::{self, Collection, DependencySet};
use crate::domain::{Artifact, Container, PlatformStage};

/// Read a container, apply `stage`, write the result
async fn transform<F>(
    stage: PlatformStage,
    input: &InputArgs,
    output: &OutputArgs,
    apply: F,
) -> Result<()>
where
    F: FnOnce(Container) -> Result<Container>,
{
    let container = io::read_artifact(&input.input).await?.into_container()?;
    let container = apply(container)?;
    info!("{} {} ({} operations)", stage.emoji(), stage.name(), container.ops.len());
    io::write_artifact(&Artifact::Container(container), output.output.as_deref()).await
}

pub async fn apt_base(python_version: String, output: OutputArgs) -> Result<()> {
    let container = platform::apt_base(&python_version);
    let stage = PlatformStage::AptBase;
    info!("{} {} python {}", stage.emoji(), stage.name(), python_version);
    io::write_artifact(&Artifact::Container(container), output.output.as_deref()).await
}

pub async fn locales(locale_version: String, input: InputArgs, output: OutputArgs) -> Result<()> {
    transform(PlatformStage::Locales, &input, &output, |c| {
        Ok(platform::locales(c, &locale_version))
    })
    .await
}

pub async fn get_code(
    source: Option<PathBuf>,
    git_repo: Option<String>,
    git_branch: Option<String>,
    input: InputArgs,
    output: OutputArgs,
) -> Result<()> {
    let source = io::optional_host_directory(source.as_deref())?;
    transform(PlatformStage::GetCode, &input, &output, |c| {
        Ok(platform::get_code(
            c,
            source,
            git_repo.as_deref(),
            git_branch.as_deref(),
        )?)
    })
    .await
}

pub async fn themes(
    deployment_name: String,
    theme_source: Option<PathBuf>,
    theme_git_repo: Option<String>,
    theme_git_branch: Option<String>,
    input: InputArgs,
    output: OutputArgs,
) -> Result<()> {
    let theme_source = io::optional_host_directory(theme_source.as_deref())?;
    transform(PlatformStage::Themes, &input, &output, |c| {
        Ok(platform::themes(
            c,
            &deployment_name,
            theme_source,
            theme_git_repo.as_deref(),
            theme_git_branch.as_deref(),
        )?)
    })
    .await
}

pub async fn install_deps(
    deployment_name: String,
    release_name: String,
    pip_package_lists: PathBuf,
    pip_package_overrides: PathBuf,
    node_version: String,
    input: InputArgs,
    output: OutputArgs,
) -> Result<()> {
    let deps = DependencySet {
        deployment_name,
        release_name,
        pip_package_lists: io::host_directory(&pip_package_lists)?,
        pip_package_overrides: io::host_directory(&pip_package_overrides)?,
        node_version,
    };
    transform(PlatformStage::InstallDeps, &input, &output, |c| {
        Ok(platform::install_deps(c, &deps))
    })
    .await
}

pub async fn dockerize(output: OutputArgs) -> Result<()> {
    io::write_artifact(&Artifact::File(platform::dockerize()), output.output.as_deref()).await
}

pub async fn tutor_utils(tutor_version: String, output: OutputArgs) -> Result<()> {
    let bin = platform::tutor_utils(&tutor_version);
    io::write_artifact(&Artifact::Directory(bin), output.output.as_deref()).await
}

#[allow(clippy::too_many_arguments)]
pub async fn collected(
    deployment_name: String,
    dockerize_bin: Option<PathBuf>,
    tutor_bin: Option<PathBuf>,
    tutor_version: String,
    custom_settings: PathBuf,
    app_user_id: u32,
    input: InputArgs,
    output: OutputArgs,
) -> Result<()> {
    let dockerize_bin = match io::read_optional_artifact(dockerize_bin.as_deref()).await? {
        Some(artifact) => artifact.into_file()?,
        None => platform::dockerize(),
    };
    let tutor_bin = match io::read_optional_artifact(tutor_bin.as_deref()).await? {
        Some(artifact) => artifact.into_directory()?,
        None => platform::tutor_utils(&tutor_version),
    };

    let collection = Collection {
        deployment_name,
        dockerize_bin,
        tutor_bin,
        custom_settings: io::host_directory(&custom_settings)?,
        app_user_id,
    };
    transform(PlatformStage::Collected, &input, &output, |c| {
        Ok(platform::collected(c, &collection)?)
    })
    .await
}

pub async fn fetch_translations(
    translations_repository: String,
    translations_branch: String,
    input: InputArgs,
    output: OutputArgs,
) -> Result<()> {
    transform(PlatformStage::FetchTranslations, &input, &output, |c| {
        Ok(platform::fetch_translations(
            c,
            &translations_repository,
            &translations_branch,
        ))
    })
    .await
}

pub async fn build_static_assets(
    deployment_name: String,
    input: InputArgs,
    output: OutputArgs,
) -> Result<()> {
    transform(PlatformStage::BuildStaticAssets, &input, &output, |c| {
        Ok(platform::build_static_assets(c, &deployment_name))
    })
    .await
}

pub async fn docker_image(
    deployment_name: String,
    release_name: String,
    input: InputArgs,
    output: OutputArgs,
) -> Result<()> {
    transform(PlatformStage::DockerImage, &input, &output, |c| {
        Ok(platform::docker_image(c, &deployment_name, &release_name))
    })
    .await
}
