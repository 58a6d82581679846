use anyhow::{Context, Result};
use clap::Parser;

mod cli;
mod commands;
mod config;
mod domain;
mod error;
mod infrastructure;
mod observability;
mod services;
mod tools;
mod ui;

use cli::{Cli, Commands};
use commands::{build, export, mfe, platform, publish, release, render, stages};
use config::LehrerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging with LOGGING env var support
    // LOGGING=debug,info,warn,error or just LOGGING=debug
    let log_level = std::env::var("LOGGING")
        .or_else(|_| std::env::var("LOG_LEVEL"))
        .unwrap_or_else(|_| {
            if cli.verbose {
                "debug".to_string()
            } else {
                "info".to_string()
            }
        });

    // stdout carries artifacts, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(false)
        .init();

    let config = LehrerConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    if let Err(e) = run(cli.command, &config).await {
        ui::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
    Ok(())
}

async fn run(command: Commands, config: &LehrerConfig) -> Result<()> {
    match command {
        Commands::AptBase {
            python_version,
            output,
        } => stages::apt_base(python_version, output).await,

        Commands::Locales {
            locale_version,
            input,
            output,
        } => stages::locales(locale_version, input, output).await,

        Commands::GetCode {
            source,
            edx_platform_git_repo,
            edx_platform_git_branch,
            input,
            output,
        } => {
            stages::get_code(
                source,
                edx_platform_git_repo,
                edx_platform_git_branch,
                input,
                output,
            )
            .await
        }

        Commands::Themes {
            deployment_name,
            theme_source,
            theme_git_repo,
            theme_git_branch,
            input,
            output,
        } => {
            stages::themes(
                deployment_name,
                theme_source,
                theme_git_repo,
                theme_git_branch,
                input,
                output,
            )
            .await
        }

        Commands::InstallDeps {
            deployment_name,
            release_name,
            pip_package_lists,
            pip_package_overrides,
            node_version,
            input,
            output,
        } => {
            stages::install_deps(
                deployment_name,
                release_name,
                pip_package_lists,
                pip_package_overrides,
                node_version,
                input,
                output,
            )
            .await
        }

        Commands::Dockerize { output } => stages::dockerize(output).await,

        Commands::TutorUtils {
            tutor_version,
            output,
        } => stages::tutor_utils(tutor_version, output).await,

        Commands::Collected {
            deployment_name,
            dockerize_bin,
            tutor_bin,
            tutor_version,
            custom_settings,
            app_user_id,
            input,
            output,
        } => {
            stages::collected(
                deployment_name,
                dockerize_bin,
                tutor_bin,
                tutor_version,
                custom_settings,
                app_user_id,
                input,
                output,
            )
            .await
        }

        Commands::FetchTranslations {
            translations_repository,
            translations_branch,
            input,
            output,
        } => {
            stages::fetch_translations(translations_repository, translations_branch, input, output)
                .await
        }

        Commands::BuildStaticAssets {
            deployment_name,
            input,
            output,
        } => stages::build_static_assets(deployment_name, input, output).await,

        Commands::DockerImage {
            deployment_name,
            release_name,
            input,
            output,
        } => stages::docker_image(deployment_name, release_name, input, output).await,

        Commands::BuildPlatform {
            platform: args,
            output,
        } => platform::execute(args, output, config).await,

        Commands::PublishPlatform {
            repository,
            tags,
            registry,
            input,
        } => publish::execute(input.input, repository, tags, registry, config).await,

        Commands::BuildCodejail {
            release_name,
            python_version,
            codejail_config,
            output,
        } => {
            commands::services::build_codejail(
                release_name,
                python_version,
                &codejail_config,
                output,
                config,
            )
            .await
        }

        Commands::BuildNotes {
            release_name,
            python_version,
            notes_config,
            output,
        } => {
            commands::services::build_notes(
                release_name,
                python_version,
                &notes_config,
                output,
                config,
            )
            .await
        }

        Commands::BuildMfe {
            mfe_name,
            mfe_repo,
            mfe_branch,
            node_version,
            deployment_name,
            slot_config,
            enable_smoot_design,
            enable_ai_drawer,
            styles_file,
            env,
            dest,
            output,
        } => {
            let options = mfe::BuildMfeOptions {
                mfe_name,
                mfe_repo,
                mfe_branch,
                node_version,
                deployment_name,
                slot_config,
                enable_smoot_design,
                enable_ai_drawer,
                styles_file,
                env,
            };
            mfe::build(options, dest, output, config).await
        }

        Commands::WatchMfe {
            mfe_source,
            slot_config,
            node_version,
            deployment_name,
            mfe_name,
            port,
            env,
        } => {
            let options = mfe::WatchMfeOptions {
                mfe_source,
                slot_config,
                node_version,
                deployment_name,
                mfe_name,
                port,
                env,
            };
            mfe::watch(options, config).await
        }

        Commands::Render { input } => render::execute(input.input).await,

        Commands::Build { tags, input } => build::execute(input.input, tags, config).await,

        Commands::Export { dest, input } => export::execute(input.input, dest, config).await,

        Commands::Release {
            platform,
            tags,
            registry,
            codejail_config,
            notes_config,
            skip_codejail,
            skip_notes,
        } => {
            let options = release::ReleaseOptions {
                tags,
                codejail_config,
                notes_config,
                skip_codejail,
                skip_notes,
            };
            release::execute(platform, options, registry, config).await
        }
    }
}
