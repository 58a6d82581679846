//! CLI definitions for lehrer
//!
//! This module contains all CLI argument parsing structures using clap.
//! Stage commands read an artifact (`--input`, default stdin) and write the
//! extended artifact as JSON (`--output`, default stdout).

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::domain::mfe::{DEFAULT_MFE_DEPLOYMENT, DEFAULT_WATCH_PORT};
use crate::domain::platform::{
    DEFAULT_APP_USER_ID, DEFAULT_LOCALE_VERSION, DEFAULT_TRANSLATIONS_BRANCH,
    DEFAULT_TRANSLATIONS_REPO, DEFAULT_TUTOR_VERSION,
};
use crate::domain::release::{DEFAULT_NODE_VERSION, MASTER_RELEASE};

#[derive(Parser)]
#[command(
    name = "lehrer",
    version,
    about = "Build pipeline for Open edX platform images and companion services",
    long_about = "Composes declarative container plans for the Open edX platform, codejail,\n\
                  notes and micro-frontends, and realizes them with docker buildx.\n\
                  Stage commands pipe JSON artifacts: lehrer apt-base | lehrer locales | ..."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (default: ./lehrer.yaml when present)
    #[arg(long, global = true, env = "LEHRER_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Where an input artifact is read from
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Artifact JSON file, or `-` for stdin
    #[arg(short, long, default_value = "-")]
    pub input: String,
}

/// Where an output artifact is written to
#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Write the artifact JSON here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Registry coordinates and credentials
#[derive(Args, Debug, Clone)]
pub struct RegistryArgs {
    /// Container registry (e.g., ghcr.io, docker.io); config default
    #[arg(long)]
    pub registry: Option<String>,

    /// Registry username
    #[arg(long, env = "REGISTRY_USERNAME")]
    pub username: Option<String>,

    /// Registry password or token
    #[arg(long, env = "REGISTRY_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

/// Inputs of a complete platform build
#[derive(Args, Debug, Clone)]
pub struct PlatformArgs {
    /// Deployment name (e.g., mitx, mitxonline)
    #[arg(long)]
    pub deployment_name: String,

    /// Release name (e.g., master, sumac, redwood)
    #[arg(long)]
    pub release_name: String,

    /// Directory with pip requirements keyed {release}/{deployment}.txt
    #[arg(long)]
    pub pip_package_lists: PathBuf,

    /// Directory with pip override requirements
    #[arg(long)]
    pub pip_package_overrides: PathBuf,

    /// Directory with custom settings files
    #[arg(long)]
    pub custom_settings: PathBuf,

    /// Local edx-platform checkout (instead of cloning)
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Platform git repository
    #[arg(long)]
    pub platform_repo: Option<String>,

    /// Platform git branch (config per release, else master)
    #[arg(long)]
    pub platform_branch: Option<String>,

    /// Local theme checkout
    #[arg(long)]
    pub theme_source: Option<PathBuf>,

    /// Theme git repository
    #[arg(long)]
    pub theme_repo: Option<String>,

    /// Theme git branch
    #[arg(long)]
    pub theme_branch: Option<String>,

    /// Python version (default: 3.12 for master, 3.11 for others)
    #[arg(long)]
    pub python_version: Option<String>,

    #[arg(long, default_value = DEFAULT_NODE_VERSION)]
    pub node_version: String,

    /// Git ref of openedx-i18n
    #[arg(long, default_value = DEFAULT_LOCALE_VERSION)]
    pub locale_version: String,

    /// Translations repository passed to atlas
    #[arg(long)]
    pub translations_repo: Option<String>,

    #[arg(long)]
    pub translations_branch: Option<String>,

    /// Include openedx-i18n locales
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    pub include_locales: bool,

    /// Tutor version providing the bin scripts
    #[arg(long, default_value = DEFAULT_TUTOR_VERSION)]
    pub tutor_version: String,

    /// Uid of the `app` user
    #[arg(long, default_value_t = DEFAULT_APP_USER_ID)]
    pub app_user_id: u32,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Python base image with system packages and uv
    AptBase {
        #[arg(long, default_value = "3.11")]
        python_version: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Add openedx-i18n locales
    Locales {
        /// Git ref of openedx-i18n
        #[arg(long, default_value = DEFAULT_LOCALE_VERSION)]
        locale_version: String,

        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Add the edx-platform source and create the virtualenv
    GetCode {
        /// Local directory with edx-platform source
        #[arg(long)]
        source: Option<PathBuf>,

        /// Git repository URL (required if --source is not given)
        #[arg(long)]
        edx_platform_git_repo: Option<String>,

        /// Git branch or tag (required if --source is not given)
        #[arg(long)]
        edx_platform_git_branch: Option<String>,

        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Add a deployment theme
    Themes {
        #[arg(long)]
        deployment_name: String,

        /// Local theme directory
        #[arg(long)]
        theme_source: Option<PathBuf>,

        /// Theme git repository (required if --theme-source is not given)
        #[arg(long)]
        theme_git_repo: Option<String>,

        /// Theme git branch (required if --theme-source is not given)
        #[arg(long)]
        theme_git_branch: Option<String>,

        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Install Python and Node dependencies
    InstallDeps {
        #[arg(long)]
        deployment_name: String,

        #[arg(long)]
        release_name: String,

        /// Directory with pip requirements keyed {release}/{deployment}.txt
        #[arg(long)]
        pip_package_lists: PathBuf,

        /// Directory with pip override requirements
        #[arg(long)]
        pip_package_overrides: PathBuf,

        #[arg(long, default_value = DEFAULT_NODE_VERSION)]
        node_version: String,

        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// The dockerize binary, as a file artifact
    Dockerize {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Tutor's bin scripts, as a directory artifact
    TutorUtils {
        #[arg(long, default_value = DEFAULT_TUTOR_VERSION)]
        tutor_version: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Assemble helpers, the app user and custom settings
    Collected {
        #[arg(long)]
        deployment_name: String,

        /// File artifact JSON for dockerize (default: built-in)
        #[arg(long)]
        dockerize_bin: Option<PathBuf>,

        /// Directory artifact JSON for tutor's bin (default: built-in)
        #[arg(long)]
        tutor_bin: Option<PathBuf>,

        /// Tutor version used when --tutor-bin is not given
        #[arg(long, default_value = DEFAULT_TUTOR_VERSION)]
        tutor_version: String,

        /// Directory with custom settings files
        #[arg(long)]
        custom_settings: PathBuf,

        #[arg(long, default_value_t = DEFAULT_APP_USER_ID)]
        app_user_id: u32,

        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Pull and compile translations
    FetchTranslations {
        #[arg(long, default_value = DEFAULT_TRANSLATIONS_REPO)]
        translations_repository: String,

        #[arg(long, default_value = DEFAULT_TRANSLATIONS_BRANCH)]
        translations_branch: String,

        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Compile themes and collect static assets
    BuildStaticAssets {
        #[arg(long)]
        deployment_name: String,

        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Finalize the platform image
    DockerImage {
        #[arg(long)]
        deployment_name: String,

        #[arg(long)]
        release_name: String,

        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Compose every platform stage into one plan
    BuildPlatform {
        #[command(flatten)]
        platform: PlatformArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Build a container artifact and push it
    PublishPlatform {
        /// Repository (e.g., mitodl/openedx-platform); config default
        #[arg(long)]
        repository: Option<String>,

        /// Image tags (can be specified multiple times)
        #[arg(long = "tag", default_value = "latest")]
        tags: Vec<String>,

        #[command(flatten)]
        registry: RegistryArgs,

        #[command(flatten)]
        input: InputArgs,
    },

    /// Sandboxed Python execution service
    BuildCodejail {
        #[arg(long, default_value = MASTER_RELEASE)]
        release_name: String,

        /// Python version (default: by release)
        #[arg(long)]
        python_version: Option<String>,

        /// Directory containing the 01-sandbox sudoers file
        #[arg(long, default_value = "codejail_config")]
        codejail_config: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Student annotation API service
    BuildNotes {
        /// Release line; selects the notes branch
        #[arg(long, default_value = MASTER_RELEASE)]
        release_name: String,

        /// Python version (default: 3.11)
        #[arg(long)]
        python_version: Option<String>,

        /// Directory containing env_config.py
        #[arg(long, default_value = "notes_config")]
        notes_config: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Build a micro-frontend bundle
    BuildMfe {
        /// MFE application name (e.g., learning, discussions, account)
        #[arg(long)]
        mfe_name: String,

        #[arg(long)]
        mfe_repo: String,

        #[arg(long, default_value = "master")]
        mfe_branch: String,

        #[arg(long, default_value = DEFAULT_NODE_VERSION)]
        node_version: String,

        #[arg(long, default_value = DEFAULT_MFE_DEPLOYMENT)]
        deployment_name: String,

        /// Directory containing slot configuration files
        #[arg(long, default_value = "mfe_slot_config")]
        slot_config: PathBuf,

        /// Include the smoot-design bundle (learning MFE)
        #[arg(long)]
        enable_smoot_design: bool,

        /// Include AI drawer components (learning MFE)
        #[arg(long)]
        enable_ai_drawer: bool,

        /// Deployment-specific styles file from the slot config
        #[arg(long)]
        styles_file: Option<String>,

        /// Build-time variable NAME=VALUE (can be specified multiple times)
        #[arg(long = "env")]
        env: Vec<String>,

        /// Export dist here instead of printing the directory artifact
        #[arg(long)]
        dest: Option<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Run an MFE dev server over a local checkout
    WatchMfe {
        /// Local MFE source directory
        #[arg(long)]
        mfe_source: PathBuf,

        #[arg(long, default_value = "mfe_slot_config")]
        slot_config: PathBuf,

        #[arg(long, default_value = DEFAULT_NODE_VERSION)]
        node_version: String,

        #[arg(long, default_value = DEFAULT_MFE_DEPLOYMENT)]
        deployment_name: String,

        #[arg(long, default_value = "learning")]
        mfe_name: String,

        #[arg(long, default_value_t = DEFAULT_WATCH_PORT)]
        port: u16,

        /// Variable NAME=VALUE (can be specified multiple times)
        #[arg(long = "env")]
        env: Vec<String>,
    },

    /// Print the Containerfile for an artifact
    Render {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Build a container artifact into the local image store
    Build {
        /// Local tags (can be specified multiple times)
        #[arg(long = "tag")]
        tags: Vec<String>,

        #[command(flatten)]
        input: InputArgs,
    },

    /// Copy a file or directory artifact to the host
    Export {
        /// Destination directory
        #[arg(long)]
        dest: PathBuf,

        #[command(flatten)]
        input: InputArgs,
    },

    /// Build and publish platform, codejail and notes under shared tags
    Release {
        #[command(flatten)]
        platform: PlatformArgs,

        /// Image tags (can be specified multiple times)
        #[arg(long = "tag", required = true)]
        tags: Vec<String>,

        #[command(flatten)]
        registry: RegistryArgs,

        #[arg(long, default_value = "codejail_config")]
        codejail_config: PathBuf,

        #[arg(long, default_value = "notes_config")]
        notes_config: PathBuf,

        /// Skip the codejail image
        #[arg(long)]
        skip_codejail: bool,

        /// Skip the notes image
        #[arg(long)]
        skip_notes: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_stage_defaults() {
        let cli = parse(&["lehrer", "locales"]);
        match cli.command {
            Commands::Locales {
                locale_version,
                input,
                output,
            } => {
                assert_eq!(locale_version, "master");
                assert_eq!(input.input, "-");
                assert!(output.output.is_none());
            }
            _ => panic!("expected locales"),
        }
    }

    #[test]
    fn test_get_code_flags() {
        let cli = parse(&[
            "lehrer",
            "get-code",
            "--edx-platform-git-repo",
            "https://github.com/openedx/edx-platform",
            "--edx-platform-git-branch",
            "open-release/sumac.master",
            "--input",
            "base.json",
        ]);
        match cli.command {
            Commands::GetCode {
                source,
                edx_platform_git_branch,
                input,
                ..
            } => {
                assert!(source.is_none());
                assert_eq!(
                    edx_platform_git_branch.as_deref(),
                    Some("open-release/sumac.master")
                );
                assert_eq!(input.input, "base.json");
            }
            _ => panic!("expected get-code"),
        }
    }

    #[test]
    fn test_build_platform_include_locales() {
        let base = [
            "lehrer",
            "build-platform",
            "--deployment-name",
            "mitxonline",
            "--release-name",
            "sumac",
            "--pip-package-lists",
            "lists",
            "--pip-package-overrides",
            "overrides",
            "--custom-settings",
            "settings",
        ];

        match parse(&base).command {
            Commands::BuildPlatform { platform, .. } => {
                assert!(platform.include_locales);
                assert_eq!(platform.node_version, "20.18.0");
                assert_eq!(platform.app_user_id, 1000);
            }
            _ => panic!("expected build-platform"),
        }

        let mut args = base.to_vec();
        args.extend(["--include-locales", "false"]);
        match parse(&args).command {
            Commands::BuildPlatform { platform, .. } => assert!(!platform.include_locales),
            _ => panic!("expected build-platform"),
        }
    }

    #[test]
    fn test_build_platform_requires_deployment() {
        assert!(
            Cli::try_parse_from(["lehrer", "build-platform", "--release-name", "sumac"]).is_err()
        );
    }

    #[test]
    fn test_publish_default_tag() {
        match parse(&["lehrer", "publish-platform", "--username", "bot"]).command {
            Commands::PublishPlatform {
                tags, registry, ..
            } => {
                assert_eq!(tags, ["latest"]);
                assert_eq!(registry.username.as_deref(), Some("bot"));
                assert!(registry.registry.is_none());
            }
            _ => panic!("expected publish-platform"),
        }
    }

    #[test]
    fn test_build_mfe_repeated_env() {
        let cli = parse(&[
            "lehrer",
            "build-mfe",
            "--mfe-name",
            "learning",
            "--mfe-repo",
            "https://github.com/openedx/frontend-app-learning",
            "--env",
            "LMS_BASE_URL=https://lms.example.com",
            "--env",
            "SITE_NAME=Example",
            "--enable-smoot-design",
        ]);
        match cli.command {
            Commands::BuildMfe {
                env,
                enable_smoot_design,
                enable_ai_drawer,
                slot_config,
                ..
            } => {
                assert_eq!(env.len(), 2);
                assert!(enable_smoot_design);
                assert!(!enable_ai_drawer);
                assert_eq!(slot_config, PathBuf::from("mfe_slot_config"));
            }
            _ => panic!("expected build-mfe"),
        }
    }

    #[test]
    fn test_release_requires_tag() {
        let args = [
            "lehrer",
            "release",
            "--deployment-name",
            "mitxonline",
            "--release-name",
            "sumac",
            "--pip-package-lists",
            "lists",
            "--pip-package-overrides",
            "overrides",
            "--custom-settings",
            "settings",
        ];
        assert!(Cli::try_parse_from(args).is_err());

        let mut tagged = args.to_vec();
        tagged.extend(["--tag", "sumac", "--skip-notes"]);
        match parse(&tagged).command {
            Commands::Release {
                tags, skip_notes, skip_codejail, ..
            } => {
                assert_eq!(tags, ["sumac"]);
                assert!(skip_notes);
                assert!(!skip_codejail);
            }
            _ => panic!("expected release"),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = parse(&["lehrer", "dockerize", "--verbose", "--config", "ci/lehrer.yaml"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("ci/lehrer.yaml")));
    }
}
