//! Micro-frontend builds and dev servers
//!
//! Slot configuration files come from a shared directory laid out as:
//!
//! ```text
//! mfe_slot_config/
//!   Footer.jsx
//!   learning-mfe-config.env.jsx
//!   {deployment}/common-mfe-config.env.jsx
//!   AIDrawerManagerSidebar.jsx
//!   SidebarAIDrawerCoordinator.jsx
//! ```

use regex::Regex;
use std::sync::OnceLock;

use super::container::{Container, DirectoryRef};
use super::release::DEFAULT_NODE_VERSION;
use crate::error::PlanError;

pub const DEFAULT_MFE_DEPLOYMENT: &str = "mitxonline";
pub const DEFAULT_WATCH_PORT: u16 = 8080;
const SMOOT_DESIGN_PACKAGE: &str = "@mitodl/smoot-design@^6.12.0";

fn env_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("env name pattern is valid")
    })
}

/// Parse `NAME=VALUE` pairs given on the command line
///
/// Names must be shell identifiers and values must fit on one line.
pub fn parse_env_assignment(raw: &str) -> Result<(String, String), PlanError> {
    match raw.split_once('=') {
        Some((name, value))
            if env_name_pattern().is_match(name) && !value.chars().any(char::is_control) =>
        {
            Ok((name.to_string(), value.to_string()))
        }
        _ => Err(PlanError::InvalidEnvAssignment(raw.to_string())),
    }
}

fn is_learning(mfe_name: &str) -> bool {
    mfe_name.eq_ignore_ascii_case("learning")
}

/// Env config file stem for an MFE within a deployment
pub fn env_config_stem(mfe_name: &str, deployment_name: &str) -> String {
    if is_learning(mfe_name) {
        "learning-mfe-config".to_string()
    } else {
        format!("{}/common-mfe-config", deployment_name)
    }
}

fn node_base(node_version: &str) -> Container {
    Container::from_image(format!("node:{}-trixie-slim", node_version))
        .with_exec(["apt-get", "update"])
        .with_exec([
            "apt",
            "install",
            "-y",
            "python3",
            "python-is-python3",
            "build-essential",
            "git",
        ])
        .with_exec(["apt", "clean"])
}

/// Footer, env config and, for the learning MFE, the shared common config
fn with_slot_config(
    container: Container,
    slot_config: &DirectoryRef,
    mfe_name: &str,
    deployment_name: &str,
) -> Container {
    let stem = env_config_stem(mfe_name, deployment_name);
    let container = container
        .with_file("/app/mfe/Footer.jsx", slot_config.file("Footer.jsx"))
        .with_file(
            "/app/mfe/env.config.jsx",
            slot_config.file(&format!("{}.env.jsx", stem)),
        );

    if is_learning(mfe_name) {
        container.with_file(
            "/app/mfe/common-mfe-config.env.jsx",
            slot_config.file(&format!("{}/common-mfe-config.env.jsx", deployment_name)),
        )
    } else {
        container
    }
}

/// Parameters of a production MFE build
#[derive(Debug, Clone)]
pub struct MfeBuild {
    pub mfe_name: String,
    pub mfe_repo: String,
    pub mfe_branch: String,
    pub node_version: String,
    pub deployment_name: String,
    pub slot_config: DirectoryRef,
    pub enable_smoot_design: bool,
    pub enable_ai_drawer: bool,
    pub styles_file: Option<String>,
    /// Build-time variables such as `LMS_BASE_URL`
    pub env: Vec<(String, String)>,
}

impl MfeBuild {
    pub fn new(
        mfe_name: impl Into<String>,
        mfe_repo: impl Into<String>,
        slot_config: DirectoryRef,
    ) -> Self {
        Self {
            mfe_name: mfe_name.into(),
            mfe_repo: mfe_repo.into(),
            mfe_branch: "master".to_string(),
            node_version: DEFAULT_NODE_VERSION.to_string(),
            deployment_name: DEFAULT_MFE_DEPLOYMENT.to_string(),
            slot_config,
            enable_smoot_design: false,
            enable_ai_drawer: false,
            styles_file: None,
            env: Vec::new(),
        }
    }

    /// Plan that ends with the bundle in `/app/mfe/dist`
    pub fn container(&self) -> Container {
        let learning = is_learning(&self.mfe_name);

        let mut container = node_base(&self.node_version)
            .with_workdir("/app")
            .with_exec([
                "git",
                "clone",
                "--branch",
                &self.mfe_branch,
                "--depth",
                "1",
                &self.mfe_repo,
                "mfe",
            ])
            .with_workdir("/app/mfe");

        container = with_slot_config(
            container,
            &self.slot_config,
            &self.mfe_name,
            &self.deployment_name,
        );

        // AI drawer components only exist for the learning MFE
        if self.enable_ai_drawer && learning {
            for component in ["AIDrawerManagerSidebar.jsx", "SidebarAIDrawerCoordinator.jsx"] {
                container = container.with_file(
                    format!("/app/mfe/{}", component),
                    self.slot_config.file(component),
                );
            }
        }

        if let Some(styles) = &self.styles_file {
            container =
                container.with_file(format!("/app/mfe/{}", styles), self.slot_config.file(styles));
        }

        container = container
            .with_exec(["npm", "install"])
            .with_exec(["npm", "install", "-g", "@edx/openedx-atlas"]);

        if self.enable_smoot_design && learning {
            container = container
                .with_exec(["npm", "pack", SMOOT_DESIGN_PACKAGE])
                .with_shell("tar -xvzf mitodl-smoot-design*.tgz")
                .with_exec(["mkdir", "-p", "public/static/smoot-design"])
                .with_shell("cp package/dist/bundles/* public/static/smoot-design/");
        }

        container = container.with_exec(["npm", "install", "webpack"]);
        for (name, value) in &self.env {
            container = container.with_env_variable(name.as_str(), value.as_str());
        }

        container
            .with_env_variable("NODE_ENV", "production")
            .with_exec(["npm", "run", "build"])
    }

    /// The built `dist` directory
    pub fn dist(&self) -> DirectoryRef {
        self.container().directory("/app/mfe/dist")
    }
}

/// Parameters of a hot-reloading MFE dev server
#[derive(Debug, Clone)]
pub struct MfeWatch {
    pub mfe_source: DirectoryRef,
    pub slot_config: DirectoryRef,
    pub node_version: String,
    pub deployment_name: String,
    pub mfe_name: String,
    pub port: u16,
    pub env: Vec<(String, String)>,
}

impl MfeWatch {
    pub fn new(mfe_source: DirectoryRef, slot_config: DirectoryRef) -> Self {
        Self {
            mfe_source,
            slot_config,
            node_version: DEFAULT_NODE_VERSION.to_string(),
            deployment_name: DEFAULT_MFE_DEPLOYMENT.to_string(),
            mfe_name: "learning".to_string(),
            port: DEFAULT_WATCH_PORT,
            env: Vec::new(),
        }
    }

    /// Service plan whose entrypoint is the dev server
    pub fn container(&self) -> Container {
        let mut container = node_base(&self.node_version)
            .with_workdir("/app/mfe")
            .with_directory("/app/mfe", self.mfe_source.clone());

        container = with_slot_config(
            container,
            &self.slot_config,
            &self.mfe_name,
            &self.deployment_name,
        )
        .with_env_variable("PORT", self.port.to_string());

        for (name, value) in &self.env {
            container = container.with_env_variable(name.as_str(), value.as_str());
        }

        container
            .with_exec(["npm", "install"])
            .with_exec(["npm", "install", "-g", "@edx/openedx-atlas"])
            .with_exposed_port(self.port)
            .with_entrypoint(["npm", "start"])
    }
}
