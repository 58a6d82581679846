//! Release lines and the platform stage sequence
//!
//! A release (`master`, `sumac`, `redwood`, ...) selects dependency
//! manifests and the default interpreter version.

/// Release name that tracks the platform's main branch
pub const MASTER_RELEASE: &str = "master";

/// Node.js version used for the platform asset pipeline and MFEs
pub const DEFAULT_NODE_VERSION: &str = "20.18.0";

/// Python version a release line builds with when nothing overrides it
pub fn default_python_version(release_name: &str) -> &'static str {
    if release_name == MASTER_RELEASE {
        "3.12"
    } else {
        "3.11"
    }
}

/// Individual stages of a platform image build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformStage {
    AptBase,
    Locales,
    GetCode,
    InstallDeps,
    Themes,
    TutorUtils,
    Dockerize,
    Collected,
    FetchTranslations,
    BuildStaticAssets,
    DockerImage,
}

impl PlatformStage {
    /// Command name of the stage
    pub fn name(&self) -> &'static str {
        match self {
            Self::AptBase => "apt-base",
            Self::Locales => "locales",
            Self::GetCode => "get-code",
            Self::InstallDeps => "install-deps",
            Self::Themes => "themes",
            Self::TutorUtils => "tutor-utils",
            Self::Dockerize => "dockerize",
            Self::Collected => "collected",
            Self::FetchTranslations => "fetch-translations",
            Self::BuildStaticAssets => "build-static-assets",
            Self::DockerImage => "docker-image",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::AptBase => "🐍",
            Self::Locales => "🌐",
            Self::GetCode => "📥",
            Self::InstallDeps => "📦",
            Self::Themes => "🎨",
            Self::TutorUtils => "🧰",
            Self::Dockerize => "🔧",
            Self::Collected => "🗂️",
            Self::FetchTranslations => "🗣️",
            Self::BuildStaticAssets => "🏗️",
            Self::DockerImage => "🐳",
        }
    }

    /// Full stage order; optional stages are skipped by the composer
    pub fn sequence() -> &'static [PlatformStage] {
        &[
            Self::AptBase,
            Self::Locales,
            Self::GetCode,
            Self::InstallDeps,
            Self::Themes,
            Self::TutorUtils,
            Self::Dockerize,
            Self::Collected,
            Self::FetchTranslations,
            Self::BuildStaticAssets,
            Self::DockerImage,
        ]
    }
}
