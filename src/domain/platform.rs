//! Open edX platform image stages
//!
//! Each function takes a plan and returns the extended plan. Nothing here
//! touches the filesystem or runs a process; the engine adapter realizes
//! the result.

use tracing::debug;

use super::container::{Container, DirectoryRef, FileRef};
use super::release::{default_python_version, PlatformStage, DEFAULT_NODE_VERSION};
use crate::error::PlanError;

pub const UV_IMAGE: &str = "ghcr.io/astral-sh/uv:latest";
pub const I18N_REPO: &str = "https://github.com/openedx-unsupported/openedx-i18n.git";
pub const TUTOR_REPO: &str = "https://github.com/overhangio/tutor.git";
pub const DOCKERIZE_IMAGE: &str = "docker.io/powerman/dockerize@sha256:f3ecfd5ac0f74eed3990782309ac6bf8b700f4eca0ea9e9ef507b11742c19cc6";
pub const DEFAULT_PLATFORM_REPO: &str = "https://github.com/openedx/edx-platform";
pub const DEFAULT_TRANSLATIONS_REPO: &str = "mitodl/mitxonline-translations";
pub const DEFAULT_TRANSLATIONS_BRANCH: &str = "main";
pub const DEFAULT_LOCALE_VERSION: &str = "master";
pub const DEFAULT_TUTOR_VERSION: &str = "v19.0.0";
pub const DEFAULT_APP_USER_ID: u32 = 1000;

const PROCTORTRACK_PACKAGE: &str = "git+https://git@github.com/verificient/edx-proctoring-proctortrack.git#f0fa9edbd16aa5af5a41ac309d2609e529ea8732";

const APT_PACKAGES: &[&str] = &[
    "curl",
    "default-libmysqlclient-dev",
    "gettext",
    "gfortran",
    "git",
    "graphviz",
    "libffi-dev",
    "libfreetype-dev",
    "libgeos-dev",
    "libgraphviz-dev",
    "libjpeg-dev",
    "liblapack-dev",
    "libpng-dev",
    "libsqlite3-dev",
    "libxml2-dev",
    "libxmlsec1-dev",
    "libxmlsec1-openssl",
    "lynx",
    "pkg-config",
    "rdfind",
];

/// Files copied from the custom settings directory: (source, destination)
const CUSTOM_SETTINGS_FILES: &[(&str, &str)] = &[
    ("lms.env.yml", "/openedx/config/lms.env.yml"),
    ("cms.env.yml", "/openedx/config/cms.env.yml"),
    ("lms/assets.py", "/openedx/edx-platform/lms/envs/mitol/assets.py"),
    ("lms/i18n.py", "/openedx/edx-platform/lms/envs/mitol/i18n.py"),
    ("cms/assets.py", "/openedx/edx-platform/cms/envs/mitol/assets.py"),
    ("cms/i18n.py", "/openedx/edx-platform/cms/envs/mitol/i18n.py"),
    ("set_waffle_flags.py", "/openedx/edx-platform/set_waffle_flags.py"),
    (
        "process_scheduled_emails.py",
        "/openedx/edx-platform/process_scheduled_emails.py",
    ),
    ("saml_pull.py", "/openedx/edx-platform/saml_pull.py"),
];

/// Where a source tree comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Local(DirectoryRef),
    Git { repo: String, branch: String },
}

impl Source {
    /// A local directory wins; otherwise both repo and branch are required.
    fn resolve(
        local: Option<DirectoryRef>,
        repo: Option<&str>,
        branch: Option<&str>,
        names: (&'static str, &'static str, &'static str),
    ) -> Result<Self, PlanError> {
        if let Some(dir) = local {
            return Ok(Self::Local(dir));
        }
        match (repo, branch) {
            (Some(repo), Some(branch)) if !repo.is_empty() && !branch.is_empty() => {
                Ok(Self::Git {
                    repo: repo.to_string(),
                    branch: branch.to_string(),
                })
            }
            _ => Err(PlanError::MissingSource {
                local: names.0,
                repo: names.1,
                branch: names.2,
            }),
        }
    }

    fn place(self, container: Container, dest: &str) -> Container {
        match self {
            Self::Local(dir) => container.with_directory(dest, dir),
            Self::Git { repo, branch } => container.with_exec([
                "git", "clone", "--depth", "1", "--branch", &branch, &repo, dest,
            ]),
        }
    }
}

/// Python base with the system packages and uv
pub fn apt_base(python_version: &str) -> Container {
    let uv_binary = Container::from_image(UV_IMAGE).file("/uv");

    let mut install = vec!["apt", "install", "-y", "--no-install-recommends"];
    install.extend_from_slice(APT_PACKAGES);

    Container::from_image(format!("python:{}-bookworm", python_version))
        .with_env_variable("DEBIAN_FRONTEND", "noninteractive")
        .with_file("/usr/local/bin/uv", uv_binary)
        .with_env_variable("UV_NO_MANAGED_PYTHON", "1")
        .with_env_variable("UV_PYTHON_DOWNLOADS", "never")
        .with_env_variable("UV_COMPILE_BYTECODE", "1")
        .with_env_variable("UV_LINK_MODE", "copy")
        .with_env_variable("UV_PROJECT_ENVIRONMENT", "/openedx/venv")
        .with_env_variable("VIRTUAL_ENV", "/openedx/venv")
        .with_env_variable("PATH", "/openedx/venv/bin:/usr/local/bin:/usr/bin:/bin")
        .with_exec(["apt", "update"])
        .with_exec(install)
        .with_exec(["apt", "autoremove", "-y"])
        .with_exec(["apt", "clean"])
        .with_shell("rm -rf /var/lib/apt/lists/*")
}

/// Locale bundles from openedx-i18n at `/openedx/locale/contrib`
///
/// The i18n repository is archived and only carries `master`.
pub fn locales(container: Container, locale_version: &str) -> Container {
    container
        .with_exec([
            "git",
            "clone",
            "--depth",
            "1",
            "--branch",
            locale_version,
            I18N_REPO,
            "/tmp/openedx-i18n",
        ])
        .with_exec(["mkdir", "-p", "/openedx/locale/contrib"])
        .with_shell("mv /tmp/openedx-i18n/edx-platform/locale /openedx/locale/contrib || true")
        .with_exec(["rm", "-rf", "/tmp/openedx-i18n"])
}

/// Platform source at `/openedx/edx-platform`, then the virtualenv
pub fn get_code(
    container: Container,
    source: Option<DirectoryRef>,
    git_repo: Option<&str>,
    git_branch: Option<&str>,
) -> Result<Container, PlanError> {
    let source = Source::resolve(
        source,
        git_repo,
        git_branch,
        ("source", "edx_platform_git_repo", "edx_platform_git_branch"),
    )?;
    debug!("platform source: {:?}", source);

    Ok(source
        .place(container, "/openedx/edx-platform")
        .with_exec(["uv", "venv", "/openedx/venv"]))
}

/// Deployment theme at `/openedx/themes/{deployment}`
pub fn themes(
    container: Container,
    deployment_name: &str,
    theme_source: Option<DirectoryRef>,
    theme_git_repo: Option<&str>,
    theme_git_branch: Option<&str>,
) -> Result<Container, PlanError> {
    let source = Source::resolve(
        theme_source,
        theme_git_repo,
        theme_git_branch,
        ("theme_source", "theme_git_repo", "theme_git_branch"),
    )?;
    let theme_path = format!("/openedx/themes/{}", deployment_name);
    Ok(source.place(container, &theme_path))
}

/// Inputs of the dependency stage
#[derive(Debug, Clone)]
pub struct DependencySet {
    pub deployment_name: String,
    pub release_name: String,
    /// Requirements keyed `{release}/{deployment}.txt`
    pub pip_package_lists: DirectoryRef,
    /// Source-built overrides keyed `{release}/{deployment}.txt`
    pub pip_package_overrides: DirectoryRef,
    pub node_version: String,
}

/// Python and Node.js dependencies
pub fn install_deps(container: Container, deps: &DependencySet) -> Container {
    let manifest = format!("{}/{}.txt", deps.release_name, deps.deployment_name);

    let mut container = container
        .with_directory("/root/pip_package_lists", deps.pip_package_lists.clone())
        .with_directory(
            "/root/pip_package_overrides",
            deps.pip_package_overrides.clone(),
        )
        .with_shell(
            "cp /openedx/edx-platform/requirements/edx/base.txt /root/pip_package_lists/edx_base.txt",
        )
        .with_shell(
            "cp /openedx/edx-platform/requirements/edx/assets.txt /root/pip_package_lists/edx_assets.txt",
        )
        .with_exec([
            "uv".to_string(),
            "pip".into(),
            "install".into(),
            "-r".into(),
            "/root/pip_package_lists/edx_base.txt".into(),
            "-r".into(),
            "/root/pip_package_lists/edx_assets.txt".into(),
            "-r".into(),
            format!("/root/pip_package_lists/{}", manifest),
        ]);

    if deps.deployment_name == "mitxonline" {
        container = container.with_exec(["uv", "pip", "uninstall", "edx-name-affirmation"]);
    }

    // The override list uses --no-binary flags, which need pip rather than uv.
    container
        .with_exec(["pip", "uninstall", "--yes", "lxml", "xmlsec"])
        .with_exec([
            "pip".to_string(),
            "install".into(),
            "--no-cache-dir".into(),
            "-r".into(),
            format!("/root/pip_package_overrides/{}", manifest),
        ])
        .with_workdir("/openedx/edx-platform")
        .with_env_variable("NPM_REGISTRY", "https://registry.npmjs.org/")
        .with_shell(format!(
            "nodeenv /openedx/nodeenv --node={} --prebuilt",
            deps.node_version
        ))
        .with_env_variable(
            "PATH",
            "/openedx/venv/bin:/openedx/nodeenv/bin:/usr/local/bin:/usr/bin:/bin",
        )
        .with_shell("npm clean-install -s --registry=https://registry.npmjs.org/")
        .with_shell(format!("npm install '{}'", PROCTORTRACK_PACKAGE))
}

/// The pinned dockerize binary
pub fn dockerize() -> FileRef {
    Container::from_image(DOCKERIZE_IMAGE).file("/usr/local/bin/dockerize")
}

/// Tutor's image helper scripts
pub fn tutor_utils(tutor_version: &str) -> DirectoryRef {
    Container::from_image("debian:bookworm-slim")
        .with_exec(["apt-get", "update"])
        .with_exec(["apt-get", "install", "-y", "git"])
        .with_exec([
            "git",
            "clone",
            "--depth",
            "1",
            "--branch",
            tutor_version,
            TUTOR_REPO,
            "/openedx/tutor",
        ])
        .directory("/openedx/tutor/tutor/templates/build/openedx/bin")
}

/// Inputs of the assembly stage
#[derive(Debug, Clone)]
pub struct Collection {
    pub deployment_name: String,
    pub dockerize_bin: FileRef,
    pub tutor_bin: DirectoryRef,
    pub custom_settings: DirectoryRef,
    pub app_user_id: u32,
}

/// Merge helper scripts, settings and the app user into one tree
pub fn collected(container: Container, collection: &Collection) -> Result<Container, PlanError> {
    if collection.app_user_id == 0 {
        return Err(PlanError::RootAppUser);
    }
    let uid = collection.app_user_id.to_string();
    debug!(
        "assembling {} as uid {}",
        collection.deployment_name, uid
    );

    // useradd lives in /usr/sbin
    let mut container = container
        .with_env_variable(
            "PATH",
            "/usr/sbin:/openedx/venv/bin:/openedx/nodeenv/bin:/usr/local/bin:/usr/bin:/bin",
        )
        .with_directory("/openedx/bin", collection.tutor_bin.clone())
        .with_exec(["chmod", "-R", "a+x", "/openedx/bin"])
        .with_exec([
            "useradd",
            "--home-dir",
            "/openedx",
            "--create-home",
            "--shell",
            "/bin/bash",
            "--uid",
            &uid,
            "app",
        ])
        .with_exec(["chown", "-R", &format!("{}:{}", uid, uid), "/openedx"])
        .with_user(uid.as_str())
        .with_file("/usr/local/bin/dockerize", collection.dockerize_bin.clone())
        .with_env_variable(
            "PATH",
            "/openedx/venv/bin:/openedx/bin:/openedx/edx-platform/node_modules/.bin:/openedx/nodeenv/bin:/usr/local/bin:/usr/bin:/bin",
        )
        .with_workdir("/openedx/edx-platform")
        .with_exec(["uv", "pip", "install", "-e", "."])
        .with_exec([
            "mkdir",
            "-p",
            "/openedx/config",
            "./lms/envs/mitol",
            "./cms/envs/mitol",
        ])
        .with_directory("/tmp/custom_settings", collection.custom_settings.clone());

    for &(file, dest) in CUSTOM_SETTINGS_FILES {
        container = container.with_exec(["cp", &format!("/tmp/custom_settings/{}", file), dest]);
    }

    Ok(container
        .with_env_variable("REVISION_CFG", "/openedx/config/revisions.yml")
        .with_env_variable("LMS_CFG", "/openedx/config/lms.env.yml")
        .with_env_variable("CMS_CFG", "/openedx/config/cms.env.yml")
        .with_env_variable("NO_PYTHON_UNINSTALL", "1")
        .with_env_variable("NO_PREREQ_INSTALL", "0"))
}

/// Pull and compile LMS and CMS translations with atlas
///
/// Plugin and xblock pulls are best effort; `compilemessages` and
/// `compilejsi18n` must succeed.
pub fn fetch_translations(
    container: Container,
    translations_repository: &str,
    translations_branch: &str,
) -> Container {
    let atlas = format!(
        "--repository {} --revision {}",
        translations_repository, translations_branch
    );

    container
        .with_env_variable("DJANGO_SETTINGS_MODULE", "lms.envs.mitol.i18n")
        .with_workdir("/openedx/edx-platform")
        .with_shell(format!(
            "python manage.py lms pull_plugin_translations {} || true",
            atlas
        ))
        .with_shell("python manage.py lms compile_plugin_translations || true")
        .with_shell(format!(
            "python manage.py lms pull_xblock_translations {} || true",
            atlas
        ))
        .with_shell("python manage.py lms compile_xblock_translations || true")
        .with_shell(format!(
            "atlas pull {} translations/edx-platform/conf/locale:conf/locale || true",
            atlas
        ))
        .with_exec(["python", "manage.py", "lms", "compilemessages"])
        .with_exec(["python", "manage.py", "lms", "compilejsi18n"])
        .with_env_variable("DJANGO_SETTINGS_MODULE", "cms.envs.mitol.i18n")
        .with_shell("python manage.py cms compile_xblock_translations || true")
        .with_shell(format!(
            "atlas pull {} translations/studio-frontend/src/i18n/messages:conf/plugins-locale/studio-frontend || true",
            atlas
        ))
        .with_exec(["python", "manage.py", "cms", "compilejsi18n"])
}

/// Compile sass, bundle, and collect static files for the deployment theme
pub fn build_static_assets(container: Container, deployment_name: &str) -> Container {
    let collectstatic = |c: Container| {
        c.with_exec([
            "python",
            "manage.py",
            "lms",
            "collectstatic",
            "--noinput",
            "--settings=mitol.assets",
        ])
        .with_exec([
            "python",
            "manage.py",
            "cms",
            "collectstatic",
            "--noinput",
            "--settings=mitol.assets",
        ])
    };

    let container = container
        .with_env_variable("STATIC_ROOT_LMS", "/openedx/staticfiles/")
        .with_env_variable("NODE_ENV", "prod")
        .with_env_variable(
            "JS_ENV_EXTRA_CONFIG",
            r#"{"PROCTORTRACK_CDN_URL":"\"\"","PROCTORTRACK_CONFIG_KEY":"\"\""}"#,
        )
        .with_exec(["mkdir", "-p", "/openedx/staticfiles/"])
        .with_exec(["npm", "run", "postinstall"])
        .with_exec([
            "npm",
            "run",
            "compile-sass",
            "--",
            "--theme-dir",
            "/openedx/themes/",
            "--theme",
            deployment_name,
        ]);

    let container = collectstatic(container).with_exec(["npm", "run", "webpack"]);

    collectstatic(container)
        .with_exec([
            "rdfind",
            "-makesymlinks",
            "true",
            "-followsymlinks",
            "true",
            "/openedx/staticfiles/",
        ])
        .with_exec(["mkdir", "-p", "/openedx/data/export_course_repos"])
        .with_exec(["mkdir", "-p", "/openedx/data/var/log/edx"])
}

/// Final touches: bytecode, SSH known hosts, git config, image labels
pub fn docker_image(container: Container, deployment_name: &str, release_name: &str) -> Container {
    container
        .with_env_variable("DJANGO_SETTINGS_MODULE", "invalid")
        .with_exec([
            "python",
            "-m",
            "compileall",
            "-q",
            "/openedx/edx-platform",
            "/openedx/venv",
        ])
        .with_exec(["mkdir", "/openedx/.ssh"])
        .with_exec(["chown", "app:app", "/openedx/.ssh"])
        .with_exec(["chmod", "0700", "/openedx/.ssh"])
        .with_shell("ssh-keyscan 'github.com' 'github.mit.edu' >> /openedx/.ssh/known_hosts")
        .with_exec(["chmod", "0600", "/openedx/.ssh/known_hosts"])
        .with_exec(["mkdir", "-p", "/openedx/data/export_course_repos"])
        .with_exec(["git", "config", "--global", "--add", "safe.directory", "*"])
        .with_label("org.openedx.deployment", deployment_name)
        .with_label("org.openedx.release", release_name)
}

/// Everything needed for a complete platform image
#[derive(Debug, Clone)]
pub struct PlatformBuild {
    pub deployment_name: String,
    pub release_name: String,
    pub pip_package_lists: DirectoryRef,
    pub pip_package_overrides: DirectoryRef,
    pub custom_settings: DirectoryRef,
    pub source: Option<DirectoryRef>,
    pub platform_repo: String,
    pub platform_branch: String,
    pub theme_source: Option<DirectoryRef>,
    pub theme_repo: Option<String>,
    pub theme_branch: Option<String>,
    pub python_version: Option<String>,
    pub node_version: String,
    pub locale_version: String,
    pub translations_repo: String,
    pub translations_branch: String,
    pub include_locales: bool,
    pub tutor_version: String,
    pub app_user_id: u32,
}

impl PlatformBuild {
    pub fn new(
        deployment_name: impl Into<String>,
        release_name: impl Into<String>,
        pip_package_lists: DirectoryRef,
        pip_package_overrides: DirectoryRef,
        custom_settings: DirectoryRef,
    ) -> Self {
        Self {
            deployment_name: deployment_name.into(),
            release_name: release_name.into(),
            pip_package_lists,
            pip_package_overrides,
            custom_settings,
            source: None,
            platform_repo: DEFAULT_PLATFORM_REPO.to_string(),
            platform_branch: "master".to_string(),
            theme_source: None,
            theme_repo: None,
            theme_branch: None,
            python_version: None,
            node_version: DEFAULT_NODE_VERSION.to_string(),
            locale_version: DEFAULT_LOCALE_VERSION.to_string(),
            translations_repo: DEFAULT_TRANSLATIONS_REPO.to_string(),
            translations_branch: DEFAULT_TRANSLATIONS_BRANCH.to_string(),
            include_locales: true,
            tutor_version: DEFAULT_TUTOR_VERSION.to_string(),
            app_user_id: DEFAULT_APP_USER_ID,
        }
    }

    /// Explicit version, else the release's default
    pub fn python_version(&self) -> &str {
        self.python_version
            .as_deref()
            .unwrap_or_else(|| default_python_version(&self.release_name))
    }

    fn wants_theme(&self) -> bool {
        self.theme_source.is_some() || self.theme_repo.is_some()
    }

    /// Stages that will actually run for these parameters
    pub fn stages(&self) -> Vec<PlatformStage> {
        PlatformStage::sequence()
            .iter()
            .copied()
            .filter(|stage| match stage {
                PlatformStage::Locales => self.include_locales,
                PlatformStage::Themes => self.wants_theme(),
                _ => true,
            })
            .collect()
    }

    /// Chain every stage into one plan
    pub fn plan(&self) -> Result<Container, PlanError> {
        let mut container = apt_base(self.python_version());

        if self.include_locales {
            container = locales(container, &self.locale_version);
        }

        container = get_code(
            container,
            self.source.clone(),
            Some(&self.platform_repo),
            Some(&self.platform_branch),
        )?;

        container = install_deps(
            container,
            &DependencySet {
                deployment_name: self.deployment_name.clone(),
                release_name: self.release_name.clone(),
                pip_package_lists: self.pip_package_lists.clone(),
                pip_package_overrides: self.pip_package_overrides.clone(),
                node_version: self.node_version.clone(),
            },
        );

        if self.wants_theme() {
            container = themes(
                container,
                &self.deployment_name,
                self.theme_source.clone(),
                self.theme_repo.as_deref(),
                self.theme_branch.as_deref(),
            )?;
        }

        container = collected(
            container,
            &Collection {
                deployment_name: self.deployment_name.clone(),
                dockerize_bin: dockerize(),
                tutor_bin: tutor_utils(&self.tutor_version),
                custom_settings: self.custom_settings.clone(),
                app_user_id: self.app_user_id,
            },
        )?;

        container = fetch_translations(
            container,
            &self.translations_repo,
            &self.translations_branch,
        );
        container = build_static_assets(container, &self.deployment_name);

        Ok(docker_image(
            container,
            &self.deployment_name,
            &self.release_name,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::container::Op;

    fn has_exec(c: &Container, args: &[&str]) -> bool {
        c.execs().any(|e| e == args)
    }

    fn has_shell_containing(c: &Container, needle: &str) -> bool {
        c.execs()
            .any(|e| e.len() == 3 && e[0] == "sh" && e[1] == "-c" && e[2].contains(needle))
    }

    fn sample_build() -> PlatformBuild {
        PlatformBuild::new(
            "mitxonline",
            "sumac",
            DirectoryRef::host("/ci/pip_package_lists"),
            DirectoryRef::host("/ci/pip_package_overrides"),
            DirectoryRef::host("/ci/custom_settings"),
        )
    }

    #[test]
    fn test_apt_base_uses_python_version_and_uv() {
        let c = apt_base("3.12");
        assert_eq!(c.base, "python:3.12-bookworm");
        assert_eq!(c.env("VIRTUAL_ENV"), Some("/openedx/venv"));
        assert_eq!(c.env("UV_COMPILE_BYTECODE"), Some("1"));
        assert!(c.ops.iter().any(|op| matches!(
            op,
            Op::CopyFile { dest, source: FileRef::Container { container, path } }
                if dest == "/usr/local/bin/uv" && container.base == UV_IMAGE && path == "/uv"
        )));
        let install = c
            .execs()
            .find(|e| e.starts_with(&["apt".to_string(), "install".to_string()]))
            .unwrap();
        assert!(install.iter().any(|p| p == "libxmlsec1-openssl"));
        assert!(install.iter().any(|p| p == "rdfind"));
    }

    #[test]
    fn test_locales_clones_requested_ref() {
        let c = locales(Container::from_image("x"), "master");
        assert!(has_exec(
            &c,
            &[
                "git",
                "clone",
                "--depth",
                "1",
                "--branch",
                "master",
                I18N_REPO,
                "/tmp/openedx-i18n"
            ]
        ));
        assert!(has_shell_containing(&c, "/openedx/locale/contrib || true"));
    }

    #[test]
    fn test_get_code_prefers_local_source() {
        let c = get_code(
            Container::from_image("x"),
            Some(DirectoryRef::host("/src/edx-platform")),
            Some("https://example.com/repo"),
            Some("main"),
        )
        .unwrap();
        assert!(matches!(
            &c.ops[0],
            Op::CopyDirectory { dest, .. } if dest == "/openedx/edx-platform"
        ));
        assert!(!c.execs().any(|e| e[0] == "git"));
        assert!(has_exec(&c, &["uv", "venv", "/openedx/venv"]));
    }

    #[test]
    fn test_get_code_clones_from_git() {
        let c = get_code(
            Container::from_image("x"),
            None,
            Some(DEFAULT_PLATFORM_REPO),
            Some("open-release/sumac.master"),
        )
        .unwrap();
        assert!(has_exec(
            &c,
            &[
                "git",
                "clone",
                "--depth",
                "1",
                "--branch",
                "open-release/sumac.master",
                DEFAULT_PLATFORM_REPO,
                "/openedx/edx-platform"
            ]
        ));
    }

    #[test]
    fn test_get_code_without_source_fails() {
        let err = get_code(Container::from_image("x"), None, Some("repo"), None).unwrap_err();
        assert!(matches!(err, PlanError::MissingSource { local: "source", .. }));
    }

    #[test]
    fn test_themes_requires_source() {
        let err = themes(Container::from_image("x"), "mitx", None, None, None).unwrap_err();
        assert!(err.to_string().contains("theme_source"));

        let c = themes(
            Container::from_image("x"),
            "mitx",
            None,
            Some("https://github.com/mitodl/mitx-theme"),
            Some("main"),
        )
        .unwrap();
        assert!(c
            .execs()
            .any(|e| e.last().map(String::as_str) == Some("/openedx/themes/mitx")));
    }

    #[test]
    fn test_install_deps_manifest_paths() {
        let deps = DependencySet {
            deployment_name: "mitx".into(),
            release_name: "redwood".into(),
            pip_package_lists: DirectoryRef::host("/lists"),
            pip_package_overrides: DirectoryRef::host("/overrides"),
            node_version: "20.18.0".into(),
        };
        let c = install_deps(Container::from_image("x"), &deps);
        assert!(c.execs().any(
            |e| e.last().map(String::as_str) == Some("/root/pip_package_lists/redwood/mitx.txt")
        ));
        assert!(c.execs().any(
            |e| e.last().map(String::as_str) == Some("/root/pip_package_overrides/redwood/mitx.txt")
        ));
        assert!(has_shell_containing(&c, "--node=20.18.0 --prebuilt"));
        assert!(!has_exec(&c, &["uv", "pip", "uninstall", "edx-name-affirmation"]));
    }

    #[test]
    fn test_install_deps_mitxonline_drops_name_affirmation() {
        let deps = DependencySet {
            deployment_name: "mitxonline".into(),
            release_name: "sumac".into(),
            pip_package_lists: DirectoryRef::host("/lists"),
            pip_package_overrides: DirectoryRef::host("/overrides"),
            node_version: "20.18.0".into(),
        };
        let c = install_deps(Container::from_image("x"), &deps);
        assert!(has_exec(&c, &["uv", "pip", "uninstall", "edx-name-affirmation"]));
    }

    #[test]
    fn test_collected_rejects_root() {
        let collection = Collection {
            deployment_name: "mitx".into(),
            dockerize_bin: dockerize(),
            tutor_bin: tutor_utils(DEFAULT_TUTOR_VERSION),
            custom_settings: DirectoryRef::host("/settings"),
            app_user_id: 0,
        };
        let err = collected(Container::from_image("x"), &collection).unwrap_err();
        assert!(matches!(err, PlanError::RootAppUser));
    }

    #[test]
    fn test_collected_switches_to_app_user() {
        let collection = Collection {
            deployment_name: "mitx".into(),
            dockerize_bin: dockerize(),
            tutor_bin: tutor_utils(DEFAULT_TUTOR_VERSION),
            custom_settings: DirectoryRef::host("/settings"),
            app_user_id: 1234,
        };
        let c = collected(Container::from_image("x"), &collection).unwrap();
        assert_eq!(c.user(), Some("1234"));
        assert!(has_exec(&c, &["chown", "-R", "1234:1234", "/openedx"]));
        assert!(has_exec(
            &c,
            &[
                "cp",
                "/tmp/custom_settings/saml_pull.py",
                "/openedx/edx-platform/saml_pull.py"
            ]
        ));
        assert_eq!(c.env("LMS_CFG"), Some("/openedx/config/lms.env.yml"));
        assert_eq!(c.env("NO_PREREQ_INSTALL"), Some("0"));
    }

    #[test]
    fn test_fetch_translations_strict_and_lenient_steps() {
        let c = fetch_translations(Container::from_image("x"), "mitodl/t", "main");
        assert!(has_shell_containing(
            &c,
            "pull_plugin_translations --repository mitodl/t --revision main || true"
        ));
        assert!(has_exec(&c, &["python", "manage.py", "lms", "compilemessages"]));
        assert!(has_exec(&c, &["python", "manage.py", "cms", "compilejsi18n"]));
        assert_eq!(c.env("DJANGO_SETTINGS_MODULE"), Some("cms.envs.mitol.i18n"));
    }

    #[test]
    fn test_static_assets_collects_twice() {
        let c = build_static_assets(Container::from_image("x"), "mitxonline");
        let lms_collect = [
            "python",
            "manage.py",
            "lms",
            "collectstatic",
            "--noinput",
            "--settings=mitol.assets",
        ];
        assert_eq!(c.execs().filter(|e| *e == lms_collect).count(), 2);
        assert!(c
            .execs()
            .any(|e| e.first().map(String::as_str) == Some("npm")
                && e.last().map(String::as_str) == Some("mitxonline")));
        assert_eq!(c.env("NODE_ENV"), Some("prod"));
    }

    #[test]
    fn test_docker_image_labels() {
        let c = docker_image(Container::from_image("x"), "mitx", "sumac");
        assert_eq!(c.env("DJANGO_SETTINGS_MODULE"), Some("invalid"));
        assert!(c.ops.iter().any(|op| matches!(
            op,
            Op::Label { name, value } if name == "org.openedx.release" && value == "sumac"
        )));
    }

    #[test]
    fn test_platform_build_defaults_python_by_release() {
        let mut build = sample_build();
        assert_eq!(build.python_version(), "3.11");
        build.release_name = "master".into();
        assert_eq!(build.python_version(), "3.12");
        build.python_version = Some("3.13".into());
        assert_eq!(build.python_version(), "3.13");
    }

    #[test]
    fn test_platform_build_skips_optional_stages() {
        let mut build = sample_build();
        build.include_locales = false;
        let stages = build.stages();
        assert!(!stages.contains(&PlatformStage::Locales));
        assert!(!stages.contains(&PlatformStage::Themes));

        let plan = build.plan().unwrap();
        assert_eq!(plan.base, "python:3.11-bookworm");
        assert!(!plan
            .execs()
            .any(|e| e.iter().any(|a| a == "/tmp/openedx-i18n")));
    }

    #[test]
    fn test_platform_build_full_plan() {
        let mut build = sample_build();
        build.theme_repo = Some("https://github.com/mitodl/mitxonline-theme".into());
        build.theme_branch = Some("main".into());
        assert_eq!(build.stages().len(), PlatformStage::sequence().len());

        let plan = build.plan().unwrap();
        assert_eq!(plan.user(), Some("1000"));
        assert!(plan
            .execs()
            .any(|e| e.last().map(String::as_str) == Some("/openedx/themes/mitxonline")));
        assert!(has_exec(
            &plan,
            &["git", "config", "--global", "--add", "safe.directory", "*"]
        ));
    }

    #[test]
    fn test_platform_build_theme_repo_without_branch_fails() {
        let mut build = sample_build();
        build.theme_repo = Some("https://github.com/mitodl/mitxonline-theme".into());
        assert!(build.plan().is_err());
    }
}
