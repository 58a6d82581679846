//! Companion service images: codejail and edx-notes-api

use super::container::{Container, DirectoryRef};
use super::release::{default_python_version, MASTER_RELEASE};

pub const CODEJAIL_SERVICE_REPO: &str = "https://github.com/eduNEXT/codejailservice/";
pub const NOTES_REPO: &str = "https://github.com/edx/edx-notes-api";
pub const DEFAULT_NOTES_PYTHON: &str = "3.11";

const SANDBOX_REQUIREMENTS_BASE: &str =
    "https://raw.githubusercontent.com/openedx/edx-platform/master/requirements/edx-sandbox";

/// Sandbox requirements pinned for a release line
pub fn sandbox_requirements_url(release_name: &str) -> String {
    if release_name == MASTER_RELEASE {
        format!("{}/base.txt", SANDBOX_REQUIREMENTS_BASE)
    } else {
        format!("{}/releases/{}.txt", SANDBOX_REQUIREMENTS_BASE, release_name)
    }
}

/// Sandboxed Python execution service
///
/// `config` must contain the `01-sandbox` sudoers file.
pub fn build_codejail(
    release_name: &str,
    python_version: Option<&str>,
    config: &DirectoryRef,
) -> Container {
    let python_version = python_version.unwrap_or_else(|| default_python_version(release_name));

    Container::from_image(format!("python:{}-slim-trixie", python_version))
        .with_exec(["bash", "-c", "echo 'shell configured'"])
        .with_env_variable("DEBIAN_FRONTEND", "noninteractive")
        .with_env_variable("DEBCONF_NONINTERACTIVE_SEEN", "true")
        .with_env_variable("CODEJAIL_GROUP", "sandbox")
        .with_env_variable("CODEJAIL_SANDBOX_CALLER", "debian")
        .with_env_variable("CODEJAIL_USER", "sandbox")
        .with_env_variable("CODEJAIL_VENV", "/sandbox/venv")
        .with_env_variable("OPEN_EDX_RELEASE", release_name)
        .with_env_variable("OPEN_EDX_BRANCH", release_name)
        .with_exec(["apt-get", "update"])
        .with_exec([
            "apt",
            "install",
            "-y",
            "--no-install-recommends",
            "build-essential",
            "python3-virtualenv",
            "python3-pip",
            "git",
            "sudo",
            "libxslt-dev",
        ])
        .with_exec(["apt", "clean"])
        .with_shell("rm -rf /var/lib/apt/lists/*")
        .with_exec([
            "virtualenv",
            "-p",
            &format!("python{}", python_version),
            "--always-copy",
            "/sandbox/venv",
        ])
        .with_exec(["addgroup", "sandbox"])
        .with_exec([
            "adduser",
            "--disabled-login",
            "--disabled-password",
            "sandbox",
            "--ingroup",
            "sandbox",
        ])
        .with_exec(["addgroup", "debian"])
        .with_exec([
            "adduser",
            "--disabled-login",
            "--disabled-password",
            "debian",
            "--ingroup",
            "debian",
        ])
        .with_exec(["chown", "-R", "sandbox:sandbox", "/sandbox/venv"])
        .with_env_variable("PATH", "/sandbox/venv/bin:/usr/local/bin:/usr/bin:/bin")
        .with_workdir("/codejail")
        .with_exec([
            "git",
            "clone",
            CODEJAIL_SERVICE_REPO,
            "--branch",
            "main",
            "--depth",
            "1",
            "/codejail",
        ])
        .with_file("/etc/sudoers.d/01-sandbox", config.file("01-sandbox"))
        .with_exec(["pip", "install", "--no-cache-dir", "-r", "requirements/base.txt"])
        .with_exec(["pip", "install", "--no-cache-dir", "gunicorn"])
        .with_exec([
            "bash".to_string(),
            "-c".to_string(),
            format!(
                "source /sandbox/venv/bin/activate && pip install --no-cache-dir -r {} && deactivate",
                sandbox_requirements_url(release_name)
            ),
        ])
        .with_exec(["chmod", "0440", "/etc/sudoers.d/01-sandbox"])
        .with_exec(["chown", "-R", "debian:debian", "/codejail"])
        .with_user("debian")
        .with_exposed_port(8000)
        .with_entrypoint([
            "gunicorn",
            "-b",
            "0.0.0.0:8000",
            "--workers",
            "2",
            "--max-requests=1000",
            "wsgi",
        ])
}

/// Student annotation API
///
/// `release_name` is the notes repository branch or tag; `config` must
/// contain `env_config.py`.
pub fn build_notes(release_name: &str, python_version: &str, config: &DirectoryRef) -> Container {
    Container::from_image(format!("python:{}-slim", python_version))
        .with_exec(["apt", "update"])
        .with_exec([
            "apt",
            "install",
            "-y",
            "git",
            "mariadb-client",
            "default-libmysqlclient-dev",
            "build-essential",
            "pkg-config",
        ])
        .with_exec(["apt", "clean"])
        .with_exec([
            "useradd",
            "--home-dir",
            "/app",
            "--create-home",
            "--shell",
            "/bin/bash",
            "--uid",
            "1000",
            "app",
        ])
        .with_user("1000")
        .with_workdir("/app/edx-notes-api")
        .with_env_variable("PATH", "/app/.local/bin:/usr/local/bin:/usr/bin:/bin")
        .with_exec([
            "git",
            "clone",
            NOTES_REPO,
            "--branch",
            release_name,
            "--depth",
            "1",
            "/app/edx-notes-api",
        ])
        .with_exec(["pip", "install", "--no-cache-dir", "-r", "requirements/base.txt"])
        .with_file(
            "/app/edx-notes-api/notesserver/settings/env_config.py",
            config.file("env_config.py"),
        )
        .with_env_variable("APP_PORT", "8000")
        .with_exposed_port(8000)
        .with_entrypoint([
            "gunicorn",
            "--workers=2",
            "--name",
            "notes",
            "--bind=0.0.0.0:8000",
            "--max-requests=1000",
            "notesserver.wsgi:application",
        ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::container::{FileRef, Op};

    #[test]
    fn test_sandbox_requirements_url() {
        assert!(sandbox_requirements_url("master").ends_with("/edx-sandbox/base.txt"));
        assert!(sandbox_requirements_url("sumac").ends_with("/edx-sandbox/releases/sumac.txt"));
    }

    #[test]
    fn test_codejail_defaults_python_by_release() {
        let config = DirectoryRef::host("/cfg/codejail_config");
        assert_eq!(
            build_codejail("master", None, &config).base,
            "python:3.12-slim-trixie"
        );
        assert_eq!(
            build_codejail("redwood", None, &config).base,
            "python:3.11-slim-trixie"
        );
        assert_eq!(
            build_codejail("redwood", Some("3.10"), &config).base,
            "python:3.10-slim-trixie"
        );
    }

    #[test]
    fn test_codejail_runs_gunicorn_as_debian() {
        let c = build_codejail("sumac", None, &DirectoryRef::host("/cfg"));
        assert_eq!(c.user(), Some("debian"));
        assert_eq!(c.entrypoint().unwrap()[0], "gunicorn");
        assert_eq!(c.env("OPEN_EDX_RELEASE"), Some("sumac"));
        assert!(c.ops.iter().any(|op| matches!(
            op,
            Op::CopyFile { dest, source: FileRef::Host { path } }
                if dest == "/etc/sudoers.d/01-sandbox" && path.ends_with("01-sandbox")
        )));
        assert!(c.execs().any(|e| e[0] == "virtualenv" && e[2] == "python3.11"));
    }

    #[test]
    fn test_notes_image() {
        let c = build_notes(
            "open-release/sumac.master",
            DEFAULT_NOTES_PYTHON,
            &DirectoryRef::host("/cfg/notes_config"),
        );
        assert_eq!(c.base, "python:3.11-slim");
        assert_eq!(c.user(), Some("1000"));
        assert_eq!(c.env("APP_PORT"), Some("8000"));
        assert!(c.ops.contains(&Op::ExposePort { port: 8000 }));
        assert_eq!(
            c.entrypoint().unwrap().last().map(String::as_str),
            Some("notesserver.wsgi:application")
        );
        assert!(c
            .execs()
            .any(|e| e.iter().any(|a| a == "open-release/sumac.master")));
    }
}
