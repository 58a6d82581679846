//! Container registry operations
//!
//! Handles login, tagging and pushing through the container engine CLI.
//! Failures carry the engine's own stderr; nothing is retried.

use regex::Regex;
use std::fmt;
use std::process::Stdio;
use std::sync::OnceLock;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::domain::ImageRef;
use crate::error::RegistryError;

/// Registry credentials for authentication
#[derive(Clone)]
pub struct RegistryCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for RegistryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl RegistryCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Credentials are used only when both parts are present
    ///
    /// A password without a username is a caller mistake; a username alone
    /// means the engine's stored login is used.
    pub fn from_parts(
        username: Option<String>,
        password: Option<String>,
    ) -> Result<Option<Self>, RegistryError> {
        match (username, password) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Ok(Some(Self::new(u, p))),
            (None, Some(p)) if !p.is_empty() => Err(RegistryError::MissingUsername),
            _ => Ok(None),
        }
    }
}

/// A pushed image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedImage {
    pub reference: String,
    pub digest: Option<String>,
}

impl fmt::Display for PublishedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.digest {
            Some(digest) => write!(f, "{}@{}", self.reference, digest),
            None => write!(f, "{}", self.reference),
        }
    }
}

fn digest_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"digest: (sha256:[0-9a-f]{64})").expect("digest pattern is valid")
    })
}

/// Extract the manifest digest from `docker push` output
pub fn parse_push_digest(output: &str) -> Option<String> {
    digest_pattern()
        .captures_iter(output)
        .last()
        .map(|c| c[1].to_string())
}

/// Client for container registry operations
pub struct RegistryClient {
    binary: String,
    credentials: Option<RegistryCredentials>,
}

impl RegistryClient {
    pub fn new(binary: impl Into<String>, credentials: Option<RegistryCredentials>) -> Self {
        Self {
            binary: binary.into(),
            credentials,
        }
    }

    /// Log in to the registry with the password on stdin
    pub async fn login(&self, registry: &str) -> Result<(), RegistryError> {
        let Some(credentials) = &self.credentials else {
            debug!("No credentials given for {}, using stored engine login", registry);
            return Ok(());
        };

        info!("Logging in to {} as {}", registry, credentials.username);
        let mut child = Command::new(&self.binary)
            .args([
                "login",
                registry,
                "--username",
                &credentials.username,
                "--password-stdin",
            ])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(credentials.password.as_bytes()).await?;
            drop(stdin);
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(RegistryError::AuthFailed {
                registry: registry.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    /// Tag a local image with the target reference
    pub async fn tag(&self, image_id: &str, image: &ImageRef) -> Result<(), RegistryError> {
        let reference = image.to_string();
        let output = Command::new(&self.binary)
            .args(["tag", image_id, &reference])
            .output()
            .await?;

        if !output.status.success() {
            return Err(RegistryError::TagFailed {
                reference,
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    /// Push a tagged reference
    pub async fn push(&self, image: &ImageRef) -> Result<PublishedImage, RegistryError> {
        let reference = image.to_string();
        info!("Pushing {}", reference);

        let output = Command::new(&self.binary)
            .args(["push", &reference])
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(RegistryError::PushFailed {
                reference,
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let digest = parse_push_digest(&String::from_utf8_lossy(&output.stdout));
        Ok(PublishedImage { reference, digest })
    }

    /// Login, tag and push one local image under one or more tags
    pub async fn publish(
        &self,
        image_id: &str,
        images: &[ImageRef],
    ) -> Result<Vec<PublishedImage>, RegistryError> {
        let mut logged_in: Vec<&str> = Vec::new();
        let mut pushed = Vec::with_capacity(images.len());

        for image in images {
            if !logged_in.contains(&image.registry.as_str()) {
                self.login(&image.registry).await?;
                logged_in.push(&image.registry);
            }
            self.tag(image_id, image).await?;
            pushed.push(self.push(image).await?);
        }

        Ok(pushed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_require_both_parts() {
        let creds =
            RegistryCredentials::from_parts(Some("bot".into()), Some("token".into())).unwrap();
        assert_eq!(creds.unwrap().username, "bot");

        assert!(RegistryCredentials::from_parts(Some("bot".into()), None)
            .unwrap()
            .is_none());
        assert!(RegistryCredentials::from_parts(None, None).unwrap().is_none());
        assert!(matches!(
            RegistryCredentials::from_parts(None, Some("token".into())),
            Err(RegistryError::MissingUsername)
        ));
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = RegistryCredentials::new("bot", "hunter2");
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("bot"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_parse_push_digest() {
        let output = "The push refers to repository [ghcr.io/mitodl/openedx-platform]\n\
            5f70bf18a086: Pushed\n\
            latest: digest: sha256:0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef size: 4923\n";
        assert_eq!(
            parse_push_digest(output).as_deref(),
            Some("sha256:0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef")
        );
        assert_eq!(parse_push_digest("no digest here"), None);
    }

    #[test]
    fn test_published_image_display() {
        let image = PublishedImage {
            reference: "ghcr.io/mitodl/notes:latest".into(),
            digest: Some("sha256:abc".into()),
        };
        assert_eq!(image.to_string(), "ghcr.io/mitodl/notes:latest@sha256:abc");

        let bare = PublishedImage {
            reference: "ghcr.io/mitodl/notes:latest".into(),
            digest: None,
        };
        assert_eq!(bare.to_string(), "ghcr.io/mitodl/notes:latest");
    }

    #[tokio::test]
    async fn test_login_without_credentials_is_noop() {
        let client = RegistryClient::new("lehrer-no-such-engine", None);
        assert!(client.login("ghcr.io").await.is_ok());
    }

    #[cfg(unix)]
    const DIGEST: &str = "sha256:0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

    /// Fake engine that records each invocation and the login password
    #[cfg(unix)]
    fn fake_engine(dir: &std::path::Path, login_fails: bool) -> String {
        use std::os::unix::fs::PermissionsExt;

        let calls = dir.join("calls.log");
        let stdin = dir.join("login-stdin");
        let login = if login_fails {
            "cat > /dev/null; echo 'unauthorized: incorrect username or password' >&2; exit 1"
        } else {
            "cat > \"$STDIN_LOG\""
        };
        let script = format!(
            "#!/bin/sh\n\
             STDIN_LOG='{stdin}'\n\
             echo \"$*\" >> '{calls}'\n\
             case \"$1\" in\n\
             login) {login} ;;\n\
             push) echo \"latest: digest: {digest} size: 4923\" ;;\n\
             esac\n\
             exit 0\n",
            stdin = stdin.display(),
            calls = calls.display(),
            login = login,
            digest = DIGEST,
        );

        let path = dir.join("docker");
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.display().to_string()
    }

    #[cfg(unix)]
    fn recorded_calls(dir: &std::path::Path) -> Vec<String> {
        std::fs::read_to_string(dir.join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_login_carries_engine_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let client = RegistryClient::new(
            fake_engine(dir.path(), true),
            Some(RegistryCredentials::new("bot", "wrong-token")),
        );
        let image = ImageRef::new("ghcr.io", "mitodl/openedx-platform", "sumac").unwrap();

        let err = client.publish("sha256:feed", &[image]).await.unwrap_err();
        match err {
            RegistryError::AuthFailed { registry, message } => {
                assert_eq!(registry, "ghcr.io");
                assert_eq!(message, "unauthorized: incorrect username or password");
            }
            other => panic!("unexpected {:?}", other),
        }

        // Nothing is tagged or pushed after a failed login
        let calls = recorded_calls(dir.path());
        assert_eq!(calls, vec!["login ghcr.io --username bot --password-stdin"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_publish_logs_in_once_per_registry() {
        let dir = tempfile::tempdir().unwrap();
        let client = RegistryClient::new(
            fake_engine(dir.path(), false),
            Some(RegistryCredentials::new("bot", "s3cret")),
        );
        let images = vec![
            ImageRef::new("ghcr.io", "mitodl/openedx-platform", "sumac").unwrap(),
            ImageRef::new("ghcr.io", "mitodl/openedx-platform", "latest").unwrap(),
        ];

        let published = client.publish("sha256:feed", &images).await.unwrap();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0].reference, "ghcr.io/mitodl/openedx-platform:sumac");
        assert_eq!(published[1].digest.as_deref(), Some(DIGEST));

        let calls = recorded_calls(dir.path());
        assert_eq!(
            calls,
            vec![
                "login ghcr.io --username bot --password-stdin",
                "tag sha256:feed ghcr.io/mitodl/openedx-platform:sumac",
                "push ghcr.io/mitodl/openedx-platform:sumac",
                "tag sha256:feed ghcr.io/mitodl/openedx-platform:latest",
                "push ghcr.io/mitodl/openedx-platform:latest",
            ]
        );

        // The password goes over stdin, never argv
        let password = std::fs::read_to_string(dir.path().join("login-stdin")).unwrap();
        assert_eq!(password, "s3cret");
        assert!(calls.iter().all(|call| !call.contains("s3cret")));
    }
}
