//! Container engine adapter
//!
//! Realizes plans with `docker buildx build`. BuildKit owns caching,
//! content addressing and the parallel scheduling of independent stages;
//! this adapter only writes the Containerfile and passes the build contexts.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use super::containerfile::{self, Containerfile};
use crate::config::EngineConfig;
use crate::domain::container::{Container, DirectoryRef, FileRef};
use crate::error::EngineError;
use crate::tools::{self, names};

/// What a build leaves behind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutput {
    /// Load into the local image store, writing the image id to `iidfile`
    Load { tags: Vec<String>, iidfile: PathBuf },
    /// Copy the target stage's filesystem to a host directory
    Local { dest: PathBuf },
}

/// Client for the container engine CLI
pub struct ContainerEngine {
    binary: String,
    platform: Option<String>,
    progress: String,
}

impl ContainerEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            binary: tools::get_tool_path(names::DOCKER),
            platform: config.platform.clone(),
            progress: config.progress.clone(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Fail early when the engine binary cannot be found
    pub fn ensure_available(&self) -> Result<(), EngineError> {
        if tools::locate(names::DOCKER).is_none() {
            return Err(EngineError::NotInstalled {
                binary: self.binary.clone(),
            });
        }
        Ok(())
    }

    /// Arguments for `docker buildx build`
    pub fn build_args(
        &self,
        file: &Containerfile,
        dockerfile: &Path,
        context_dir: &Path,
        output: &BuildOutput,
    ) -> Vec<String> {
        let mut args = vec![
            "buildx".to_string(),
            "build".to_string(),
            "--file".to_string(),
            dockerfile.display().to_string(),
            "--target".to_string(),
            file.target.clone(),
            "--progress".to_string(),
            self.progress.clone(),
        ];

        if let Some(platform) = &self.platform {
            args.push("--platform".to_string());
            args.push(platform.clone());
        }

        for (name, path) in &file.contexts {
            args.push("--build-context".to_string());
            args.push(format!("{}={}", name, path.display()));
        }

        match output {
            BuildOutput::Load { tags, iidfile } => {
                args.push("--load".to_string());
                args.push("--iidfile".to_string());
                args.push(iidfile.display().to_string());
                for tag in tags {
                    args.push("--tag".to_string());
                    args.push(tag.clone());
                }
            }
            BuildOutput::Local { dest } => {
                args.push("--output".to_string());
                args.push(format!("type=local,dest={}", dest.display()));
            }
        }

        args.push(context_dir.display().to_string());
        args
    }

    /// Write the Containerfile to a scratch workspace and run the build
    ///
    /// Returns the image id for [`BuildOutput::Load`].
    async fn run_build(
        &self,
        file: &Containerfile,
        label: &str,
        output: impl FnOnce(&Path) -> BuildOutput,
    ) -> Result<Option<String>, EngineError> {
        let workspace = tempfile::tempdir()?;
        let dockerfile = workspace.path().join("Containerfile");
        tokio::fs::write(&dockerfile, &file.text).await?;

        let output = output(workspace.path());
        let args = self.build_args(file, &dockerfile, workspace.path(), &output);
        debug!("{} {}", self.binary, args.join(" "));

        // Engine output goes to stderr; stdout carries artifacts.
        let status = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(std::io::stderr()))
            .stderr(Stdio::inherit())
            .status()
            .await?;

        if !status.success() {
            return Err(EngineError::BuildFailed {
                target: label.to_string(),
                code: status.code(),
            });
        }

        match &output {
            BuildOutput::Load { iidfile, .. } => {
                let id = tokio::fs::read_to_string(iidfile).await?;
                Ok(Some(id.trim().to_string()))
            }
            BuildOutput::Local { .. } => Ok(None),
        }
    }

    /// Build a plan into the local image store and return the image id
    pub async fn build(
        &self,
        container: &Container,
        label: &str,
        tags: &[String],
    ) -> Result<String, EngineError> {
        let file = containerfile::render(container);
        let tags = tags.to_vec();
        let id = self
            .run_build(&file, label, |workspace| BuildOutput::Load {
                tags,
                iidfile: workspace.join("image.iid"),
            })
            .await?
            .filter(|id| !id.is_empty())
            .ok_or(EngineError::MissingImageId)?;

        info!("Built {} as {}", label, id);
        Ok(id)
    }

    /// Copy a directory produced by a plan to the host
    pub async fn export_directory(
        &self,
        dir: &DirectoryRef,
        dest: &Path,
    ) -> Result<(), EngineError> {
        let file = containerfile::render_directory_export(dir)?;
        let dest = dest.to_path_buf();
        self.run_build(&file, "directory export", move |_| BuildOutput::Local { dest })
            .await?;
        Ok(())
    }

    /// Copy a file produced by a plan into a host directory
    pub async fn export_file(&self, file_ref: &FileRef, dest: &Path) -> Result<(), EngineError> {
        let file = containerfile::render_file_export(file_ref)?;
        let dest = dest.to_path_buf();
        self.run_build(&file, "file export", move |_| BuildOutput::Local { dest })
            .await?;
        Ok(())
    }

    /// Build a plan and run it in the foreground with the port published
    pub async fn serve(
        &self,
        container: &Container,
        label: &str,
        port: u16,
    ) -> Result<(), EngineError> {
        let image_id = self.build(container, label, &[]).await?;
        let publish = format!("{}:{}", port, port);

        info!("Serving {} on http://localhost:{}", label, port);
        let status = Command::new(&self.binary)
            .args(["run", "--rm", "--init", "-p", &publish, &image_id])
            .stdin(Stdio::null())
            .stdout(Stdio::from(std::io::stderr()))
            .stderr(Stdio::inherit())
            .status()
            .await?;

        if !status.success() {
            return Err(EngineError::RunFailed {
                target: label.to_string(),
                code: status.code(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(platform: Option<&str>) -> ContainerEngine {
        ContainerEngine {
            binary: "docker".to_string(),
            platform: platform.map(str::to_string),
            progress: "plain".to_string(),
        }
    }

    #[test]
    fn test_load_args() {
        let c = Container::from_image("alpine")
            .with_directory("/src", DirectoryRef::host("/work/src"));
        let file = containerfile::render(&c);
        let args = engine(Some("linux/amd64")).build_args(
            &file,
            Path::new("/tmp/ws/Containerfile"),
            Path::new("/tmp/ws"),
            &BuildOutput::Load {
                tags: vec!["lehrer/platform:dev".to_string()],
                iidfile: PathBuf::from("/tmp/ws/image.iid"),
            },
        );

        assert_eq!(&args[..2], ["buildx", "build"]);
        let joined = args.join(" ");
        assert!(joined.contains("--target stage-0"));
        assert!(joined.contains("--platform linux/amd64"));
        assert!(joined.contains("--build-context ctx-0=/work/src"));
        assert!(joined.contains("--load --iidfile /tmp/ws/image.iid --tag lehrer/platform:dev"));
        assert_eq!(args.last().map(String::as_str), Some("/tmp/ws"));
    }

    #[test]
    fn test_local_output_args() {
        let dist = Container::from_image("node").directory("/app/mfe/dist");
        let file = containerfile::render_directory_export(&dist).unwrap();
        let args = engine(None).build_args(
            &file,
            Path::new("/tmp/ws/Containerfile"),
            Path::new("/tmp/ws"),
            &BuildOutput::Local {
                dest: PathBuf::from("/out/dist"),
            },
        );

        let joined = args.join(" ");
        assert!(joined.contains("--target export"));
        assert!(joined.contains("--output type=local,dest=/out/dist"));
        assert!(!joined.contains("--platform"));
        assert!(!joined.contains("--load"));
    }

    #[tokio::test]
    async fn test_export_host_directory_is_rejected() {
        let err = engine(None)
            .export_directory(&DirectoryRef::host("/tmp"), Path::new("/tmp/out"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::HostArtifact { .. }));
    }
}
