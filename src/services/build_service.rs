//! Build service - realizes plans with events and progress
//!
//! Wraps the engine so every build, export, serve and publish is bracketed
//! by `BuildStarted` and `BuildCompleted`/`BuildFailed` events.

use anyhow::{Context, Result};
use std::path::Path;
use std::time::Instant;
use tracing::info;

use crate::domain::{Artifact, Container, ImageRef};
use crate::error::PlanError;
use crate::infrastructure::{ContainerEngine, PublishedImage, RegistryClient};
use crate::observability::{
    emit_event, BuildEvent, BuildTracker, EventMetadata, PublishCompletedEvent,
};
use crate::ui;

/// Service for running plans through the engine
pub struct BuildService {
    engine: ContainerEngine,
}

impl BuildService {
    pub fn new(engine: ContainerEngine) -> Self {
        Self { engine }
    }

    /// Build into the local image store and return the image id
    pub async fn build(
        &self,
        container: &Container,
        metadata: EventMetadata,
        tags: &[String],
        stages: Vec<String>,
    ) -> Result<String> {
        self.engine.ensure_available()?;

        let label = metadata.target.clone();
        let tracker = BuildTracker::start(metadata, container.digest(), stages);
        info!("Building {} ({} operations)", label, container.ops.len());

        match self.engine.build(container, &label, tags).await {
            Ok(image_id) => {
                tracker.completed(Some(image_id.clone()));
                Ok(image_id)
            }
            Err(e) => {
                tracker.failed(&e);
                Err(e).with_context(|| format!("Failed to build {}", label))
            }
        }
    }

    /// Copy a file or directory artifact to a host directory
    pub async fn export(
        &self,
        artifact: &Artifact,
        dest: &Path,
        metadata: EventMetadata,
    ) -> Result<()> {
        if let Artifact::Container(_) = artifact {
            return Err(PlanError::WrongArtifact {
                expected: "file or directory",
                actual: artifact.kind(),
            }
            .into());
        }
        self.engine.ensure_available()?;

        let tracker = BuildTracker::start(metadata, plan_digest(artifact)?, Vec::new());
        let result = match artifact {
            Artifact::Directory(dir) => self.engine.export_directory(dir, dest).await,
            Artifact::File(file) => self.engine.export_file(file, dest).await,
            Artifact::Container(_) => Ok(()),
        };

        match result {
            Ok(()) => {
                tracker.completed(None);
                info!("Exported {} to {}", artifact.kind(), dest.display());
                Ok(())
            }
            Err(e) => {
                tracker.failed(&e);
                Err(e).with_context(|| format!("Failed to export to {}", dest.display()))
            }
        }
    }

    /// Build and run a service in the foreground
    pub async fn serve(
        &self,
        container: &Container,
        metadata: EventMetadata,
        port: u16,
    ) -> Result<()> {
        self.engine.ensure_available()?;

        let label = metadata.target.clone();
        let tracker = BuildTracker::start(metadata, container.digest(), Vec::new());
        ui::print_info(&format!("Serving {} on http://localhost:{}", label, port));

        match self.engine.serve(container, &label, port).await {
            Ok(()) => {
                tracker.completed(None);
                Ok(())
            }
            Err(e) => {
                tracker.failed(&e);
                Err(e).with_context(|| format!("Failed to serve {}", label))
            }
        }
    }

    /// Build a plan and push it under every given reference
    pub async fn publish(
        &self,
        container: &Container,
        metadata: EventMetadata,
        registry: &RegistryClient,
        images: &[ImageRef],
        stages: Vec<String>,
    ) -> Result<Vec<PublishedImage>> {
        let image_id = self
            .build(container, metadata.clone(), &[], stages)
            .await?;

        let start = Instant::now();
        let spinner = ui::spinner(format!("Pushing {} image(s)...", images.len()));
        let pushed = registry.publish(&image_id, images).await;
        spinner.finish_and_clear();
        let pushed = pushed.with_context(|| format!("Failed to publish {}", metadata.target))?;

        let registry_host = images
            .first()
            .map(|image| image.registry.clone())
            .unwrap_or_default();
        emit_event(BuildEvent::PublishCompleted(PublishCompletedEvent {
            metadata,
            duration_secs: start.elapsed().as_secs_f64(),
            registry: registry_host,
            images: pushed.iter().map(ToString::to_string).collect(),
        }));

        for image in &pushed {
            ui::print_success(&format!("Pushed {}", image));
        }
        Ok(pushed)
    }
}

/// Digest of the plan behind a file or directory artifact
fn plan_digest(artifact: &Artifact) -> Result<String, PlanError> {
    use sha2::{Digest, Sha256};

    let bytes = serde_json::to_vec(artifact)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}
