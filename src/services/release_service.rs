//! Release service - builds and publishes a set of images under one tag
//!
//! A release is the platform image plus its companion services, each pushed
//! to its own repository. Entries run in release order and the first failure
//! stops the release.

use anyhow::Result;
use colored::Colorize;
use std::time::Duration;
use tracing::info;

use super::BuildService;
use crate::domain::{Container, ImageRef};
use crate::infrastructure::{PublishedImage, RegistryClient};
use crate::observability::{EventMetadata, ReleaseTracker, StepDuration, StepStatus};
use crate::ui;

/// One image of a release
#[derive(Debug, Clone)]
pub struct ReleaseTarget {
    /// Short name used in events and the summary (e.g. "platform")
    pub name: String,
    pub container: Container,
    /// References to push, all pointing at the same build
    pub images: Vec<ImageRef>,
    /// Stage names reported in the build-started event
    pub stages: Vec<String>,
}

impl ReleaseTarget {
    pub fn new(name: impl Into<String>, container: Container, images: Vec<ImageRef>) -> Self {
        Self {
            name: name.into(),
            container,
            images,
            stages: Vec::new(),
        }
    }

    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }
}

/// One slot of a release, in release order
#[derive(Debug, Clone)]
pub enum ReleaseEntry {
    Publish(ReleaseTarget),
    /// Left out of this release; reported in events and the summary
    Skip(String),
}

/// Outcome of a completed release
#[derive(Debug, Clone)]
pub struct ReleaseReport {
    pub published: Vec<PublishedImage>,
    pub steps: Vec<StepDuration>,
}

/// Service for orchestrating releases
pub struct ReleaseService<'a> {
    builds: &'a BuildService,
    registry: &'a RegistryClient,
}

impl<'a> ReleaseService<'a> {
    pub fn new(builds: &'a BuildService, registry: &'a RegistryClient) -> Self {
        Self { builds, registry }
    }

    /// Build and push every entry in order, stopping at the first failure
    pub async fn execute(
        &self,
        metadata: EventMetadata,
        entries: Vec<ReleaseEntry>,
    ) -> Result<ReleaseReport> {
        ui::print_header(&format!(
            "Release: {}",
            metadata.release.as_deref().unwrap_or("unnamed")
        ));
        for entry in &entries {
            if let ReleaseEntry::Publish(target) = entry {
                info!(
                    "{} -> {}",
                    target.name,
                    target
                        .images
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
        }

        let mut tracker = ReleaseTracker::new(metadata.clone());
        let mut published = Vec::new();

        for entry in entries {
            let target = match entry {
                ReleaseEntry::Publish(target) => target,
                ReleaseEntry::Skip(name) => {
                    ui::print_warning(&format!("Skipping {}", name));
                    tracker.skip_step(name);
                    continue;
                }
            };

            tracker.start_step(target.name.clone());
            let target_metadata = EventMetadata {
                target: target.name.clone(),
                ..metadata.clone()
            };

            let result = self
                .builds
                .publish(
                    &target.container,
                    target_metadata,
                    self.registry,
                    &target.images,
                    target.stages,
                )
                .await;

            match result {
                Ok(images) => {
                    tracker.complete_step();
                    published.extend(images);
                }
                Err(e) => {
                    let mut steps = tracker.steps().to_vec();
                    steps.push(StepDuration {
                        step: target.name.clone(),
                        duration_secs: 0.0,
                        status: StepStatus::Failed,
                    });
                    tracker.emit_failed(format!("{:#}", e));
                    print_summary(&steps, &published, false);
                    return Err(e);
                }
            }
        }

        let steps = tracker.emit_completed();
        print_summary(&steps, &published, true);
        Ok(ReleaseReport { published, steps })
    }
}

fn format_secs(secs: f64) -> String {
    // Rounded to whole seconds
    humantime::format_duration(Duration::from_secs(secs.round() as u64)).to_string()
}

fn print_summary(steps: &[StepDuration], published: &[PublishedImage], success: bool) {
    eprintln!();
    eprintln!(
        "{}",
        "════════════════════════════════════════════════════════════".bright_blue()
    );

    if success {
        ui::print_success("Release completed");
    } else {
        ui::print_error("Release failed");
    }

    for step in steps {
        let (icon, duration) = match step.status {
            StepStatus::Success => ("✅".green(), format_secs(step.duration_secs)),
            StepStatus::Failed => ("❌".red(), "-".to_string()),
            StepStatus::Skipped => ("⏭️".yellow(), "skipped".to_string()),
        };
        eprintln!("  {} {:<12} {}", icon, step.step, duration.dimmed());
    }

    if !published.is_empty() {
        eprintln!();
        for image in published {
            eprintln!("  {}", image.to_string().bright_white());
        }
    }
    eprintln!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::infrastructure::ContainerEngine;

    #[test]
    fn test_format_secs() {
        assert_eq!(format_secs(0.2), "0s");
        assert_eq!(format_secs(61.4), "1m 1s");
        assert_eq!(format_secs(3725.0), "1h 2m 5s");
    }

    #[test]
    fn test_release_target_builder() {
        let image = ImageRef::new("ghcr.io", "mitodl/codejail", "sumac").unwrap();
        let container = Container::from_image("python:3.11");
        let target = ReleaseTarget::new("codejail", container, vec![image])
            .with_stages(vec!["build-codejail".to_string()]);

        assert_eq!(target.name, "codejail");
        assert_eq!(target.images[0].to_string(), "ghcr.io/mitodl/codejail:sumac");
        assert_eq!(target.stages, ["build-codejail"]);
    }

    #[tokio::test]
    async fn test_skipped_entries_keep_release_order() {
        let builds = BuildService::new(ContainerEngine::new(&EngineConfig::default()));
        let registry = RegistryClient::new("docker", None);
        let metadata = EventMetadata::new("release").with_release("sumac");

        let report = ReleaseService::new(&builds, &registry)
            .execute(
                metadata,
                vec![
                    ReleaseEntry::Skip("codejail".into()),
                    ReleaseEntry::Skip("notes".into()),
                ],
            )
            .await
            .unwrap();

        let names: Vec<&str> = report.steps.iter().map(|s| s.step.as_str()).collect();
        assert_eq!(names, ["codejail", "notes"]);
        assert!(report
            .steps
            .iter()
            .all(|s| s.status == StepStatus::Skipped));
        assert!(report.published.is_empty());
    }
}
