//! # Build Observability Module
//!
//! Structured events for builds and publications.
//!
//! ## Event Flow
//!
//! ```text
//! lehrer → JSON stderr → CI log collector
//! ```
//!
//! Events are single JSON lines prefixed with `LEHRER_EVENT:`. They go to
//! stderr because stdout carries artifacts between commands. Every event of
//! one invocation shares a `run_id`.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Instant;
use uuid::Uuid;

/// Event prefix so collectors can pick structured lines out of build logs
const EVENT_PREFIX: &str = "LEHRER_EVENT:";

/// Identifier shared by all events of this process
pub fn run_id() -> &'static str {
    static RUN_ID: OnceLock<String> = OnceLock::new();
    RUN_ID.get_or_init(|| Uuid::new_v4().to_string())
}

/// Build event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum BuildEvent {
    /// A plan was handed to the engine
    BuildStarted(BuildStartedEvent),
    /// The engine finished a plan
    BuildCompleted(BuildCompletedEvent),
    /// The engine (or plan composition) failed
    BuildFailed(BuildFailedEvent),
    /// Images were pushed
    PublishCompleted(PublishCompletedEvent),
    /// A multi-image release finished
    ReleaseCompleted(ReleaseCompletedEvent),
    /// A multi-image release failed
    ReleaseFailed(ReleaseFailedEvent),
}

/// Common fields for all events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Timestamp in RFC3339 format
    pub timestamp: String,
    pub run_id: String,
    /// What is being built (e.g. "platform", "codejail", "mfe:learning")
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    /// Hostname of the machine running the build
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// CI job ID if running in CI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ci_job_id: Option<String>,
}

impl EventMetadata {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            run_id: run_id().to_string(),
            target: target.into(),
            deployment: None,
            release: None,
            hostname: std::env::var("HOSTNAME").ok(),
            ci_job_id: std::env::var("GITHUB_RUN_ID")
                .ok()
                .or_else(|| std::env::var("CI_JOB_ID").ok()),
        }
    }

    pub fn with_deployment(mut self, deployment: impl Into<String>) -> Self {
        self.deployment = Some(deployment.into());
        self
    }

    pub fn with_release(mut self, release: impl Into<String>) -> Self {
        self.release = Some(release.into());
        self
    }

    /// Same context, fresh timestamp
    fn touch(&self) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildStartedEvent {
    #[serde(flatten)]
    pub metadata: EventMetadata,
    /// SHA-256 of the serialized plan
    pub plan_digest: String,
    /// Pipeline stages that will run, when known
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildCompletedEvent {
    #[serde(flatten)]
    pub metadata: EventMetadata,
    pub plan_digest: String,
    /// Build duration in seconds
    pub duration_secs: f64,
    /// Local image id, absent for exports
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildFailedEvent {
    #[serde(flatten)]
    pub metadata: EventMetadata,
    pub plan_digest: String,
    /// Duration until failure
    pub duration_secs: f64,
    /// Error message
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishCompletedEvent {
    #[serde(flatten)]
    pub metadata: EventMetadata,
    /// Push duration in seconds
    pub duration_secs: f64,
    /// Registry host
    pub registry: String,
    /// Pushed references, with digests when the registry reported one
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseCompletedEvent {
    #[serde(flatten)]
    pub metadata: EventMetadata,
    /// Total duration in seconds
    pub duration_secs: f64,
    /// Individual step durations
    pub step_durations: Vec<StepDuration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseFailedEvent {
    #[serde(flatten)]
    pub metadata: EventMetadata,
    pub duration_secs: f64,
    /// Step that failed
    pub failed_step: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDuration {
    pub step: String,
    pub duration_secs: f64,
    pub status: StepStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Failed,
    Skipped,
}

/// Render an event as a prefixed line
pub fn format_event(event: &BuildEvent) -> Result<String, serde_json::Error> {
    Ok(format!("{}{}", EVENT_PREFIX, serde_json::to_string(event)?))
}

/// Emits a structured event to stderr
pub fn emit_event(event: BuildEvent) {
    match format_event(&event) {
        Ok(line) => eprintln!("{}", line),
        Err(e) => tracing::error!("Failed to serialize event: {}", e),
    }
}

/// Helper to track step timing
pub struct StepTimer {
    name: String,
    start: Instant,
}

impl StepTimer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: Instant::now(),
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    pub fn finish(self) -> StepDuration {
        self.finish_with(StepStatus::Success)
    }

    pub fn finish_failed(self) -> StepDuration {
        self.finish_with(StepStatus::Failed)
    }

    fn finish_with(self, status: StepStatus) -> StepDuration {
        StepDuration {
            duration_secs: self.start.elapsed().as_secs_f64(),
            step: self.name,
            status,
        }
    }
}

/// Tracks one plan through the engine
pub struct BuildTracker {
    metadata: EventMetadata,
    plan_digest: String,
    timer: StepTimer,
}

impl BuildTracker {
    /// Emits `BuildStarted` and starts the clock
    pub fn start(metadata: EventMetadata, plan_digest: String, stages: Vec<String>) -> Self {
        emit_event(BuildEvent::BuildStarted(BuildStartedEvent {
            metadata: metadata.touch(),
            plan_digest: plan_digest.clone(),
            stages,
        }));
        let timer = StepTimer::new(metadata.target.clone());
        Self {
            metadata,
            plan_digest,
            timer,
        }
    }

    pub fn completed(self, image_id: Option<String>) {
        emit_event(BuildEvent::BuildCompleted(BuildCompletedEvent {
            metadata: self.metadata.touch(),
            plan_digest: self.plan_digest,
            duration_secs: self.timer.elapsed_secs(),
            image_id,
        }));
    }

    pub fn failed(self, error: &dyn std::fmt::Display) {
        emit_event(BuildEvent::BuildFailed(BuildFailedEvent {
            metadata: self.metadata.touch(),
            plan_digest: self.plan_digest,
            duration_secs: self.timer.elapsed_secs(),
            error: error.to_string(),
        }));
    }
}

/// Release workflow tracker
pub struct ReleaseTracker {
    metadata: EventMetadata,
    start: Instant,
    steps: Vec<StepDuration>,
    current_step: Option<StepTimer>,
}

impl ReleaseTracker {
    pub fn new(metadata: EventMetadata) -> Self {
        Self {
            metadata,
            start: Instant::now(),
            steps: Vec::new(),
            current_step: None,
        }
    }

    /// Start a new step, finishing any open one
    pub fn start_step(&mut self, name: impl Into<String>) {
        if let Some(timer) = self.current_step.take() {
            self.steps.push(timer.finish());
        }
        self.current_step = Some(StepTimer::new(name));
    }

    pub fn complete_step(&mut self) {
        if let Some(timer) = self.current_step.take() {
            self.steps.push(timer.finish());
        }
    }

    /// Record a step that did not run
    pub fn skip_step(&mut self, name: impl Into<String>) {
        self.steps.push(StepDuration {
            step: name.into(),
            duration_secs: 0.0,
            status: StepStatus::Skipped,
        });
    }

    pub fn steps(&self) -> &[StepDuration] {
        &self.steps
    }

    pub fn emit_completed(mut self) -> Vec<StepDuration> {
        self.complete_step();
        let steps = self.steps.clone();
        emit_event(BuildEvent::ReleaseCompleted(ReleaseCompletedEvent {
            metadata: self.metadata.touch(),
            duration_secs: self.start.elapsed().as_secs_f64(),
            step_durations: self.steps,
        }));
        steps
    }

    pub fn emit_failed(mut self, error: String) {
        let failed_step = match self.current_step.take() {
            Some(timer) => {
                let step = timer.finish_failed();
                let name = step.step.clone();
                self.steps.push(step);
                name
            }
            None => "unknown".to_string(),
        };

        emit_event(BuildEvent::ReleaseFailed(ReleaseFailedEvent {
            metadata: self.metadata.touch(),
            duration_secs: self.start.elapsed().as_secs_f64(),
            failed_step,
            error,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let metadata = EventMetadata::new("platform")
            .with_deployment("mitxonline")
            .with_release("sumac");

        let event = BuildEvent::BuildStarted(BuildStartedEvent {
            metadata,
            plan_digest: "abc123".into(),
            stages: vec!["apt-base".into(), "get-code".into()],
        });

        let line = format_event(&event).unwrap();
        assert!(line.starts_with("LEHRER_EVENT:{"));

        let json: serde_json::Value =
            serde_json::from_str(line.trim_start_matches(EVENT_PREFIX)).unwrap();
        assert_eq!(json["event_type"], "BuildStarted");
        assert_eq!(json["target"], "platform");
        assert_eq!(json["deployment"], "mitxonline");
        assert_eq!(json["release"], "sumac");
        assert_eq!(json["plan_digest"], "abc123");
        assert_eq!(json["stages"][1], "get-code");
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let event = BuildEvent::BuildCompleted(BuildCompletedEvent {
            metadata: EventMetadata::new("mfe:learning"),
            plan_digest: "abc".into(),
            duration_secs: 1.5,
            image_id: None,
        });
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("image_id"));
        assert!(!json.contains("deployment"));
    }

    #[test]
    fn test_run_id_is_stable() {
        assert_eq!(run_id(), run_id());
        assert!(Uuid::parse_str(run_id()).is_ok());
        assert_eq!(EventMetadata::new("a").run_id, EventMetadata::new("b").run_id);
    }

    #[test]
    fn test_step_timer() {
        let timer = StepTimer::new("test_step");
        std::thread::sleep(std::time::Duration::from_millis(10));
        let duration = timer.finish();
        assert!(duration.duration_secs >= 0.01);
        assert_eq!(duration.step, "test_step");
        assert_eq!(duration.status, StepStatus::Success);
    }

    #[test]
    fn test_release_tracker_records_steps() {
        let mut tracker = ReleaseTracker::new(EventMetadata::new("release"));
        tracker.start_step("platform");
        tracker.start_step("codejail");
        tracker.skip_step("notes");
        tracker.complete_step();

        let steps = tracker.steps();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].step, "platform");
        assert_eq!(steps[1].status, StepStatus::Skipped);
        assert_eq!(steps[2].step, "codejail");
    }
}
