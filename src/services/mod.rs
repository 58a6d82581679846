//! Services layer - orchestration logic
//!
//! This module coordinates between domain plans and infrastructure.
//! Services drive the engine and registry adapters and emit build events.

pub mod build_service;
pub mod release_service;

// Re-export commonly used types
pub use build_service::BuildService;
pub use release_service::{ReleaseEntry, ReleaseService, ReleaseTarget};
