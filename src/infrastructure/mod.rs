//! Infrastructure layer - external I/O adapters
//!
//! This module contains all code that interacts with external systems:
//! - Containerfile rendering for BuildKit
//! - The container engine (docker buildx)
//! - Container registries

pub mod containerfile;
pub mod engine;
pub mod registry;

// Re-export commonly used types
pub use engine::ContainerEngine;
pub use registry::{PublishedImage, RegistryClient, RegistryCredentials};
