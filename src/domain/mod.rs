//! Domain layer - pure build plans
//!
//! This module contains plan composition with no external I/O.
//! Types and functions here can be unit tested without an engine.

pub mod artifact;
pub mod container;
pub mod image_ref;
pub mod mfe;
pub mod platform;
pub mod release;
pub mod services;

// Re-export commonly used types
pub use artifact::Artifact;
pub use container::{Container, DirectoryRef};
pub use image_ref::ImageRef;
pub use release::PlatformStage;
