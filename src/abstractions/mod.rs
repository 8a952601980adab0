//! Abstraction layers for external collaborators
//!
//! This module provides trait-based abstractions for the task protocol
//! gateway, the generation capability and the artifact store, together with
//! in-memory doubles for testing and dependency injection.

pub mod gateway;
pub mod generator;
pub mod store;

pub use gateway::{MockTaskGateway, RecordedUpdate, TaskGateway};
pub use generator::{GeneratedImage, ImageGenerator, Invocation, MockImageGenerator};
pub use store::{ArtifactStore, MockArtifactStore};
