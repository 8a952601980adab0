//! Artifact store adapters

pub mod local;
pub mod pinata;

pub use local::LocalStore;
pub use pinata::PinataStore;

use crate::abstractions::ArtifactStore;
use crate::config::{StorageBackend, StorageConfig};
use crate::error::Result;
use std::sync::Arc;

/// Build the store selected by configuration
pub fn from_config(config: &StorageConfig) -> Result<Arc<dyn ArtifactStore>> {
    Ok(match config.backend {
        StorageBackend::Pinata => Arc::new(PinataStore::new(config)?),
        StorageBackend::Local => Arc::new(LocalStore::new(config.local_dir.clone())),
    })
}
