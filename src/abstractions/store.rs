//! Artifact store abstraction

use crate::abstractions::generator::GeneratedImage;
use crate::error::{Error, Result};
use crate::protocol::ArtifactReference;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Persists a generated image and hands back a durable reference
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store `image` under `filename`; fails with [`Error::Upload`]
    async fn upload(&self, image: &GeneratedImage, filename: &str) -> Result<ArtifactReference>;

    /// Human-readable name of where artifacts end up, used in step output
    fn label(&self) -> &str;
}

/// Recording store for tests
#[derive(Clone)]
pub struct MockArtifactStore {
    base_url: String,
    uploads: Arc<Mutex<Vec<(String, usize)>>>,
    failure: Arc<Mutex<Option<String>>>,
}

impl MockArtifactStore {
    /// Uploads resolve to `{base_url}{filename}` unless a fixed reference is set
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            uploads: Arc::new(Mutex::new(Vec::new())),
            failure: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn fail_with(&self, message: &str) {
        *self.failure.lock().await = Some(message.to_string());
    }

    /// Filenames and byte sizes of every successful upload
    pub async fn uploads(&self) -> Vec<(String, usize)> {
        self.uploads.lock().await.clone()
    }
}

impl Default for MockArtifactStore {
    fn default() -> Self {
        Self::new("https://example/")
    }
}

#[async_trait]
impl ArtifactStore for MockArtifactStore {
    async fn upload(&self, image: &GeneratedImage, filename: &str) -> Result<ArtifactReference> {
        if let Some(message) = self.failure.lock().await.clone() {
            return Err(Error::Upload(message));
        }
        self.uploads
            .lock()
            .await
            .push((filename.to_string(), image.size()));
        Ok(ArtifactReference::new(format!("{}{}", self.base_url, filename)))
    }

    fn label(&self) -> &str {
        "IPFS"
    }
}
