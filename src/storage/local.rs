//! Local directory artifact store, for development without a pinning service

use crate::abstractions::{ArtifactStore, GeneratedImage};
use crate::error::{Error, Result};
use crate::protocol::ArtifactReference;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::info;
use url::Url;

pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn target(&self, filename: &str) -> Result<PathBuf> {
        let mut components = Path::new(filename).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => Ok(self.root.join(name)),
            _ => Err(Error::Upload(format!(
                "refusing to store artifact under '{filename}'"
            ))),
        }
    }
}

#[async_trait]
impl ArtifactStore for LocalStore {
    async fn upload(&self, image: &GeneratedImage, filename: &str) -> Result<ArtifactReference> {
        let target = self.target(filename)?;
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| Error::Upload(format!("Failed to create {}: {e}", self.root.display())))?;
        fs::write(&target, image.data())
            .await
            .map_err(|e| Error::Upload(format!("Failed to write {}: {e}", target.display())))?;

        let absolute = fs::canonicalize(&target)
            .await
            .map_err(|e| Error::Upload(e.to_string()))?;
        let url = Url::from_file_path(&absolute).map_err(|_| {
            Error::Upload(format!("cannot express {} as a URL", absolute.display()))
        })?;

        info!("Stored {} ({} bytes)", url, image.size());
        Ok(ArtifactReference::new(url.to_string()))
    }

    fn label(&self) -> &str {
        "local storage"
    }
}
