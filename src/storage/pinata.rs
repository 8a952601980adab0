//! Pinata pinning service client

use crate::abstractions::{ArtifactStore, GeneratedImage};
use crate::config::StorageConfig;
use crate::error::{Error, Result};
use crate::protocol::ArtifactReference;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
    #[serde(rename = "PinSize", default)]
    pin_size: Option<u64>,
    #[serde(rename = "Timestamp", default)]
    timestamp: Option<DateTime<Utc>>,
}

/// Pins artifacts to IPFS through Pinata and returns gateway URLs
pub struct PinataStore {
    client: Client,
    endpoint: String,
    api_key: String,
    api_secret: String,
    gateway_template: String,
}

impl PinataStore {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let (api_key, api_secret) = match (&config.pinata_api_key, &config.pinata_api_secret) {
            (Some(key), Some(secret)) => (key.clone(), secret.clone()),
            _ => {
                return Err(Error::Config(
                    "Pinata storage requires PINATA_API_KEY and PINATA_API_SECRET".to_string(),
                ))
            }
        };
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.pinata_endpoint.clone(),
            api_key,
            api_secret,
            gateway_template: config.gateway_template.clone(),
        })
    }

    /// Public URL for a content identifier
    pub fn gateway_url(&self, cid: &str) -> String {
        self.gateway_template.replace("{CID}", cid)
    }

    async fn pin(&self, image: &GeneratedImage, filename: &str) -> Result<String> {
        let part = reqwest::multipart::Part::bytes(image.data().to_vec())
            .file_name(filename.to_string())
            .mime_str(image.media_type())
            .map_err(|e| Error::Upload(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&self.endpoint)
            .header("pinata_api_key", &self.api_key)
            .header("pinata_secret_api_key", &self.api_secret)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Upload(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {
                let pinned: PinResponse = response
                    .json()
                    .await
                    .map_err(|e| Error::Upload(format!("unexpected response: {e}")))?;
                debug!(
                    "Pinned {} ({:?} bytes at {:?})",
                    pinned.ipfs_hash, pinned.pin_size, pinned.timestamp
                );
                Ok(pinned.ipfs_hash)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(Error::Upload("invalid Pinata credentials".to_string()))
            }
            status => {
                let error_text = response.text().await.unwrap_or_default();
                Err(Error::Upload(format!("status {status}: {error_text}")))
            }
        }
    }
}

#[async_trait]
impl ArtifactStore for PinataStore {
    async fn upload(&self, image: &GeneratedImage, filename: &str) -> Result<ArtifactReference> {
        info!("Uploading {} to Pinata...", filename);
        let cid = self.pin(image, filename).await.map_err(|e| match e {
            Error::Upload(message) => {
                Error::Upload(format!("Failed to upload image to Pinata: {message}"))
            }
            other => other,
        })?;
        info!("Image uploaded to Pinata. CID: {}", cid);
        Ok(ArtifactReference::new(self.gateway_url(&cid)))
    }

    fn label(&self) -> &str {
        "IPFS"
    }
}
