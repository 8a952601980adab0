//! Generation capability abstraction

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// PNG file signature
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// PNG-encoded image produced by a generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    data: Vec<u8>,
}

impl GeneratedImage {
    /// Wrap encoded bytes, rejecting anything that is not a PNG
    pub fn from_png(data: Vec<u8>) -> Result<Self> {
        if !data.starts_with(&PNG_SIGNATURE) {
            return Err(Error::Generation(format!(
                "expected PNG image data, got {} bytes without a PNG signature",
                data.len()
            )));
        }
        Ok(Self { data })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn media_type(&self) -> &'static str {
        "image/png"
    }

    /// Encoded size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Produces an image from a canonical character description
///
/// Implementations are assumed to be bound to a single accelerator context
/// and must not be invoked concurrently; callers go through
/// [`ExclusiveAccess`](crate::generation::ExclusiveAccess).
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, description: &str) -> Result<GeneratedImage>;
}

/// Timing of one mock invocation
#[derive(Debug, Clone)]
pub struct Invocation {
    pub description: String,
    pub started: Instant,
    pub finished: Instant,
}

/// Scripted generator for tests
///
/// Returns queued responses in order, falling back to a tiny PNG once the
/// queue is empty. Tracks how many calls overlap so tests can assert
/// exclusivity.
#[derive(Clone, Default)]
pub struct MockImageGenerator {
    responses: Arc<Mutex<VecDeque<Result<GeneratedImage>>>>,
    invocations: Arc<Mutex<Vec<Invocation>>>,
    delay: Option<Duration>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
}

impl MockImageGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every invocation open for `delay`
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn add_response(&self, response: Result<GeneratedImage>) {
        self.responses.lock().await.push_back(response);
    }

    pub async fn add_error_response(&self, message: &str) {
        self.add_response(Err(Error::Generation(message.to_string())))
            .await;
    }

    pub async fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.invocations.lock().await.len()
    }

    /// Highest number of invocations observed running at the same time
    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    /// Smallest valid PNG header, enough for stores and tests
    pub fn sample_image() -> GeneratedImage {
        let mut data = PNG_SIGNATURE.to_vec();
        data.extend_from_slice(b"mock-image");
        GeneratedImage { data }
    }
}

#[async_trait]
impl ImageGenerator for MockImageGenerator {
    async fn generate(&self, description: &str) -> Result<GeneratedImage> {
        let started = Instant::now();
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let response = self
            .responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(Self::sample_image()));

        self.active.fetch_sub(1, Ordering::SeqCst);
        self.invocations.lock().await.push(Invocation {
            description: description.to_string(),
            started,
            finished: Instant::now(),
        });
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_png_rejects_other_payloads() {
        let err = GeneratedImage::from_png(b"{\"error\":\"oom\"}".to_vec()).unwrap_err();
        assert!(matches!(err, Error::Generation(_)));
    }

    #[test]
    fn test_from_png_accepts_signature() {
        let image = GeneratedImage::from_png(PNG_SIGNATURE.to_vec()).unwrap();
        assert_eq!(image.size(), 8);
        assert_eq!(image.media_type(), "image/png");
    }

    #[tokio::test]
    async fn test_mock_returns_queued_then_default() {
        let generator = MockImageGenerator::new();
        generator.add_error_response("boom").await;

        assert!(generator.generate("first").await.is_err());
        assert!(generator.generate("second").await.is_ok());
        assert_eq!(generator.call_count().await, 2);
        assert_eq!(generator.max_concurrent(), 1);
    }
}
