//! Diffusion inference server client

use super::device::{ComputeDevice, Precision};
use super::prompt::PromptTemplate;
use crate::abstractions::{GeneratedImage, ImageGenerator};
use crate::config::GenerationConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    negative_prompt: &'a str,
    guidance_scale: f32,
    num_inference_steps: u32,
    height: u32,
    width: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    attention_slicing: bool,
    device: ComputeDevice,
    dtype: Precision,
}

/// Generation capability served by a diffusion inference server
///
/// The server loads the checkpoint onto the requested device and answers
/// `POST {endpoint}/generate` with the PNG bytes of a single image.
pub struct DiffusionClient {
    client: Client,
    generate_url: String,
    device: ComputeDevice,
    config: GenerationConfig,
}

impl DiffusionClient {
    pub fn new(config: GenerationConfig, device: ComputeDevice) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {e}")))?;

        info!(
            "Using {} for image generation ({:?}, checkpoint {})",
            device.description(),
            device.precision(),
            config.checkpoint
        );

        Ok(Self {
            client,
            generate_url: format!("{}/generate", config.endpoint.trim_end_matches('/')),
            device,
            config,
        })
    }

    fn prompts(&self) -> &PromptTemplate {
        &self.config.prompt
    }

    fn build_request<'a>(&'a self, description: &str) -> GenerateRequest<'a> {
        GenerateRequest {
            model: &self.config.checkpoint,
            prompt: self.prompts().positive(description),
            negative_prompt: self.prompts().negative(),
            guidance_scale: self.config.guidance_scale,
            num_inference_steps: self.config.num_inference_steps,
            height: self.config.height,
            width: self.config.width,
            seed: self.config.seed,
            attention_slicing: self.config.attention_slicing,
            device: self.device,
            dtype: self.device.precision(),
        }
    }
}

#[async_trait]
impl ImageGenerator for DiffusionClient {
    async fn generate(&self, description: &str) -> Result<GeneratedImage> {
        let request = self.build_request(description);
        debug!("Prompt: {}", request.prompt);
        debug!("Negative prompt: {}", request.negative_prompt);

        let response = self
            .client
            .post(&self.generate_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Generation(format!("Inference request failed: {e}")))?;

        match response.status() {
            status if status.is_success() => {
                let bytes = response.bytes().await.map_err(|e| {
                    Error::Generation(format!("Failed to read generated image: {e}"))
                })?;
                GeneratedImage::from_png(bytes.to_vec())
            }
            StatusCode::SERVICE_UNAVAILABLE => Err(Error::Generation(
                "Inference server is not ready".to_string(),
            )),
            status => {
                let error_text = response.text().await.unwrap_or_default();
                Err(Error::Generation(format!(
                    "Inference error {status}: {error_text}"
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_carries_device_and_settings() {
        let config = GenerationConfig {
            endpoint: "http://localhost:7860/".to_string(),
            ..GenerationConfig::default()
        };
        let client = DiffusionClient::new(config, ComputeDevice::Cuda).unwrap();
        assert_eq!(client.generate_url, "http://localhost:7860/generate");

        let value = serde_json::to_value(client.build_request("a knight")).unwrap();
        assert_eq!(value["device"], "cuda");
        assert_eq!(value["dtype"], "float16");
        assert_eq!(value["num_inference_steps"], 50);
        assert_eq!(value["guidance_scale"], 5.0);
        assert_eq!(value["width"], 512);
        assert_eq!(value["seed"], 1);
        assert_eq!(value["model"], "models/analogMadness_v70.safetensors");
        assert!(value["prompt"]
            .as_str()
            .unwrap()
            .starts_with("photo of a knight"));
    }
}
