//! Agent configuration
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! environment variables (a `.env` file is honoured). See [`ConfigLoader`].

use crate::error::{Error, Result};
use crate::generation::{ComputeDevice, PromptTemplate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub mod loader;

pub use loader::ConfigLoader;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub agent: AgentSection,
    pub protocol: ProtocolConfig,
    pub generation: GenerationConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    pub did: Option<String>,
    pub app_id: String,
    pub version: String,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            did: None,
            app_id: "image_generator_agent".to_string(),
            version: "1.0.0".to_string(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    pub api_key: Option<String>,
    pub environment: String,
    pub backend_url: Option<String>,
    pub websocket_url: Option<String>,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Consecutive gateway failures tolerated before the worker stops
    pub max_consecutive_failures: u32,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            environment: "staging".to_string(),
            backend_url: None,
            websocket_url: None,
            request_timeout: Duration::from_secs(30),
            max_consecutive_failures: 3,
        }
    }
}

impl fmt::Debug for ProtocolConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolConfig")
            .field("api_key", &redact(&self.api_key))
            .field("environment", &self.environment)
            .field("backend_url", &self.backend_url)
            .field("websocket_url", &self.websocket_url)
            .field("request_timeout", &self.request_timeout)
            .field("max_consecutive_failures", &self.max_consecutive_failures)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub endpoint: String,
    pub checkpoint: String,
    /// Tried in order; CPU is the last resort either way
    pub devices: Vec<ComputeDevice>,
    pub guidance_scale: f32,
    pub num_inference_steps: u32,
    pub width: u32,
    pub height: u32,
    pub seed: Option<u64>,
    pub attention_slicing: bool,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    pub prompt: PromptTemplate,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:7860".to_string(),
            checkpoint: "models/analogMadness_v70.safetensors".to_string(),
            devices: ComputeDevice::PREFERENCE.to_vec(),
            guidance_scale: 5.0,
            num_inference_steps: 50,
            width: 512,
            height: 512,
            seed: Some(1),
            attention_slicing: true,
            request_timeout: Duration::from_secs(600),
            prompt: PromptTemplate::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Pinata,
    Local,
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pinata" | "ipfs" => Ok(StorageBackend::Pinata),
            "local" => Ok(StorageBackend::Local),
            other => Err(format!("unknown storage backend '{other}'")),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub pinata_api_key: Option<String>,
    pub pinata_api_secret: Option<String>,
    pub pinata_endpoint: String,
    /// Public URL template, `{CID}` is replaced with the pinned hash
    pub gateway_template: String,
    pub local_dir: PathBuf,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Pinata,
            pinata_api_key: None,
            pinata_api_secret: None,
            pinata_endpoint: "https://api.pinata.cloud/pinning/pinFileToIPFS".to_string(),
            gateway_template: "https://gateway.pinata.cloud/ipfs/{CID}".to_string(),
            local_dir: PathBuf::from("artifacts"),
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("backend", &self.backend)
            .field("pinata_api_key", &redact(&self.pinata_api_key))
            .field("pinata_api_secret", &redact(&self.pinata_api_secret))
            .field("pinata_endpoint", &self.pinata_endpoint)
            .field("gateway_template", &self.gateway_template)
            .field("local_dir", &self.local_dir)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

fn redact(secret: &Option<String>) -> &'static str {
    match secret {
        Some(_) => "<redacted>",
        None => "<unset>",
    }
}

impl AgentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply overrides from the process environment
    pub fn merge_env_vars(&mut self) {
        self.merge_env_with(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn merge_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("NVM_API_KEY") {
            self.protocol.api_key = Some(v);
        }
        if let Some(v) = get("NVM_ENVIRONMENT") {
            self.protocol.environment = v;
        }
        if let Some(v) = get("AGENT_DID") {
            self.agent.did = Some(v);
        }
        if let Some(v) = get("NVM_BACKEND_URL") {
            self.protocol.backend_url = Some(v);
        }
        if let Some(v) = get("NVM_WEBSOCKET_URL") {
            self.protocol.websocket_url = Some(v);
        }
        if let Some(v) = get("PINATA_API_KEY") {
            self.storage.pinata_api_key = Some(v);
        }
        if let Some(v) = get("PINATA_API_SECRET") {
            self.storage.pinata_api_secret = Some(v);
        }
        if let Some(v) = get("IPFS_GATEWAY") {
            self.storage.gateway_template = v;
        }
        if let Some(v) = get("STORAGE_DIR") {
            self.storage.local_dir = PathBuf::from(v);
        }
        if let Some(v) = get("GENERATION_ENDPOINT") {
            self.generation.endpoint = v;
        }
        if let Some(v) = get("MODEL_CHECKPOINT") {
            self.generation.checkpoint = v;
        }
        if let Some(v) = get("GENERATION_DEVICE") {
            match v.parse::<ComputeDevice>() {
                Ok(device) => self.generation.devices = vec![device],
                Err(e) => tracing::warn!("Ignoring GENERATION_DEVICE: {}", e),
            }
        }
        if let Some(v) = get("STORAGE_BACKEND") {
            match v.parse::<StorageBackend>() {
                Ok(backend) => self.storage.backend = backend,
                Err(e) => tracing::warn!("Ignoring STORAGE_BACKEND: {}", e),
            }
        }
    }

    /// Check everything needed to talk to the gateway and store artifacts
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.protocol.api_key.is_none() {
            missing.push("NVM_API_KEY");
        }
        if self.agent.did.is_none() {
            missing.push("AGENT_DID");
        }
        if self.protocol.backend_url.is_none() {
            missing.push("NVM_BACKEND_URL");
        }
        if self.storage.backend == StorageBackend::Pinata {
            if self.storage.pinata_api_key.is_none() {
                missing.push("PINATA_API_KEY");
            }
            if self.storage.pinata_api_secret.is_none() {
                missing.push("PINATA_API_SECRET");
            }
        }
        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "missing required settings: {}",
                missing.join(", ")
            )));
        }

        if !self.storage.gateway_template.contains("{CID}") {
            return Err(Error::Config(
                "storage.gateway_template must contain {CID}".to_string(),
            ));
        }
        if self.generation.num_inference_steps == 0 {
            return Err(Error::Config(
                "generation.num_inference_steps must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn agent_did(&self) -> Result<&str> {
        self.agent
            .did
            .as_deref()
            .ok_or_else(|| Error::Config("AGENT_DID is not set".to_string()))
    }
}
