//! Wiring of real collaborators from configuration

use crate::abstractions::{ArtifactStore, ImageGenerator, TaskGateway};
use crate::config::AgentConfig;
use crate::error::{Error, Result};
use crate::generation::{self, DeviceProbe};
use crate::orchestrator::TaskOrchestrator;
use crate::protocol::{HttpTaskGateway, WebSocketEventSource};
use crate::storage;
use std::sync::Arc;
use tracing::info;

/// Everything a running agent needs, built once at start-up
pub struct AgentRuntime {
    pub config: AgentConfig,
    pub orchestrator: Arc<TaskOrchestrator>,
}

impl AgentRuntime {
    /// Validate configuration and construct the gateway, generator and store
    pub fn build(config: AgentConfig, probe: &dyn DeviceProbe) -> Result<Self> {
        config.validate()?;
        info!(
            "Initializing {} v{} ({} environment)",
            config.agent.app_id, config.agent.version, config.protocol.environment
        );

        let gateway: Arc<dyn TaskGateway> = Arc::new(HttpTaskGateway::new(
            config.protocol.backend_url.as_deref().unwrap_or_default(),
            config.protocol.api_key.as_deref().unwrap_or_default(),
            config.protocol.request_timeout,
        )?);
        let generator: Arc<dyn ImageGenerator> =
            Arc::new(generation::initialize(&config.generation, probe)?);
        let store: Arc<dyn ArtifactStore> = storage::from_config(&config.storage)?;

        let orchestrator = Arc::new(TaskOrchestrator::new(gateway, generator, store));
        Ok(Self {
            config,
            orchestrator,
        })
    }

    /// Open the event subscription for this agent's DID
    pub async fn subscribe(&self) -> Result<WebSocketEventSource> {
        let url = self.config.protocol.websocket_url.as_deref().ok_or_else(|| {
            Error::Config("NVM_WEBSOCKET_URL is required to subscribe".to_string())
        })?;
        WebSocketEventSource::connect(
            url,
            self.config.protocol.api_key.as_deref().unwrap_or_default(),
            self.config.agent_did()?,
        )
        .await
    }
}
