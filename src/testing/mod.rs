//! Testing utilities and fixtures
//!
//! This module provides a ready-wired orchestrator over the in-memory
//! doubles so tests can script a step and inspect every gateway call.

use crate::abstractions::{MockArtifactStore, MockImageGenerator, MockTaskGateway};
use crate::orchestrator::TaskOrchestrator;
use crate::protocol::{StepEvent, StepStatus, TaskStep};
use std::sync::Arc;

pub const TEST_DID: &str = "did:nv:test-agent";

/// Test context containing all necessary mocks and utilities
pub struct TestContext {
    pub gateway: MockTaskGateway,
    pub generator: MockImageGenerator,
    pub store: MockArtifactStore,
    pub orchestrator: Arc<TaskOrchestrator>,
}

impl TestContext {
    /// Create a new test context with default mocks
    pub fn new() -> Self {
        Self::with_mocks(
            MockTaskGateway::new(),
            MockImageGenerator::new(),
            MockArtifactStore::default(),
        )
    }

    /// Create a test context with custom mocks
    pub fn with_mocks(
        gateway: MockTaskGateway,
        generator: MockImageGenerator,
        store: MockArtifactStore,
    ) -> Self {
        let orchestrator = Arc::new(TaskOrchestrator::new(
            Arc::new(gateway.clone()),
            Arc::new(generator.clone()),
            Arc::new(store.clone()),
        ));
        Self {
            gateway,
            generator,
            store,
            orchestrator,
        }
    }

    /// Register a step with the gateway and return the event announcing it
    pub async fn deliver(&self, task_id: &str, status: StepStatus, input: Option<&str>) -> StepEvent {
        let step_id = format!("{task_id}-step");
        self.gateway
            .add_step(TaskStep {
                task_id: task_id.to_string(),
                step_id: step_id.clone(),
                did: Some(TEST_DID.to_string()),
                step_status: status,
                input_query: input.map(str::to_string),
                output: None,
                output_artifacts: Vec::new(),
                is_last: false,
            })
            .await;
        StepEvent {
            step_id,
            task_id: task_id.to_string(),
            did: TEST_DID.to_string(),
        }
    }

    pub async fn deliver_pending(&self, task_id: &str, input: &str) -> StepEvent {
        self.deliver(task_id, StepStatus::Pending, Some(input)).await
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
