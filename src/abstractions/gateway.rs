//! Task protocol gateway abstraction
//!
//! Provides a trait-based seam over the task protocol so the orchestrator can
//! be exercised without a live backend.

use crate::error::{Error, Result};
use crate::protocol::{StepUpdate, TaskLogEntry, TaskStep};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Operations the agent consumes from the task protocol
///
/// Every method fails with [`Error::Protocol`] on transport or
/// authentication problems. Callers must not swallow those failures.
#[async_trait]
pub trait TaskGateway: Send + Sync {
    /// Fetch the current state of a step
    async fn get_step(&self, step_id: &str) -> Result<TaskStep>;

    /// Append a log entry to a task
    async fn log_task(&self, entry: &TaskLogEntry) -> Result<()>;

    /// Apply a partial update to a step
    async fn update_step(
        &self,
        did: &str,
        task_id: &str,
        step_id: &str,
        update: &StepUpdate,
    ) -> Result<()>;
}

/// Recorded `update_step` call
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedUpdate {
    pub did: String,
    pub task_id: String,
    pub step_id: String,
    pub update: StepUpdate,
}

/// In-memory gateway for tests
///
/// Steps are served from a map keyed by step id. Each operation can be told
/// to fail, in which case it returns a protocol error and records nothing.
#[derive(Default, Clone)]
pub struct MockTaskGateway {
    steps: Arc<Mutex<HashMap<String, TaskStep>>>,
    logs: Arc<Mutex<Vec<TaskLogEntry>>>,
    updates: Arc<Mutex<Vec<RecordedUpdate>>>,
    step_reads: Arc<Mutex<Vec<String>>>,
    failures: Arc<Mutex<MockFailures>>,
}

#[derive(Default)]
struct MockFailures {
    get_step: Option<String>,
    log_task: Option<String>,
    update_step: Option<String>,
}

impl MockTaskGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a step the gateway will return from `get_step`
    pub async fn add_step(&self, step: TaskStep) {
        self.steps.lock().await.insert(step.step_id.clone(), step);
    }

    pub async fn fail_get_step(&self, message: &str) {
        self.failures.lock().await.get_step = Some(message.to_string());
    }

    pub async fn fail_log_task(&self, message: &str) {
        self.failures.lock().await.log_task = Some(message.to_string());
    }

    pub async fn fail_update_step(&self, message: &str) {
        self.failures.lock().await.update_step = Some(message.to_string());
    }

    pub async fn logs(&self) -> Vec<TaskLogEntry> {
        self.logs.lock().await.clone()
    }

    pub async fn updates(&self) -> Vec<RecordedUpdate> {
        self.updates.lock().await.clone()
    }

    pub async fn step_reads(&self) -> Vec<String> {
        self.step_reads.lock().await.clone()
    }
}

#[async_trait]
impl TaskGateway for MockTaskGateway {
    async fn get_step(&self, step_id: &str) -> Result<TaskStep> {
        if let Some(message) = &self.failures.lock().await.get_step {
            return Err(Error::Protocol(message.clone()));
        }
        self.step_reads.lock().await.push(step_id.to_string());
        self.steps
            .lock()
            .await
            .get(step_id)
            .cloned()
            .ok_or_else(|| Error::Protocol(format!("Step not found: {step_id}")))
    }

    async fn log_task(&self, entry: &TaskLogEntry) -> Result<()> {
        if let Some(message) = &self.failures.lock().await.log_task {
            return Err(Error::Protocol(message.clone()));
        }
        self.logs.lock().await.push(entry.clone());
        Ok(())
    }

    async fn update_step(
        &self,
        did: &str,
        task_id: &str,
        step_id: &str,
        update: &StepUpdate,
    ) -> Result<()> {
        if let Some(message) = &self.failures.lock().await.update_step {
            return Err(Error::Protocol(message.clone()));
        }
        self.updates.lock().await.push(RecordedUpdate {
            did: did.to_string(),
            task_id: task_id.to_string(),
            step_id: step_id.to_string(),
            update: update.clone(),
        });
        Ok(())
    }
}
