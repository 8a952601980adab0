//! Progress and outcome notifications sent through the gateway

use crate::abstractions::TaskGateway;
use crate::error::Result;
use crate::protocol::{ArtifactReference, LogLevel, StepEvent, StepStatus, StepUpdate, TaskLogEntry};
use std::sync::Arc;
use tracing::{error, info};

/// Formats log entries and terminal updates for the gateway
///
/// Gateway failures are returned unchanged so the orchestrator can let them
/// propagate.
#[derive(Clone)]
pub struct StatusReporter {
    gateway: Arc<dyn TaskGateway>,
}

impl StatusReporter {
    pub fn new(gateway: Arc<dyn TaskGateway>) -> Self {
        Self { gateway }
    }

    pub async fn report_log(
        &self,
        task_id: &str,
        message: impl Into<String>,
        level: LogLevel,
        status: Option<StepStatus>,
    ) -> Result<()> {
        let entry = TaskLogEntry {
            task_id: task_id.to_string(),
            message: message.into(),
            level,
            task_status: status,
        };
        match level {
            LogLevel::Info => info!(task_id, "{}", entry.message),
            LogLevel::Error => error!(task_id, "{}", entry.message),
        }
        self.gateway.log_task(&entry).await
    }

    /// Send the single terminal update for the step named by `event`
    pub async fn report_terminal(
        &self,
        event: &StepEvent,
        status: StepStatus,
        output: impl Into<String>,
        artifacts: Vec<ArtifactReference>,
        is_last: bool,
    ) -> Result<()> {
        let update = StepUpdate {
            step_id: event.step_id.clone(),
            task_id: event.task_id.clone(),
            step_status: status,
            output: output.into(),
            is_last,
            output_artifacts: artifacts,
        };
        info!(
            task_id = %event.task_id,
            step_id = %event.step_id,
            "Updating step to {}",
            update.step_status
        );
        self.gateway
            .update_step(&event.did, &event.task_id, &event.step_id, &update)
            .await
    }
}
