//! Subscription loop
//!
//! Pulls step events from an [`EventSource`] and runs each one on its own
//! task, so overlapping deliveries are processed concurrently. Gateway
//! failures propagated by the orchestrator are counted; once too many happen
//! in a row, or the subscription itself fails, the worker stops taking
//! events, lets in-flight steps finish and hands the first failure to its
//! caller.

use crate::error::{Error, Result};
use crate::orchestrator::{StepOutcome, TaskOrchestrator};
use crate::protocol::EventSource;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSummary {
    pub started_at: DateTime<Utc>,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub protocol_errors: usize,
}

impl WorkerSummary {
    fn new() -> Self {
        Self {
            started_at: Utc::now(),
            completed: 0,
            failed: 0,
            skipped: 0,
            protocol_errors: 0,
        }
    }

    pub fn processed(&self) -> usize {
        self.completed + self.failed + self.skipped
    }
}

pub struct Worker<S: EventSource> {
    orchestrator: Arc<TaskOrchestrator>,
    source: S,
    max_consecutive_failures: u32,
    consecutive_failures: u32,
    summary: WorkerSummary,
}

impl<S: EventSource> Worker<S> {
    pub fn new(orchestrator: Arc<TaskOrchestrator>, source: S, max_consecutive_failures: u32) -> Self {
        Self {
            orchestrator,
            source,
            max_consecutive_failures: max_consecutive_failures.max(1),
            consecutive_failures: 0,
            summary: WorkerSummary::new(),
        }
    }

    /// Run until the source ends or gateway failures pile up
    ///
    /// Steps already started always run to their terminal outcome, even when
    /// the worker is stopping because of an error.
    pub async fn run(mut self) -> Result<WorkerSummary> {
        let mut in_flight: JoinSet<(String, Result<StepOutcome>)> = JoinSet::new();
        let mut stop_reason: Option<Error> = None;
        info!("Worker started, waiting for step events");

        while stop_reason.is_none() {
            tokio::select! {
                event = self.source.next_event() => match event {
                    Some(Ok(event)) => {
                        debug!("Received step {} of task {}", event.step_id, event.task_id);
                        let orchestrator = self.orchestrator.clone();
                        in_flight.spawn(async move {
                            let result = orchestrator.run(&event).await;
                            (event.step_id, result)
                        });
                    }
                    Some(Err(e)) => {
                        error!("Event subscription failed: {}", e);
                        stop_reason = Some(e);
                    }
                    None => break,
                },
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = self.record(joined) {
                        stop_reason = Some(e);
                    }
                }
            }
        }

        debug!("Draining {} in-flight step(s)", in_flight.len());
        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = self.record(joined) {
                stop_reason.get_or_insert(e);
            }
        }

        info!(
            "Worker finished: {} completed, {} failed, {} skipped",
            self.summary.completed, self.summary.failed, self.summary.skipped
        );
        match stop_reason {
            Some(e) => Err(e),
            None => Ok(self.summary),
        }
    }

    fn record(
        &mut self,
        joined: std::result::Result<(String, Result<StepOutcome>), JoinError>,
    ) -> Result<()> {
        let (step_id, result) =
            joined.map_err(|e| Error::Worker(format!("step task aborted: {e}")))?;

        match result {
            Ok(outcome) => {
                self.consecutive_failures = 0;
                match outcome {
                    StepOutcome::Completed { .. } => self.summary.completed += 1,
                    StepOutcome::Failed { .. } => self.summary.failed += 1,
                    StepOutcome::Skipped { .. } => self.summary.skipped += 1,
                }
                Ok(())
            }
            Err(e) if !e.is_protocol() => Err(e),
            Err(e) => {
                self.summary.protocol_errors += 1;
                self.consecutive_failures += 1;
                error!("Step {} aborted by gateway failure: {}", step_id, e);
                if self.consecutive_failures >= self.max_consecutive_failures {
                    warn!(
                        "{} consecutive gateway failures, stopping worker",
                        self.consecutive_failures
                    );
                    return Err(e);
                }
                Ok(())
            }
        }
    }
}
