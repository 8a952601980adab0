//! Task lifecycle orchestration
//!
//! Drives one step from delivery to a terminal outcome:
//!
//! ```text
//! Received -> Validated -> Describing -> Generating -> Uploading -> Reporting -> Completed
//!     |                        |              |             |
//!     v                        +--------------+-------------+--> Failed
//!  Skipped
//! ```
//!
//! Each stage returns a `Result`; the transition function consumes it and
//! picks the next state. Validation, generation and upload failures end the
//! step with a single error log and no step update. Gateway failures are
//! returned to the caller.

use crate::abstractions::{ArtifactStore, GeneratedImage, ImageGenerator, TaskGateway};
use crate::error::{Error, Result};
use crate::generation::ExclusiveAccess;
use crate::normalizer::{self, CharacterDescription};
use crate::protocol::{ArtifactReference, LogLevel, StepEvent, StepStatus, TaskStep};
use crate::reporter::StatusReporter;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument};

pub const START_MESSAGE: &str = "Starting image generation...";
pub const NO_CHARACTER_DATA_MESSAGE: &str = "No character data provided.";

/// Stage at which a processed step failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Describing,
    Generating,
    Uploading,
}

/// Terminal result of one orchestrator run
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Completed { artifact: ArtifactReference },
    Failed { stage: FailureStage, message: String },
    Skipped { status: StepStatus },
}

impl StepOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, StepOutcome::Completed { .. })
    }
}

enum StepState {
    Received(TaskStep),
    Validated(TaskStep),
    Describing(TaskStep),
    Generating {
        step: TaskStep,
        description: CharacterDescription,
    },
    Uploading {
        step: TaskStep,
        image: GeneratedImage,
    },
    Reporting {
        step: TaskStep,
        artifact: ArtifactReference,
    },
    Done(StepOutcome),
}

impl StepState {
    fn name(&self) -> &'static str {
        match self {
            StepState::Received(_) => "received",
            StepState::Validated(_) => "validated",
            StepState::Describing(_) => "describing",
            StepState::Generating { .. } => "generating",
            StepState::Uploading { .. } => "uploading",
            StepState::Reporting { .. } => "reporting",
            StepState::Done(StepOutcome::Completed { .. }) => "completed",
            StepState::Done(StepOutcome::Failed { .. }) => "failed",
            StepState::Done(StepOutcome::Skipped { .. }) => "skipped",
        }
    }
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureStage::Describing => "describing",
            FailureStage::Generating => "generating",
            FailureStage::Uploading => "uploading",
        };
        f.write_str(name)
    }
}

/// Runs the step state machine against injected collaborators
pub struct TaskOrchestrator {
    gateway: Arc<dyn TaskGateway>,
    generator: Arc<dyn ImageGenerator>,
    generation_access: Arc<ExclusiveAccess>,
    store: Arc<dyn ArtifactStore>,
    reporter: StatusReporter,
}

impl TaskOrchestrator {
    pub fn new(
        gateway: Arc<dyn TaskGateway>,
        generator: Arc<dyn ImageGenerator>,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self::with_generation_access(gateway, generator, store, Arc::new(ExclusiveAccess::new()))
    }

    /// Share `generation_access` with other orchestrators using the same generator
    pub fn with_generation_access(
        gateway: Arc<dyn TaskGateway>,
        generator: Arc<dyn ImageGenerator>,
        store: Arc<dyn ArtifactStore>,
        generation_access: Arc<ExclusiveAccess>,
    ) -> Self {
        let reporter = StatusReporter::new(gateway.clone());
        Self {
            gateway,
            generator,
            generation_access,
            store,
            reporter,
        }
    }

    /// Process one delivered step event to completion
    ///
    /// Only gateway failures are returned as errors; every other failure is
    /// reported through the task log and shows up as [`StepOutcome::Failed`].
    #[instrument(skip_all, fields(step_id = %event.step_id, task_id = %event.task_id))]
    pub async fn run(&self, event: &StepEvent) -> Result<StepOutcome> {
        let step = self.gateway.get_step(&event.step_id).await?;
        let mut state = StepState::Received(step);

        loop {
            if let StepState::Done(outcome) = state {
                return Ok(outcome);
            }
            let from = state.name();
            state = self.advance(event, state).await?;
            debug!("{} -> {}", from, state.name());
        }
    }

    async fn advance(&self, event: &StepEvent, state: StepState) -> Result<StepState> {
        match state {
            StepState::Received(step) => {
                if step.is_pending() {
                    Ok(StepState::Validated(step))
                } else {
                    info!("Step status is {}, not pending; skipping", step.step_status);
                    Ok(StepState::Done(StepOutcome::Skipped {
                        status: step.step_status,
                    }))
                }
            }
            StepState::Validated(step) => {
                self.reporter
                    .report_log(&step.task_id, START_MESSAGE, LogLevel::Info, None)
                    .await?;
                Ok(StepState::Describing(step))
            }
            StepState::Describing(step) => match normalizer::normalize(step.input_query.as_deref()) {
                Ok(description) => Ok(StepState::Generating { step, description }),
                Err(e) => self.fail(&step, FailureStage::Describing, e).await,
            },
            StepState::Generating { step, description } => {
                let prompt = description.render();
                let generated = self
                    .generation_access
                    .with_exclusive_access(|| self.generator.generate(&prompt))
                    .await;
                match generated {
                    Ok(image) => Ok(StepState::Uploading { step, image }),
                    Err(e) => self.fail(&step, FailureStage::Generating, e).await,
                }
            }
            StepState::Uploading { step, image } => {
                let filename = format!("{}.png", event.task_id);
                match self.store.upload(&image, &filename).await {
                    Ok(artifact) => Ok(StepState::Reporting { step, artifact }),
                    Err(e) => self.fail(&step, FailureStage::Uploading, e).await,
                }
            }
            StepState::Reporting { step, artifact } => {
                let label = self.store.label();
                self.reporter
                    .report_terminal(
                        event,
                        StepStatus::Completed,
                        format!("Image generated and uploaded to {label}"),
                        vec![artifact.clone()],
                        true,
                    )
                    .await?;
                self.reporter
                    .report_log(
                        &step.task_id,
                        format!("Image generation and upload to {label} completed."),
                        LogLevel::Info,
                        Some(StepStatus::Completed),
                    )
                    .await?;
                Ok(StepState::Done(StepOutcome::Completed { artifact }))
            }
            done @ StepState::Done(_) => Ok(done),
        }
    }

    /// Log a step-local failure; the step itself is left untouched
    async fn fail(&self, step: &TaskStep, stage: FailureStage, error: Error) -> Result<StepState> {
        debug_assert!(
            error.is_step_failure(),
            "{stage} produced an error that should have propagated: {error}"
        );
        let message = match (&error, stage) {
            (Error::Validation(_), _) | (_, FailureStage::Describing) => {
                NO_CHARACTER_DATA_MESSAGE.to_string()
            }
            _ => format!("Error during image generation: {error}"),
        };
        self.reporter
            .report_log(
                &step.task_id,
                message.clone(),
                LogLevel::Error,
                Some(StepStatus::Failed),
            )
            .await?;
        Ok(StepState::Done(StepOutcome::Failed { stage, message }))
    }
}
