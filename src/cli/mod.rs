//! Command-line interface
//!
//! Argument definitions live in [`args`]; this module dispatches them.

pub mod args;

pub use args::{Cli, Commands};

use crate::bootstrap::AgentRuntime;
use crate::config::{AgentConfig, ConfigLoader};
use crate::generation::{PromptTemplate, SystemProbe};
use crate::normalizer;
use crate::orchestrator::StepOutcome;
use crate::protocol::StepEvent;
use crate::worker::Worker;
use anyhow::{Context, Result};
use tracing::info;

pub async fn execute(cli: Cli) -> Result<()> {
    let config = ConfigLoader::new()
        .load(cli.config.as_deref())
        .await
        .context("Failed to load configuration")?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_worker(config).await,
        Commands::Step {
            step_id,
            task_id,
            did,
        } => run_single_step(config, step_id, task_id, did).await,
        Commands::Describe { input } => describe(&config.generation.prompt, &input),
    }
}

async fn run_worker(config: AgentConfig) -> Result<()> {
    let max_failures = config.protocol.max_consecutive_failures;
    let runtime = AgentRuntime::build(config, &SystemProbe)?;
    let source = runtime
        .subscribe()
        .await
        .context("Failed to subscribe to step events")?;

    let summary = Worker::new(runtime.orchestrator.clone(), source, max_failures)
        .run()
        .await?;
    info!(
        "Processed {} step(s) since {}",
        summary.processed(),
        summary.started_at
    );
    Ok(())
}

async fn run_single_step(
    config: AgentConfig,
    step_id: String,
    task_id: String,
    did: Option<String>,
) -> Result<()> {
    let did = match did {
        Some(did) => did,
        None => config.agent_did()?.to_string(),
    };
    let runtime = AgentRuntime::build(config, &SystemProbe)?;
    let event = StepEvent {
        step_id,
        task_id,
        did,
    };

    match runtime.orchestrator.run(&event).await? {
        StepOutcome::Completed { artifact } => println!("Completed: {artifact}"),
        StepOutcome::Failed { stage, message } => println!("Failed while {stage}: {message}"),
        StepOutcome::Skipped { status } => println!("Skipped: step is {status}"),
    }
    Ok(())
}

fn describe(prompts: &PromptTemplate, input: &str) -> Result<()> {
    let description = normalizer::normalize(Some(input))?;
    let rendered = description.render();
    println!("Description:\n{rendered}\n");
    println!("Prompt:\n{}\n", prompts.positive(&rendered));
    println!("Negative prompt:\n{}", prompts.negative());
    Ok(())
}
