//! CLI argument structures

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Generate character portraits for task-protocol steps
#[derive(Parser)]
#[command(name = "portrait-agent")]
#[command(about = "portrait-agent - Generate character portraits for assigned task steps", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to a TOML configuration file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Subscribe to the agent's room and process steps as they arrive (default)
    #[command(name = "run")]
    Run,

    /// Process a single step without subscribing
    #[command(name = "step")]
    Step {
        /// Step to process
        step_id: String,

        /// Task the step belongs to
        #[arg(long)]
        task_id: String,

        /// DID of the agent or task owner (defaults to AGENT_DID)
        #[arg(long)]
        did: Option<String>,
    },

    /// Show how an input payload is normalized and prompted
    #[command(name = "describe")]
    Describe {
        /// Raw input payload, free text or a JSON object
        input: String,
    },
}
