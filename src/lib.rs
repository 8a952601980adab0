//! # Portrait Agent
//!
//! A worker agent that takes character-description steps from a task
//! protocol, renders a portrait with a diffusion model, pins it to IPFS and
//! reports the result back.
//!
//! ## Usage
//!
//! ```bash
//! portrait-agent run [-c agent.toml]
//! portrait-agent step <STEP_ID> --task-id <TASK_ID> --did <DID>
//! portrait-agent describe '{"hair": "red", "eyes": "blue"}'
//! ```
//!
//! ## Modules
//!
//! - `abstractions` - Traits and in-memory doubles for the gateway, generator and store
//! - `bootstrap` - Builds the runtime from configuration
//! - `cli` - Command-line interface
//! - `config` - Layered configuration (defaults, TOML, environment)
//! - `generation` - Device selection, prompts, inference client, exclusive access
//! - `normalizer` - Raw step input to canonical character description
//! - `orchestrator` - Per-step state machine
//! - `protocol` - Wire types, HTTP gateway and event subscription
//! - `reporter` - Task log entries and terminal step updates
//! - `storage` - Pinata and local-directory artifact stores
//! - `worker` - Subscription loop dispatching events to the orchestrator
//! - `testing` - Wired test context over the doubles
pub mod abstractions;
pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod error;
pub mod generation;
pub mod normalizer;
pub mod orchestrator;
pub mod protocol;
pub mod reporter;
pub mod storage;
pub mod worker;

pub mod testing;

pub use error::{Error, Result};
