//! # conductor: hierarchical LLM agents
//!
//! A manager agent decomposes a task and delegates sub-tasks to specialised
//! agents (a web researcher and a calculator), each driven by the same
//! think/act/observe loop, then assembles the final answer.
//!
//! ## Architecture
//!
//! - **InferenceEndpoint**: stateless model adapter returning a final answer,
//!   a tool call, or a malformed reply
//! - **ToolRegistry**: an agent's fixed, schema-validated tool set
//! - **Agent**: the step-budgeted loop; every failure inside a run becomes
//!   an observation the model can react to
//! - **ManagerAgent**: an agent with one `delegate_to_<name>` tool per
//!   managed agent
//! - **ExecutionTrace**: the run-scoped, ordered progress feed
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use conductor::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ConfigurationError> {
//!     let config = conductor::config::load()?;
//!     let team = Team::connect(&config)?;
//!
//!     let result = team.run("What is 2 + 2?").await;
//!     match result.outcome {
//!         Ok(answer) => println!("{answer}"),
//!         Err(error) => eprintln!("{error}"),
//!     }
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod llm;
pub mod logging;
pub mod messages;
pub mod team;
pub mod tools;
pub mod trace;
pub mod types;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::agent::{
        Agent, AgentConfig, AgentKind, AgentState, ManagerAgent, RunContext, RunResult,
        StepOutcome, StepRecord, Trajectory,
    };
    pub use crate::config::{AgentDescriptor, ConductorConfig, TeamRequest};
    pub use crate::error::{ConfigurationError, RunError};
    pub use crate::llm::{InferenceEndpoint, ModelResponse, OpenAIEndpoint, ScriptedEndpoint};
    pub use crate::messages::{Message, MessageRole, ToolCallRequest};
    pub use crate::team::{StreamingRun, Team};
    pub use crate::tools::{ToolError, ToolRegistry, ToolSchema};
    pub use crate::trace::{ChunkKind, TraceChunk, TraceEvent, TraceStream};
    pub use crate::types::RunId;
}
