//! Agents and their think/act/observe loop.
//!
//! An [`Agent`] pairs an inference endpoint with a fixed tool registry and a
//! step budget. A [`ManagerAgent`] is an agent whose registry also holds a
//! delegate tool per managed agent.

mod config;
mod delegation;
mod prompt;
mod runner;
mod state;
mod trajectory;

pub use config::{AgentConfig, AgentKind, DEFAULT_MAX_STEPS};
pub use delegation::{delegate_tool_name, DelegateTool, ManagerAgent};
pub use prompt::render_system_prompt;
pub use runner::{Agent, RunContext};
pub use state::{AgentState, Termination};
pub use trajectory::{RunResult, StepErrorKind, StepOutcome, StepRecord, Trajectory};
