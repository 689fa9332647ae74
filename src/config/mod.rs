//! Configuration management.
//!
//! Configuration is TOML. The search order is:
//! 1. `./conductor.toml` (project-local)
//! 2. `~/.config/conductor/config.toml` (XDG config)
//!
//! With no file, the built-in defaults describe a manager that delegates to
//! a web-research agent and a calculation agent on Cerebras inference.
//!
//! # Example Configuration
//!
//! ```toml
//! [provider]
//! model = "cerebras/llama-4-scout-17b-16e-instruct"
//! api_key_env = "CEREBRAS_API_KEY"
//!
//! [manager]
//! name = "manager_agent"
//! type = "code-executing"
//! max_steps = 12
//!
//! [[agents]]
//! name = "web_agent"
//! type = "tool-calling"
//! description = "Searches the internet and reads web pages to gather fresh data."
//! max_steps = 10
//!
//! [[agents]]
//! name = "calc_agent"
//! type = "code-executing"
//! description = "Runs calculations and data wrangling."
//!
//! [logging]
//! level = "info"
//! ```

mod catalog;
mod file;
mod types;

pub use catalog::{available_models, find_model, ModelInfo};
pub use file::{from_path, from_str, load, search_paths, xdg_config_dir};
pub use types::{
    AgentDescriptor, ConductorConfig, ProviderSection, TeamRequest, DEFAULT_PROMPT,
};
