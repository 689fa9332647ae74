//! Agent configuration.
//!
//! An [`AgentConfig`] is fixed once the [`Agent`](super::Agent) is built;
//! every run of that agent reads it through a shared reference.

use crate::llm::InferenceEndpoint;
use crate::tools::ToolRegistry;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Step budget used when a configuration does not name one.
pub const DEFAULT_MAX_STEPS: usize = 20;

/// The capability set an agent is built around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AgentKind {
    /// Gathers information through tool calls (search, page fetch)
    #[default]
    #[serde(rename = "tool-calling", alias = "ToolCallingAgent")]
    ToolCalling,
    /// Works things out by evaluating expressions
    #[serde(rename = "code-executing", alias = "CodeAgent")]
    CodeExecuting,
}

impl AgentKind {
    /// Names of the builtin tools an agent of this kind gets by default.
    #[must_use]
    pub fn default_tools(self) -> &'static [&'static str] {
        match self {
            Self::ToolCalling => &["web_search", "visit_webpage"],
            Self::CodeExecuting => &["calculate"],
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ToolCalling => write!(f, "tool-calling"),
            Self::CodeExecuting => write!(f, "code-executing"),
        }
    }
}

impl FromStr for AgentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tool-calling" | "ToolCallingAgent" => Ok(Self::ToolCalling),
            "code-executing" | "CodeAgent" => Ok(Self::CodeExecuting),
            other => Err(format!(
                "unknown agent type '{other}', expected 'tool-calling' or 'code-executing'"
            )),
        }
    }
}

/// Configuration for creating a new agent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Unique name; also names the delegate tool `delegate_to_<name>`
    pub name: String,
    /// What the agent is for; shown to the model and to managers
    pub description: String,
    /// The agent's capability set
    pub kind: AgentKind,
    /// Maximum number of think/act/observe iterations per run
    pub max_steps: usize,
    /// The tools the agent may call
    pub registry: Arc<ToolRegistry>,
    /// The model that drives the loop
    pub endpoint: Arc<dyn InferenceEndpoint>,
}

impl AgentConfig {
    /// Creates a configuration with no tools and the default budget.
    ///
    /// # Examples
    ///
    /// ```
    /// use conductor::agent::AgentConfig;
    /// use conductor::llm::{ModelResponse, ScriptedEndpoint};
    /// use std::sync::Arc;
    ///
    /// let endpoint = Arc::new(ScriptedEndpoint::always(ModelResponse::final_answer("4")));
    /// let config = AgentConfig::new("calc_agent", endpoint)
    ///     .with_description("Runs calculations.")
    ///     .with_max_steps(5);
    /// assert_eq!(config.max_steps, 5);
    /// ```
    #[must_use]
    pub fn new(name: impl Into<String>, endpoint: Arc<dyn InferenceEndpoint>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            kind: AgentKind::default(),
            max_steps: DEFAULT_MAX_STEPS,
            registry: Arc::new(ToolRegistry::empty()),
            endpoint,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the agent kind.
    #[must_use]
    pub fn with_kind(mut self, kind: AgentKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the step budget.
    #[must_use]
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Sets the tool registry.
    #[must_use]
    pub fn with_registry(mut self, registry: ToolRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// Sets a registry that is already shared.
    #[must_use]
    pub fn with_shared_registry(mut self, registry: Arc<ToolRegistry>) -> Self {
        self.registry = registry;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ModelResponse, ScriptedEndpoint};

    fn endpoint() -> Arc<dyn InferenceEndpoint> {
        Arc::new(ScriptedEndpoint::always(ModelResponse::final_answer("ok")))
    }

    #[test]
    fn new_uses_defaults() {
        let config = AgentConfig::new("web_agent", endpoint());
        assert_eq!(config.max_steps, DEFAULT_MAX_STEPS);
        assert_eq!(config.kind, AgentKind::ToolCalling);
        assert!(config.registry.is_empty());
        assert!(config.description.is_empty());
    }

    #[test]
    fn builders_set_fields() {
        let config = AgentConfig::new("calc_agent", endpoint())
            .with_kind(AgentKind::CodeExecuting)
            .with_description("Runs calculations.")
            .with_max_steps(3);
        assert_eq!(config.kind, AgentKind::CodeExecuting);
        assert_eq!(config.description, "Runs calculations.");
        assert_eq!(config.max_steps, 3);
    }

    #[test]
    fn kind_accepts_both_spellings() {
        assert_eq!("tool-calling".parse::<AgentKind>(), Ok(AgentKind::ToolCalling));
        assert_eq!("CodeAgent".parse::<AgentKind>(), Ok(AgentKind::CodeExecuting));
        assert!("ManagedAgent".parse::<AgentKind>().is_err());

        let kind: AgentKind = serde_json::from_str("\"ToolCallingAgent\"").unwrap();
        assert_eq!(kind, AgentKind::ToolCalling);
        assert_eq!(
            serde_json::to_string(&AgentKind::CodeExecuting).unwrap(),
            "\"code-executing\""
        );
    }

    #[test]
    fn kinds_map_to_default_tools() {
        assert_eq!(
            AgentKind::ToolCalling.default_tools(),
            &["web_search", "visit_webpage"]
        );
        assert_eq!(AgentKind::CodeExecuting.default_tools(), &["calculate"]);
    }
}
