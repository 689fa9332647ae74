//! Configuration types.
//!
//! A [`ConductorConfig`] describes the provider, the manager, the managed
//! agents and the default task. It is read from TOML or built from a
//! [`TeamRequest`] payload; both end up in the same shape.

use crate::agent::{AgentKind, DEFAULT_MAX_STEPS};
use crate::error::ConfigurationError;
use crate::llm::{
    normalize_model_id, ProviderConfig, RetryPolicy, DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL,
    DEFAULT_MODEL,
};
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// The task run when none is given.
pub const DEFAULT_PROMPT: &str = "Plan a perfect geeky weekend in San Francisco for a visiting AI \
     enthusiast. Find one cool tech meetup on Saturday evening, an unusual bookstore to visit on \
     Sunday morning, and a scenic cafe with good Wi-Fi for Sunday afternoon hacking. Provide the \
     walking distance between each stop, both in kilometres and in 'Wafer-Scale Engine diagonals' \
     (21.5 cm per WSE). End with a rhyming slogan!";

/// Root configuration.
///
/// ```toml
/// default_prompt = "What is 2 + 2?"
///
/// [provider]
/// model = "cerebras/llama-3.3-70b"
/// api_key_env = "CEREBRAS_API_KEY"
///
/// [manager]
/// name = "manager_agent"
/// type = "code-executing"
/// max_steps = 12
///
/// [[agents]]
/// name = "web_agent"
/// type = "tool-calling"
/// description = "Searches the internet and reads web pages to gather fresh data."
/// max_steps = 10
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConductorConfig {
    /// Task used when the caller gives none
    pub default_prompt: String,
    /// Inference endpoint settings
    pub provider: ProviderSection,
    /// The agent that delegates
    pub manager: AgentDescriptor,
    /// The agents the manager delegates to, in order
    pub agents: Vec<AgentDescriptor>,
    /// Operator logging
    pub logging: LoggingConfig,
}

impl Default for ConductorConfig {
    fn default() -> Self {
        Self {
            default_prompt: DEFAULT_PROMPT.to_string(),
            provider: ProviderSection::default(),
            manager: AgentDescriptor::default_manager(),
            agents: AgentDescriptor::default_team(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ConductorConfig {
    /// Checks names and budgets across the manager and its agents.
    ///
    /// Tool names are checked when the team is assembled.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` for an invalid or duplicated agent name
    /// or a zero step budget.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let mut seen = HashSet::new();
        for descriptor in std::iter::once(&self.manager).chain(&self.agents) {
            descriptor.validate()?;
            if !seen.insert(descriptor.name.as_str()) {
                return Err(ConfigurationError::duplicate_agent(&descriptor.name));
            }
        }
        if self.default_prompt.trim().is_empty() {
            return Err(ConfigurationError::invalid_field(
                "default_prompt",
                "must not be empty",
            ));
        }
        Ok(())
    }

    /// Renders the configuration as TOML, with any literal API key masked.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if serialization fails.
    pub fn to_toml_redacted(&self) -> Result<String, ConfigurationError> {
        let mut shown = self.clone();
        if shown.provider.api_key.is_some() {
            shown.provider.api_key = Some("<redacted>".to_string());
        }
        toml::to_string_pretty(&shown)
            .map_err(|e| ConfigurationError::invalid_field("config", e.to_string()))
    }
}

/// The `[provider]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSection {
    /// OpenAI-compatible base URL
    pub base_url: String,
    /// Model id; a `cerebras/` prefix is accepted
    pub model: String,
    /// Literal API key; takes precedence over `api_key_env`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum tokens per completion
    pub max_tokens: u32,
    /// Retries for rate limits, timeouts and server errors
    pub max_retries: u32,
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout_secs: 120,
            max_tokens: 4096,
            max_retries: RetryPolicy::default().max_retries,
        }
    }
}

impl ProviderSection {
    /// Resolves the API key: the literal key, then the environment variable.
    #[must_use]
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
            return Some(key.clone());
        }
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }

    /// Builds the runtime provider configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` when no API key can be found or a
    /// setting is out of range.
    pub fn to_provider_config(&self) -> Result<ProviderConfig, ConfigurationError> {
        let api_key = self.resolve_api_key().ok_or_else(|| {
            ConfigurationError::missing_credentials(format!(
                "provider.api_key or ${}",
                self.api_key_env
            ))
        })?;

        let config = ProviderConfig::openai_compatible(&self.base_url, &self.model)
            .with_api_key(api_key)
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_max_tokens(self.max_tokens)
            .with_retry(RetryPolicy::new(self.max_retries));
        config
            .validate()
            .map_err(|e| ConfigurationError::invalid_field("provider", e.to_string()))?;
        Ok(config)
    }
}

/// One agent of the team: the `[manager]` table or an `[[agents]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    /// Unique agent name
    pub name: String,
    /// Capability set: `tool-calling` or `code-executing`
    #[serde(rename = "type", default)]
    pub kind: AgentKind,
    /// What the agent does; managers see it as the delegate tool description
    #[serde(default)]
    pub description: String,
    /// Step budget; the crate default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<usize>,
    /// Builtin tools; the kind's defaults when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<String>>,
}

impl AgentDescriptor {
    /// Creates a descriptor with default budget and tools.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: AgentKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            max_steps: None,
            tools: None,
        }
    }

    /// Sets the step budget.
    #[must_use]
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    /// Replaces the kind's default tools.
    #[must_use]
    pub fn with_tools(mut self, tools: &[&str]) -> Self {
        self.tools = Some(tools.iter().map(|t| (*t).to_string()).collect());
        self
    }

    /// The effective step budget.
    #[must_use]
    pub fn max_steps(&self) -> usize {
        self.max_steps.unwrap_or(DEFAULT_MAX_STEPS)
    }

    /// The effective builtin tool names.
    #[must_use]
    pub fn tool_names(&self) -> Vec<&str> {
        match &self.tools {
            Some(tools) => tools.iter().map(String::as_str).collect(),
            None => self.kind.default_tools().to_vec(),
        }
    }

    /// Checks the name and budget.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` for an empty name or a zero budget.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.name.trim().is_empty() {
            return Err(ConfigurationError::invalid_name("agent", &self.name));
        }
        if self.max_steps == Some(0) {
            return Err(ConfigurationError::invalid_max_steps(&self.name, 0));
        }
        Ok(())
    }

    /// The planner that delegates to the team.
    #[must_use]
    pub fn default_manager() -> Self {
        Self::new(
            "manager_agent",
            AgentKind::CodeExecuting,
            "Plans tasks, asks other agents for help, and assembles the final answer.",
        )
        .with_max_steps(12)
    }

    /// The web researcher and the calculator.
    #[must_use]
    pub fn default_team() -> Vec<Self> {
        vec![
            Self::new(
                "web_agent",
                AgentKind::ToolCalling,
                "Searches the internet and reads web pages to gather fresh data.",
            )
            .with_max_steps(10),
            Self::new(
                "calc_agent",
                AgentKind::CodeExecuting,
                "Runs calculations and data wrangling.",
            ),
        ]
    }
}

/// A run request as sent by a client: `{apiKey, modelId, prompt, agents}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamRequest {
    /// API key for the provider
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model id, e.g. `cerebras/llama-3.3-70b`
    #[serde(default)]
    pub model_id: Option<String>,
    /// The task
    #[serde(default)]
    pub prompt: Option<String>,
    /// Agents to manage; the base configuration's agents when empty
    #[serde(default)]
    pub agents: Vec<AgentDescriptor>,
}

impl TeamRequest {
    /// Checks that the required fields are present and non-empty.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` naming the first missing field.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if is_blank(&self.api_key) {
            return Err(ConfigurationError::missing_credentials("the request's apiKey"));
        }
        if is_blank(&self.model_id) {
            return Err(ConfigurationError::invalid_field("modelId", "is required"));
        }
        if is_blank(&self.prompt) {
            return Err(ConfigurationError::invalid_field("prompt", "is required"));
        }
        Ok(())
    }

    /// Merges the request onto `base` and returns the resulting
    /// configuration together with the task.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if the request is incomplete or the
    /// merged configuration is invalid.
    pub fn merge_into(
        self,
        mut base: ConductorConfig,
    ) -> Result<(ConductorConfig, String), ConfigurationError> {
        self.validate()?;
        let (Some(api_key), Some(model_id), Some(prompt)) = (self.api_key, self.model_id, self.prompt)
        else {
            return Err(ConfigurationError::invalid_field("request", "incomplete"));
        };

        base.provider.api_key = Some(api_key);
        base.provider.model = normalize_model_id(&model_id);
        if !self.agents.is_empty() {
            base.agents = self.agents;
        }
        base.validate()?;
        Ok((base, prompt))
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_reproduce_the_demo_team() {
        let config = ConductorConfig::default();
        assert_eq!(config.manager.name, "manager_agent");
        assert_eq!(config.manager.max_steps(), 12);

        let names: Vec<&str> = config.agents.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["web_agent", "calc_agent"]);
        assert_eq!(config.agents[0].max_steps(), 10);
        assert_eq!(config.agents[1].max_steps(), DEFAULT_MAX_STEPS);
        assert_eq!(config.agents[1].kind, AgentKind::CodeExecuting);
        assert!(config.default_prompt.contains("Wafer-Scale Engine diagonals"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn descriptor_tools_default_by_kind() {
        let web = AgentDescriptor::new("web", AgentKind::ToolCalling, "");
        assert_eq!(web.tool_names(), vec!["web_search", "visit_webpage"]);

        let custom = web.with_tools(&["visit_webpage"]);
        assert_eq!(custom.tool_names(), vec!["visit_webpage"]);
    }

    #[test]
    fn duplicate_agent_names_are_rejected() {
        let mut config = ConductorConfig::default();
        config.agents.push(AgentDescriptor::new("web_agent", AgentKind::ToolCalling, "again"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_budget_is_rejected() {
        let mut config = ConductorConfig::default();
        config.agents[0].max_steps = Some(0);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_steps = 0"));
    }

    #[test]
    fn provider_prefers_literal_key() {
        let section = ProviderSection {
            api_key: Some("csk-literal".into()),
            api_key_env: "CONDUCTOR_TEST_UNSET_KEY".into(),
            ..ProviderSection::default()
        };
        let provider = section.to_provider_config().unwrap();
        assert_eq!(provider.api_key, "csk-literal");
        assert_eq!(provider.model, DEFAULT_MODEL);
    }

    #[test]
    fn provider_without_key_is_missing_credentials() {
        let section = ProviderSection {
            api_key_env: "CONDUCTOR_TEST_DEFINITELY_UNSET".into(),
            ..ProviderSection::default()
        };
        let err = section.to_provider_config().unwrap_err();
        assert!(err.is_missing_credentials());
        assert!(err.to_string().contains("CONDUCTOR_TEST_DEFINITELY_UNSET"));
    }

    #[test]
    fn provider_strips_model_prefix() {
        let section = ProviderSection {
            api_key: Some("k".into()),
            model: "cerebras/llama-3.3-70b".into(),
            ..ProviderSection::default()
        };
        assert_eq!(section.to_provider_config().unwrap().model, "llama-3.3-70b");
    }

    #[test]
    fn provider_carries_retry_count() {
        let section = ProviderSection {
            api_key: Some("k".into()),
            max_retries: 5,
            ..ProviderSection::default()
        };
        assert_eq!(section.to_provider_config().unwrap().retry.max_retries, 5);
        assert_eq!(ProviderSection::default().max_retries, 2);
    }

    #[test]
    fn request_parses_camel_case_payload() {
        let request: TeamRequest = serde_json::from_str(
            r#"{
                "apiKey": "csk-1",
                "modelId": "cerebras/qwen-3-32b",
                "prompt": "What is 2+2?",
                "agents": [{"name": "calc_agent", "type": "CodeAgent", "description": "math"}]
            }"#,
        )
        .unwrap();
        assert_eq!(request.agents[0].kind, AgentKind::CodeExecuting);

        let (config, task) = request.merge_into(ConductorConfig::default()).unwrap();
        assert_eq!(task, "What is 2+2?");
        assert_eq!(config.provider.model, "qwen-3-32b");
        assert_eq!(config.provider.api_key.as_deref(), Some("csk-1"));
        assert_eq!(config.agents.len(), 1);
    }

    #[test]
    fn request_missing_fields_are_rejected() {
        let missing_key = TeamRequest {
            model_id: Some("m".into()),
            prompt: Some("p".into()),
            ..TeamRequest::default()
        };
        assert!(missing_key.validate().unwrap_err().is_missing_credentials());

        let missing_prompt = TeamRequest {
            api_key: Some("k".into()),
            model_id: Some("m".into()),
            prompt: Some("   ".into()),
            ..TeamRequest::default()
        };
        assert!(missing_prompt.validate().unwrap_err().to_string().contains("prompt"));
    }

    #[test]
    fn request_without_agents_keeps_base_team() {
        let request = TeamRequest {
            api_key: Some("k".into()),
            model_id: Some("llama3.1-8b".into()),
            prompt: Some("hi".into()),
            agents: Vec::new(),
        };
        let (config, _) = request.merge_into(ConductorConfig::default()).unwrap();
        assert_eq!(config.agents.len(), 2);
    }

    #[test]
    fn unknown_agent_type_fails_to_parse() {
        let result: Result<TeamRequest, _> = serde_json::from_str(
            r#"{"agents": [{"name": "x", "type": "ManagedAgent"}]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn redacted_toml_hides_key() {
        let mut config = ConductorConfig::default();
        config.provider.api_key = Some("csk-secret".into());
        let rendered = config.to_toml_redacted().unwrap();
        assert!(!rendered.contains("csk-secret"));
        assert!(rendered.contains("<redacted>"));
        assert!(rendered.contains("[[agents]]"));
    }
}
