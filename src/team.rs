//! Team assembly and runs.
//!
//! A [`Team`] turns a [`ConductorConfig`] into sub-agents with their builtin
//! tools and a manager that delegates to them. Payload-driven and file-driven
//! configurations take the same path.

use crate::agent::{Agent, AgentConfig, ManagerAgent, RunContext, RunResult};
use crate::config::{AgentDescriptor, ConductorConfig};
use crate::error::ConfigurationError;
use crate::llm::{InferenceEndpoint, OpenAIEndpoint};
use crate::tools::builtins::BuiltinTools;
use crate::trace::{trace_channel, ExecutionTrace, TraceStream};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A manager and the agents it delegates to.
#[derive(Debug)]
pub struct Team {
    manager: ManagerAgent,
    default_prompt: String,
}

/// A run executing in the background.
#[derive(Debug)]
pub struct StreamingRun {
    /// Resolves to the manager's result once the run is over
    pub handle: JoinHandle<RunResult>,
    /// Every chunk of the run, then one end-of-stream marker
    pub stream: TraceStream,
    /// Cancels the run at its next step boundary
    pub cancel: CancellationToken,
}

impl Team {
    /// Builds the team on an existing endpoint. Every agent shares it.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` for invalid names or budgets, duplicate
    /// agents, or tool names that are not builtins.
    pub fn from_config(
        config: &ConductorConfig,
        endpoint: Arc<dyn InferenceEndpoint>,
    ) -> Result<Self, ConfigurationError> {
        config.validate()?;

        let managed = config
            .agents
            .iter()
            .map(|descriptor| {
                agent_config(descriptor, Arc::clone(&endpoint))
                    .and_then(Agent::new)
                    .map(Arc::new)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let manager = ManagerAgent::new(agent_config(&config.manager, endpoint)?, managed)?;

        tracing::info!(
            manager = %manager.name(),
            agents = manager.managed().len(),
            "Team assembled"
        );
        Ok(Self {
            manager,
            default_prompt: config.default_prompt.clone(),
        })
    }

    /// Builds the team on the configured OpenAI-compatible provider.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` for missing credentials, an unusable
    /// provider, or any error of [`Team::from_config`].
    pub fn connect(config: &ConductorConfig) -> Result<Self, ConfigurationError> {
        let provider = config.provider.to_provider_config()?;
        let endpoint = OpenAIEndpoint::new(&provider)
            .map_err(|e| ConfigurationError::invalid_field("provider", e.to_string()))?;
        Self::from_config(config, Arc::new(endpoint))
    }

    /// The manager.
    #[must_use]
    pub fn manager(&self) -> &ManagerAgent {
        &self.manager
    }

    /// The task used when the caller gives none.
    #[must_use]
    pub fn default_prompt(&self) -> &str {
        &self.default_prompt
    }

    /// Runs a task to completion.
    pub async fn run(&self, task: &str) -> RunResult {
        self.manager.run(task).await
    }

    /// Runs a task with the caller's trace and cancellation token.
    pub async fn run_with(&self, task: &str, ctx: &RunContext) -> RunResult {
        self.manager.run_with(task, ctx).await
    }

    /// Spawns a run on the tokio runtime and returns its trace stream.
    ///
    /// The stream ends with exactly one end-of-stream marker, even if the
    /// run task panics or is aborted.
    pub fn run_streaming(self: Arc<Self>, task: impl Into<String>) -> StreamingRun {
        let task = task.into();
        let (trace, stream) = trace_channel();
        let cancel = CancellationToken::new();
        let ctx = RunContext::new()
            .with_trace(trace.clone())
            .with_cancel(cancel.clone());

        let handle = tokio::spawn(async move {
            let _finish = FinishOnDrop(trace);
            self.run_with(&task, &ctx).await
        });

        StreamingRun {
            handle,
            stream,
            cancel,
        }
    }
}

/// Sends end-of-stream when the run task ends, however it ends.
struct FinishOnDrop(ExecutionTrace);

impl Drop for FinishOnDrop {
    fn drop(&mut self) {
        self.0.finish();
    }
}

fn agent_config(
    descriptor: &AgentDescriptor,
    endpoint: Arc<dyn InferenceEndpoint>,
) -> Result<AgentConfig, ConfigurationError> {
    let names = descriptor.tool_names();
    let tools = BuiltinTools::select(&names).map_err(|e| {
        let available = BuiltinTools::available()
            .iter()
            .map(ToString::to_string)
            .collect();
        ConfigurationError::unknown_tool(&descriptor.name, e.tool_name(), available)
    })?;

    Ok(AgentConfig::new(&descriptor.name, endpoint)
        .with_description(&descriptor.description)
        .with_kind(descriptor.kind)
        .with_max_steps(descriptor.max_steps())
        .with_registry(tools.into_registry()?))
}
