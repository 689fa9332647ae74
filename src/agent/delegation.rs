//! Delegation: sub-agents as tools.
//!
//! A [`ManagerAgent`] gets one `delegate_to_<name>` tool per managed agent.
//! Calling that tool runs the sub-agent to completion on the manager's trace
//! and cancellation token and returns its final answer as the observation,
//! so the loop needs no delegation-specific path.

use crate::agent::config::AgentConfig;
use crate::agent::runner::{Agent, RunContext};
use crate::agent::trajectory::RunResult;
use crate::error::ConfigurationError;
use crate::messages::ToolArguments;
use crate::tools::{
    ParamType, RegisteredTool, ToolConfig, ToolContext, ToolError, ToolExecutionFuture,
    ToolExecutor, ToolParameter, ToolSchema,
};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

/// Name of the tool that delegates to `agent_name`.
#[must_use]
pub fn delegate_tool_name(agent_name: &str) -> String {
    format!("delegate_to_{agent_name}")
}

/// A tool whose execution is a full run of another agent.
#[derive(Debug, Clone)]
pub struct DelegateTool {
    agent: Arc<Agent>,
}

impl DelegateTool {
    /// Wraps a sub-agent.
    #[must_use]
    pub fn new(agent: Arc<Agent>) -> Self {
        Self { agent }
    }

    /// The schema: the sub-agent's description and a single `task` string.
    #[must_use]
    pub fn config(&self) -> ToolConfig {
        let description = if self.agent.description().is_empty() {
            format!("Hand a task to the agent '{}'.", self.agent.name())
        } else {
            self.agent.description().to_string()
        };
        ToolConfig::new(
            ToolSchema::new(delegate_tool_name(self.agent.name()), description).with_parameter(
                ToolParameter::required(
                    "task",
                    ParamType::String,
                    "The complete, self-contained task for this agent",
                ),
            ),
        )
    }

    /// Pairs the schema with this executor.
    #[must_use]
    pub fn into_registered(self) -> RegisteredTool {
        let config = self.config();
        RegisteredTool::new(config, Arc::new(self))
    }
}

impl ToolExecutor for DelegateTool {
    fn execute(&self, args: ToolArguments, ctx: ToolContext) -> ToolExecutionFuture {
        let agent = Arc::clone(&self.agent);
        Box::pin(async move {
            let Some(Value::String(task)) = args.get("task") else {
                return Err(ToolError::validation_failed(
                    delegate_tool_name(agent.name()),
                    "missing required argument 'task'",
                ));
            };

            tracing::info!(sub_agent = %agent.name(), task_len = task.len(), "Delegating task");
            let run_ctx = RunContext {
                trace: ctx.trace,
                cancel: ctx.cancel,
            };
            let result = agent.run_with(task, &run_ctx).await;

            match result.outcome {
                Ok(answer) => Ok(answer),
                Err(error) => {
                    tracing::warn!(sub_agent = %agent.name(), error = %error, "Delegated run failed");
                    Err(ToolError::delegation_failed(agent.name(), error.to_string()))
                }
            }
        })
    }

    fn delegate_target(&self) -> Option<&str> {
        Some(self.agent.name())
    }
}

/// An agent whose tools include one delegate tool per managed agent.
///
/// Managed agents are shared, not owned: they can be run or inspected
/// independently of the manager.
#[derive(Debug)]
pub struct ManagerAgent {
    agent: Agent,
    managed: Vec<Arc<Agent>>,
}

impl ManagerAgent {
    /// Adds delegate tools for `managed` to the configuration's registry and
    /// builds the manager.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` when a managed agent can itself delegate,
    /// when two agents share a name, when a delegate tool name collides with
    /// an existing tool, or when the manager configuration is invalid.
    pub fn new(config: AgentConfig, managed: Vec<Arc<Agent>>) -> Result<Self, ConfigurationError> {
        let mut registry = (*config.registry).clone();
        let mut seen = HashSet::new();
        seen.insert(config.name.as_str());

        for sub in &managed {
            if !sub.config().registry.delegates().is_empty() {
                tracing::error!(
                    manager = %config.name,
                    sub_agent = %sub.name(),
                    "nested delegation rejected"
                );
                return Err(ConfigurationError::nested_delegation(sub.name()));
            }
            if !seen.insert(sub.name()) {
                tracing::error!(manager = %config.name, sub_agent = %sub.name(), "duplicate agent name");
                return Err(ConfigurationError::duplicate_agent(sub.name()));
            }

            let tool = DelegateTool::new(Arc::clone(sub));
            registry = registry.with_tool(tool.config(), Arc::new(tool))?;
        }

        let agent = Agent::new(config.with_registry(registry))?;
        tracing::info!(
            manager = %agent.name(),
            managed = managed.len(),
            "Manager configured"
        );
        Ok(Self { agent, managed })
    }

    /// The manager's own agent.
    #[must_use]
    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// The manager's name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.agent.name()
    }

    /// The managed agents, in delegation-tool order.
    #[must_use]
    pub fn managed(&self) -> &[Arc<Agent>] {
        &self.managed
    }

    /// Looks up a managed agent by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Arc<Agent>> {
        self.managed.iter().find(|a| a.name() == name)
    }

    /// Runs a task with no trace consumer and no way to cancel.
    pub async fn run(&self, task: &str) -> RunResult {
        self.agent.run(task).await
    }

    /// Runs a task; delegated runs share `ctx`.
    pub async fn run_with(&self, task: &str, ctx: &RunContext) -> RunResult {
        self.agent.run_with(task, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::trajectory::{StepErrorKind, StepOutcome};
    use crate::llm::{ModelResponse, ScriptedEndpoint};
    use serde_json::json;

    fn sub_agent(name: &str, response: ModelResponse, max_steps: usize) -> Arc<Agent> {
        Arc::new(
            Agent::new(
                AgentConfig::new(name, Arc::new(ScriptedEndpoint::always(response)))
                    .with_description(format!("{name} does things"))
                    .with_max_steps(max_steps),
            )
            .unwrap(),
        )
    }

    fn manager_endpoint(target: &str) -> Arc<ScriptedEndpoint> {
        Arc::new(ScriptedEndpoint::sequence(vec![
            ModelResponse::tool_call(delegate_tool_name(target), json!({"task": "2+2"})),
            ModelResponse::final_answer("done"),
        ]))
    }

    #[test]
    fn delegate_schema_mirrors_sub_agent() {
        let tool = DelegateTool::new(sub_agent("calc_agent", ModelResponse::final_answer("4"), 2));
        let config = tool.config();
        assert_eq!(config.schema.name, "delegate_to_calc_agent");
        assert_eq!(config.schema.description, "calc_agent does things");
        assert_eq!(config.schema.signature(), "delegate_to_calc_agent(task: string)");
        assert_eq!(tool.delegate_target(), Some("calc_agent"));
    }

    #[tokio::test]
    async fn sub_agent_answer_is_the_observation() {
        let calc = sub_agent("calc_agent", ModelResponse::final_answer("4"), 2);
        let manager = ManagerAgent::new(
            AgentConfig::new("manager_agent", manager_endpoint("calc_agent")),
            vec![calc],
        )
        .unwrap();

        let result = manager.run("what is 2+2?").await;
        assert_eq!(result.answer(), Some("done"));
        assert_eq!(
            result.trajectory.steps()[0].outcome,
            StepOutcome::Observation { text: "4".into() }
        );
    }

    #[tokio::test]
    async fn exhausted_sub_agent_is_a_delegation_failure() {
        let stuck = sub_agent("web_agent", ModelResponse::malformed("???"), 1);
        let manager = ManagerAgent::new(
            AgentConfig::new("manager_agent", manager_endpoint("web_agent")),
            vec![stuck],
        )
        .unwrap();

        let result = manager.run("look something up").await;
        let first = &result.trajectory.steps()[0];
        assert!(matches!(
            first.outcome,
            StepOutcome::Error { kind: StepErrorKind::Delegation, .. }
        ));
        assert!(first
            .outcome
            .text()
            .starts_with("Error executing delegate_to_web_agent: agent 'web_agent'"));
        assert_eq!(result.answer(), Some("done"));
    }

    #[test]
    fn nested_delegation_is_rejected() {
        let leaf = sub_agent("calc_agent", ModelResponse::final_answer("4"), 2);
        let middle = ManagerAgent::new(
            AgentConfig::new("middle", manager_endpoint("calc_agent")),
            vec![leaf],
        )
        .unwrap();
        let middle_agent = Arc::new(
            Agent::new(
                AgentConfig::new("middle", manager_endpoint("calc_agent"))
                    .with_shared_registry(Arc::clone(&middle.agent().config().registry)),
            )
            .unwrap(),
        );

        let err = ManagerAgent::new(
            AgentConfig::new("top", manager_endpoint("middle")),
            vec![middle_agent],
        )
        .unwrap_err();
        assert!(err.is_nested_delegation());
    }

    #[test]
    fn duplicate_sub_agents_are_rejected() {
        let a = sub_agent("calc_agent", ModelResponse::final_answer("4"), 2);
        let b = sub_agent("calc_agent", ModelResponse::final_answer("5"), 2);
        let err = ManagerAgent::new(
            AgentConfig::new("manager_agent", manager_endpoint("calc_agent")),
            vec![a, b],
        )
        .unwrap_err();
        assert!(err.to_string().contains("calc_agent"));
    }

    #[test]
    fn manager_lists_managed_agents() {
        let calc = sub_agent("calc_agent", ModelResponse::final_answer("4"), 2);
        let web = sub_agent("web_agent", ModelResponse::final_answer("x"), 2);
        let manager = ManagerAgent::new(
            AgentConfig::new("manager_agent", manager_endpoint("calc_agent")),
            vec![calc, web],
        )
        .unwrap();

        assert_eq!(manager.managed().len(), 2);
        assert!(manager.find("web_agent").is_some());
        assert_eq!(
            manager.agent().config().registry.delegates(),
            vec!["calc_agent", "web_agent"]
        );
        assert!(manager.agent().system_prompt().contains("You lead a team"));
    }
}
