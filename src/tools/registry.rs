//! Per-agent tool registry.
//!
//! A registry is fixed at construction and shared read-only between runs.
//! It resolves tool calls by exact, case-sensitive name, validates the
//! arguments against the tool schema, enforces the tool timeout, and turns
//! a panicking tool into an ordinary execution failure.

use crate::error::ConfigurationError;
use crate::llm::FINAL_ANSWER_TOOL;
use crate::messages::ToolCallRequest;
use crate::tools::definition::{RegisteredTool, ToolConfig, ToolContext, ToolExecutor};
use crate::tools::error::ToolError;
use crate::tools::schema::ToolSchema;
use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// An agent's fixed set of tools.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    /// Tools in registration order
    tools: Vec<RegisteredTool>,
    /// Name to position in `tools`
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Builds a registry, rejecting duplicate or invalid names.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if two tools share a name or a name is
    /// not a valid identifier.
    pub fn new(tools: impl IntoIterator<Item = RegisteredTool>) -> Result<Self, ConfigurationError> {
        let mut registry = Self::default();
        for tool in tools {
            registry.insert(tool)?;
        }
        Ok(registry)
    }

    /// An empty registry.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the registry with one more tool.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if the name is taken, reserved or invalid.
    pub fn with_tool(
        mut self,
        config: ToolConfig,
        executor: Arc<dyn ToolExecutor>,
    ) -> Result<Self, ConfigurationError> {
        self.insert(RegisteredTool::new(config, executor))?;
        Ok(self)
    }

    fn insert(&mut self, tool: RegisteredTool) -> Result<(), ConfigurationError> {
        let name = tool.name().to_string();
        if !is_valid_tool_name(&name) {
            return Err(ConfigurationError::invalid_name("tool", name));
        }
        if name == FINAL_ANSWER_TOOL {
            return Err(ConfigurationError::reserved_tool(name));
        }
        if self.index.contains_key(&name) {
            tracing::error!(tool_name = %name, "duplicate tool name rejected");
            return Err(ConfigurationError::duplicate_tool(name));
        }

        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Schemas of all tools, in registration order.
    #[must_use]
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.iter().map(|t| t.config.schema.clone()).collect()
    }

    /// Names of all tools, in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    /// Looks up a tool by exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// Checks if a tool is registered.
    #[must_use]
    pub fn has_tool(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Returns the number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns true if no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Names of the agents this registry can delegate to.
    #[must_use]
    pub fn delegates(&self) -> Vec<&str> {
        self.tools
            .iter()
            .filter_map(|t| t.executor.delegate_target())
            .collect()
    }

    /// Resolves and runs a tool call.
    ///
    /// # Errors
    ///
    /// Every failure is a `ToolError` meant to become an observation:
    /// unknown name, invalid arguments, timeout, execution failure or a
    /// panic inside the tool.
    #[tracing::instrument(skip_all, fields(tool_name = %call.name))]
    pub async fn execute(&self, call: &ToolCallRequest, ctx: &ToolContext) -> Result<String, ToolError> {
        let Some(tool) = self.get(&call.name) else {
            tracing::warn!("model requested an unknown tool");
            return Err(ToolError::not_found(&call.name, self.names()));
        };

        let args = tool.config.schema.validate(call.arguments.clone())?;
        let future = AssertUnwindSafe(tool.executor.execute(args, ctx.clone())).catch_unwind();

        let outcome = match tool.config.timeout {
            Some(limit) => match tokio::time::timeout(limit, future).await {
                Ok(outcome) => outcome,
                Err(_) => return Err(ToolError::timeout(&call.name, limit)),
            },
            None => future.await,
        };

        match outcome {
            Ok(result) => result,
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                tracing::error!(reason = %reason, "tool panicked");
                Err(ToolError::execution_failed(
                    &call.name,
                    format!("tool panicked: {reason}"),
                ))
            }
        }
    }
}

/// Tool names go into model prompts and function-calling payloads, so they
/// are restricted to `[A-Za-z0-9_-]`.
fn is_valid_tool_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
