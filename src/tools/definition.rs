//! Tool definition and executor traits.
//!
//! A tool is a [`ToolSchema`] paired with a [`ToolExecutor`]. The executor
//! returns text on success; failures are `ToolError`s that the registry hands
//! back to the agent loop as observations.

use crate::messages::ToolArguments;
use crate::tools::error::ToolError;
use crate::tools::schema::ToolSchema;
use crate::trace::ExecutionTrace;
use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Configuration for a registered tool.
#[derive(Debug, Clone)]
pub struct ToolConfig {
    /// The tool schema
    pub schema: ToolSchema,
    /// Execution timeout; `None` leaves timing to the tool itself
    pub timeout: Option<Duration>,
}

impl ToolConfig {
    /// Creates a new tool configuration without a timeout.
    #[must_use]
    pub fn new(schema: ToolSchema) -> Self {
        Self {
            schema,
            timeout: None,
        }
    }

    /// Sets the execution timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Per-run context handed to every tool invocation.
///
/// Delegate tools use it to run their sub-agent on the same trace and under
/// the same cancellation token as the manager.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// Trace of the run that issued the call
    pub trace: ExecutionTrace,
    /// Cancellation token of the run that issued the call
    pub cancel: CancellationToken,
}

/// The result type for tool execution futures.
pub type ToolExecutionFuture = Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send>>;

/// Trait for executing tools.
///
/// # Example
///
/// ```rust
/// use conductor::messages::ToolArguments;
/// use conductor::tools::{ToolContext, ToolExecutionFuture, ToolExecutor};
///
/// #[derive(Debug)]
/// struct EchoTool;
///
/// impl ToolExecutor for EchoTool {
///     fn execute(&self, args: ToolArguments, _ctx: ToolContext) -> ToolExecutionFuture {
///         Box::pin(async move { Ok(serde_json::Value::Object(args).to_string()) })
///     }
/// }
/// ```
pub trait ToolExecutor: Send + Sync + Debug {
    /// Executes the tool with arguments already validated against its schema.
    fn execute(&self, args: ToolArguments, ctx: ToolContext) -> ToolExecutionFuture;

    /// The agent this tool delegates to, if it is a delegate tool.
    fn delegate_target(&self) -> Option<&str> {
        None
    }
}

/// A tool ready for dispatch.
#[derive(Debug, Clone)]
pub struct RegisteredTool {
    /// Schema and execution settings
    pub config: ToolConfig,
    /// The executor
    pub executor: Arc<dyn ToolExecutor>,
}

impl RegisteredTool {
    /// Pairs a configuration with its executor.
    #[must_use]
    pub fn new(config: ToolConfig, executor: Arc<dyn ToolExecutor>) -> Self {
        Self { config, executor }
    }

    /// The tool's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.schema.name
    }
}
