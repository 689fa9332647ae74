//! Tools: schema-typed capabilities an agent can invoke by name.
//!
//! ```text
//!   ToolCallRequest ──> ToolRegistry::execute
//!                         │ lookup by exact name      (NotFound)
//!                         │ ToolSchema::validate      (ValidationFailed)
//!                         │ ToolExecutor::execute
//!                         │   under optional timeout  (Timeout)
//!                         │   with panics caught      (ExecutionFailed)
//!                         v
//!                  Result<String, ToolError>
//! ```
//!
//! Whatever comes back, the agent loop turns it into observation text.

pub mod builtins;
mod definition;
mod error;
mod registry;
mod schema;

pub use definition::{RegisteredTool, ToolConfig, ToolContext, ToolExecutionFuture, ToolExecutor};
pub use error::{ToolError, ToolErrorKind};
pub use registry::ToolRegistry;
pub use schema::{ParamType, ToolParameter, ToolSchema};
