//! Tool error types.
//!
//! A `ToolError` never terminates a run. The agent loop renders it with
//! [`ToolError::observation`] and feeds the text back to the model so it can
//! correct itself within its step budget.

use std::fmt;
use std::time::Duration;

/// Errors that can occur while dispatching or executing a tool.
///
/// The kind is boxed to keep `Result<String, ToolError>` small.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolError {
    kind: Box<ToolErrorKind>,
}

/// Specific tool error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolErrorKind {
    /// The model asked for a tool that is not registered
    NotFound {
        /// The requested name
        tool_name: String,
        /// Every registered tool name, in registration order
        available: Vec<String>,
        /// A registered name close to the requested one
        suggestion: Option<String>,
    },
    /// The tool ran and failed
    ExecutionFailed {
        /// The name of the tool
        tool_name: String,
        /// Reason for failure
        reason: String,
    },
    /// The arguments did not match the tool's schema
    ValidationFailed {
        /// The name of the tool
        tool_name: String,
        /// What was invalid
        reason: String,
    },
    /// Tool execution timed out
    Timeout {
        /// The name of the tool
        tool_name: String,
        /// The timeout duration that was exceeded
        duration: Duration,
    },
    /// A delegated sub-agent run ended without an answer
    DelegationFailed {
        /// The sub-agent that failed
        agent_name: String,
        /// Why it failed
        reason: String,
    },
}

impl ToolError {
    /// Creates a new ToolError with the given kind.
    #[must_use]
    pub fn new(kind: ToolErrorKind) -> Self {
        Self {
            kind: Box::new(kind),
        }
    }

    /// Returns a reference to the error kind.
    #[must_use]
    pub fn kind(&self) -> &ToolErrorKind {
        &self.kind
    }

    /// Creates a not found error, suggesting the closest registered name.
    #[must_use]
    pub fn not_found(tool_name: impl Into<String>, available: Vec<String>) -> Self {
        let tool_name = tool_name.into();
        let suggestion = closest_name(&tool_name, &available);
        Self::new(ToolErrorKind::NotFound {
            tool_name,
            available,
            suggestion,
        })
    }

    /// Creates an execution failed error.
    #[must_use]
    pub fn execution_failed(tool_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::ExecutionFailed {
            tool_name: tool_name.into(),
            reason: reason.into(),
        })
    }

    /// Creates a validation failed error.
    #[must_use]
    pub fn validation_failed(tool_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::ValidationFailed {
            tool_name: tool_name.into(),
            reason: reason.into(),
        })
    }

    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(tool_name: impl Into<String>, duration: Duration) -> Self {
        Self::new(ToolErrorKind::Timeout {
            tool_name: tool_name.into(),
            duration,
        })
    }

    /// Creates a delegation failed error.
    #[must_use]
    pub fn delegation_failed(agent_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::DelegationFailed {
            agent_name: agent_name.into(),
            reason: reason.into(),
        })
    }

    /// Returns the name of the tool the error is about.
    #[must_use]
    pub fn tool_name(&self) -> String {
        match self.kind.as_ref() {
            ToolErrorKind::NotFound { tool_name, .. }
            | ToolErrorKind::ExecutionFailed { tool_name, .. }
            | ToolErrorKind::ValidationFailed { tool_name, .. }
            | ToolErrorKind::Timeout { tool_name, .. } => tool_name.clone(),
            ToolErrorKind::DelegationFailed { agent_name, .. } => {
                crate::agent::delegate_tool_name(agent_name)
            }
        }
    }

    /// Returns true if this error indicates the tool was not found.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(*self.kind, ToolErrorKind::NotFound { .. })
    }

    /// Returns true if a delegated sub-agent failed.
    #[must_use]
    pub fn is_delegation_failure(&self) -> bool {
        matches!(*self.kind, ToolErrorKind::DelegationFailed { .. })
    }

    /// Returns true if this error is a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(*self.kind, ToolErrorKind::Timeout { .. })
    }

    /// Renders the error as the observation text shown to the model.
    ///
    /// Everything except an unknown tool starts with
    /// `Error executing <tool>:`. An unknown tool lists each registered name
    /// exactly once, marking the closest one.
    #[must_use]
    pub fn observation(&self) -> String {
        match self.kind.as_ref() {
            ToolErrorKind::NotFound {
                tool_name,
                available,
                suggestion,
            } => {
                let listed: Vec<String> = available
                    .iter()
                    .map(|name| {
                        if suggestion.as_ref() == Some(name) {
                            format!("{name} (closest match)")
                        } else {
                            name.clone()
                        }
                    })
                    .collect();
                format!(
                    "Unknown tool '{}'. Available tools: {}.",
                    tool_name,
                    listed.join(", ")
                )
            }
            ToolErrorKind::ExecutionFailed { tool_name, reason } => {
                format!("Error executing {}: {}", tool_name, reason)
            }
            ToolErrorKind::ValidationFailed { tool_name, reason } => {
                format!("Error executing {}: invalid arguments: {}", tool_name, reason)
            }
            ToolErrorKind::Timeout {
                tool_name,
                duration,
            } => {
                format!(
                    "Error executing {}: timed out after {:.1}s",
                    tool_name,
                    duration.as_secs_f64()
                )
            }
            ToolErrorKind::DelegationFailed { agent_name, reason } => {
                format!(
                    "Error executing {}: agent '{}' did not produce an answer: {}",
                    crate::agent::delegate_tool_name(agent_name),
                    agent_name,
                    reason
                )
            }
        }
    }
}

/// Picks the registered name most similar to `requested`, if any is close.
fn closest_name(requested: &str, available: &[String]) -> Option<String> {
    available
        .iter()
        .map(|name| (strsim::jaro_winkler(requested, name), name))
        .filter(|(score, _)| *score >= 0.85)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, name)| name.clone())
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind.as_ref() {
            ToolErrorKind::NotFound {
                tool_name,
                available,
                ..
            } => {
                write!(
                    f,
                    "tool '{}' not found; registered tools: {}",
                    tool_name,
                    available.join(", ")
                )
            }
            ToolErrorKind::ExecutionFailed { tool_name, reason } => {
                write!(f, "tool '{}' execution failed: {}", tool_name, reason)
            }
            ToolErrorKind::ValidationFailed { tool_name, reason } => {
                write!(
                    f,
                    "invalid arguments for tool '{}': {}; check the tool schema",
                    tool_name, reason
                )
            }
            ToolErrorKind::Timeout {
                tool_name,
                duration,
            } => {
                write!(
                    f,
                    "tool '{}' timed out after {:?}; consider raising its timeout",
                    tool_name, duration
                )
            }
            ToolErrorKind::DelegationFailed { agent_name, reason } => {
                write!(f, "delegation to agent '{}' failed: {}", agent_name, reason)
            }
        }
    }
}

impl std::error::Error for ToolError {}
