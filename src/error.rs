//! Error types for agent construction and agent runs.
//!
//! Only two error types ever reach a caller of this crate:
//!
//! - [`ConfigurationError`] is raised while agents, registries and teams are
//!   being built, before any run begins.
//! - [`RunError`] is the terminal failure of a single run (step budget
//!   exhausted or cancelled). It always travels inside a
//!   [`RunResult`](crate::agent::RunResult) together with the trajectory.
//!
//! Everything that goes wrong *during* a run (unknown tools, tool failures,
//! unparseable model output, failed delegations) is converted into
//! observation text; see [`ToolError`](crate::tools::ToolError).
//!
//! Each error type implements Display, Debug, Clone, PartialEq, Eq and
//! std::error::Error without an error-derive crate.

use std::fmt;

// =============================================================================
// Configuration Errors
// =============================================================================

/// A malformed agent, registry or team definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationError {
    /// The specific error that occurred
    pub kind: ConfigurationErrorKind,
}

/// Specific configuration error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationErrorKind {
    /// Two tools in one registry share a name
    DuplicateToolName {
        /// The duplicated tool name
        tool_name: String,
    },
    /// A tool took a name the inference protocol reserves
    ReservedToolName {
        /// The reserved name
        tool_name: String,
    },
    /// Two managed agents share a name
    DuplicateAgentName {
        /// The duplicated agent name
        agent_name: String,
    },
    /// max_steps was zero
    InvalidMaxSteps {
        /// The agent whose budget was invalid
        agent_name: String,
        /// The rejected value
        value: usize,
    },
    /// An agent or tool name was empty or contained invalid characters
    InvalidName {
        /// What kind of thing was being named ("agent", "tool")
        subject: String,
        /// The rejected name
        name: String,
    },
    /// No API key could be resolved for the inference provider
    MissingCredentials {
        /// Where the key was expected to come from
        source: String,
    },
    /// A managed agent can itself delegate
    NestedDelegation {
        /// The managed agent that owns delegate tools
        agent_name: String,
    },
    /// A configuration referenced a tool that does not exist
    UnknownTool {
        /// The agent that requested the tool
        agent_name: String,
        /// The unknown tool name
        tool_name: String,
        /// Tool names that could have been used instead
        available: Vec<String>,
    },
    /// A configuration field had an invalid value
    InvalidField {
        /// The field that was invalid
        field: String,
        /// Why it was invalid
        reason: String,
    },
    /// A configuration file could not be read or parsed
    File {
        /// The file path, or "<inline>" for string sources
        path: String,
        /// Why loading failed
        reason: String,
    },
}

impl ConfigurationError {
    /// Creates a new ConfigurationError with the given kind.
    #[must_use]
    pub fn new(kind: ConfigurationErrorKind) -> Self {
        Self { kind }
    }

    /// Creates a duplicate tool name error.
    #[must_use]
    pub fn duplicate_tool(tool_name: impl Into<String>) -> Self {
        Self::new(ConfigurationErrorKind::DuplicateToolName {
            tool_name: tool_name.into(),
        })
    }

    /// Creates a reserved tool name error.
    #[must_use]
    pub fn reserved_tool(tool_name: impl Into<String>) -> Self {
        Self::new(ConfigurationErrorKind::ReservedToolName {
            tool_name: tool_name.into(),
        })
    }

    /// Creates a duplicate agent name error.
    #[must_use]
    pub fn duplicate_agent(agent_name: impl Into<String>) -> Self {
        Self::new(ConfigurationErrorKind::DuplicateAgentName {
            agent_name: agent_name.into(),
        })
    }

    /// Creates an invalid max_steps error.
    #[must_use]
    pub fn invalid_max_steps(agent_name: impl Into<String>, value: usize) -> Self {
        Self::new(ConfigurationErrorKind::InvalidMaxSteps {
            agent_name: agent_name.into(),
            value,
        })
    }

    /// Creates an invalid name error.
    #[must_use]
    pub fn invalid_name(subject: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(ConfigurationErrorKind::InvalidName {
            subject: subject.into(),
            name: name.into(),
        })
    }

    /// Creates a missing credentials error.
    #[must_use]
    pub fn missing_credentials(source: impl Into<String>) -> Self {
        Self::new(ConfigurationErrorKind::MissingCredentials {
            source: source.into(),
        })
    }

    /// Creates a nested delegation error.
    #[must_use]
    pub fn nested_delegation(agent_name: impl Into<String>) -> Self {
        Self::new(ConfigurationErrorKind::NestedDelegation {
            agent_name: agent_name.into(),
        })
    }

    /// Creates an unknown tool error.
    #[must_use]
    pub fn unknown_tool(
        agent_name: impl Into<String>,
        tool_name: impl Into<String>,
        available: Vec<String>,
    ) -> Self {
        Self::new(ConfigurationErrorKind::UnknownTool {
            agent_name: agent_name.into(),
            tool_name: tool_name.into(),
            available,
        })
    }

    /// Creates an invalid field error.
    #[must_use]
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ConfigurationErrorKind::InvalidField {
            field: field.into(),
            reason: reason.into(),
        })
    }

    /// Creates a configuration file error.
    #[must_use]
    pub fn file(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ConfigurationErrorKind::File {
            path: path.into(),
            reason: reason.into(),
        })
    }

    /// Returns true if this error is about a duplicated tool name.
    #[must_use]
    pub fn is_duplicate_tool(&self) -> bool {
        matches!(self.kind, ConfigurationErrorKind::DuplicateToolName { .. })
    }

    /// Returns true if a tool used a reserved name.
    #[must_use]
    pub fn is_reserved_tool(&self) -> bool {
        matches!(self.kind, ConfigurationErrorKind::ReservedToolName { .. })
    }

    /// Returns true if this error is about missing credentials.
    #[must_use]
    pub fn is_missing_credentials(&self) -> bool {
        matches!(self.kind, ConfigurationErrorKind::MissingCredentials { .. })
    }

    /// Returns true if this error rejects nested delegation.
    #[must_use]
    pub fn is_nested_delegation(&self) -> bool {
        matches!(self.kind, ConfigurationErrorKind::NestedDelegation { .. })
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ConfigurationErrorKind::DuplicateToolName { tool_name } => {
                write!(
                    f,
                    "tool '{}' is registered more than once; tool names must be unique within a registry",
                    tool_name
                )
            }
            ConfigurationErrorKind::ReservedToolName { tool_name } => {
                write!(
                    f,
                    "tool name '{}' is reserved for final answers; rename the tool",
                    tool_name
                )
            }
            ConfigurationErrorKind::DuplicateAgentName { agent_name } => {
                write!(
                    f,
                    "agent '{}' is defined more than once; agent names must be unique",
                    agent_name
                )
            }
            ConfigurationErrorKind::InvalidMaxSteps { agent_name, value } => {
                write!(
                    f,
                    "agent '{}' has max_steps = {}; the step budget must be at least 1",
                    agent_name, value
                )
            }
            ConfigurationErrorKind::InvalidName { subject, name } => {
                write!(
                    f,
                    "invalid {} name '{}'; use letters, digits, '_' or '-'",
                    subject, name
                )
            }
            ConfigurationErrorKind::MissingCredentials { source } => {
                write!(
                    f,
                    "no API key found in {}; set it or provide api_key in the configuration",
                    source
                )
            }
            ConfigurationErrorKind::NestedDelegation { agent_name } => {
                write!(
                    f,
                    "agent '{}' manages other agents and cannot itself be managed; \
                     delegation is limited to one level",
                    agent_name
                )
            }
            ConfigurationErrorKind::UnknownTool {
                agent_name,
                tool_name,
                available,
            } => {
                write!(
                    f,
                    "agent '{}' requests unknown tool '{}'; available tools: {}",
                    agent_name,
                    tool_name,
                    available.join(", ")
                )
            }
            ConfigurationErrorKind::InvalidField { field, reason } => {
                write!(f, "invalid configuration for '{}': {}", field, reason)
            }
            ConfigurationErrorKind::File { path, reason } => {
                write!(f, "failed to load configuration '{}': {}", path, reason)
            }
        }
    }
}

impl std::error::Error for ConfigurationError {}

// =============================================================================
// Run Errors
// =============================================================================

/// The terminal failure of one agent run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunError {
    /// The specific error that occurred
    pub kind: RunErrorKind,
}

/// Specific run error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunErrorKind {
    /// The step budget was used up without a final answer
    BudgetExhausted {
        /// The agent whose run was exhausted
        agent_name: String,
        /// The budget that was exhausted
        max_steps: usize,
    },
    /// The run was cancelled between steps
    Cancelled {
        /// The agent whose run was cancelled
        agent_name: String,
        /// Steps completed before cancellation
        completed_steps: usize,
    },
}

impl RunError {
    /// Creates a new RunError with the given kind.
    #[must_use]
    pub fn new(kind: RunErrorKind) -> Self {
        Self { kind }
    }

    /// Creates a budget exhausted error.
    #[must_use]
    pub fn budget_exhausted(agent_name: impl Into<String>, max_steps: usize) -> Self {
        Self::new(RunErrorKind::BudgetExhausted {
            agent_name: agent_name.into(),
            max_steps,
        })
    }

    /// Creates a cancelled error.
    #[must_use]
    pub fn cancelled(agent_name: impl Into<String>, completed_steps: usize) -> Self {
        Self::new(RunErrorKind::Cancelled {
            agent_name: agent_name.into(),
            completed_steps,
        })
    }

    /// Returns true if the step budget was exhausted.
    #[must_use]
    pub fn is_budget_exhausted(&self) -> bool {
        matches!(self.kind, RunErrorKind::BudgetExhausted { .. })
    }

    /// Returns true if the run was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind, RunErrorKind::Cancelled { .. })
    }

    /// Returns true if re-running the same task could help.
    ///
    /// Budget exhaustion is final for the run that hit it.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        false
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            RunErrorKind::BudgetExhausted {
                agent_name,
                max_steps,
            } => {
                write!(
                    f,
                    "agent '{}' used its step budget of {} without producing a final answer",
                    agent_name, max_steps
                )
            }
            RunErrorKind::Cancelled {
                agent_name,
                completed_steps,
            } => {
                write!(
                    f,
                    "run of agent '{}' was cancelled after {} step(s)",
                    agent_name, completed_steps
                )
            }
        }
    }
}

impl std::error::Error for RunError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_tool_display_names_tool() {
        let error = ConfigurationError::duplicate_tool("visit_webpage");
        let message = error.to_string();
        assert!(message.contains("visit_webpage"));
        assert!(message.contains("unique"));
        assert!(error.is_duplicate_tool());
    }

    #[test]
    fn reserved_tool_display() {
        let error = ConfigurationError::reserved_tool("final_answer");
        assert!(error.is_reserved_tool());
        assert!(!error.is_duplicate_tool());
        assert!(error.to_string().contains("'final_answer' is reserved"));
    }

    #[test]
    fn invalid_max_steps_display() {
        let error = ConfigurationError::invalid_max_steps("calc_agent", 0);
        let message = error.to_string();
        assert!(message.contains("calc_agent"));
        assert!(message.contains("max_steps = 0"));
    }

    #[test]
    fn missing_credentials_display() {
        let error = ConfigurationError::missing_credentials("environment variable CEREBRAS_API_KEY");
        assert!(error.is_missing_credentials());
        assert!(error.to_string().contains("CEREBRAS_API_KEY"));
    }

    #[test]
    fn nested_delegation_display() {
        let error = ConfigurationError::nested_delegation("manager_agent");
        assert!(error.is_nested_delegation());
        assert!(error.to_string().contains("one level"));
    }

    #[test]
    fn unknown_tool_lists_alternatives() {
        let error = ConfigurationError::unknown_tool(
            "web_agent",
            "browse",
            vec!["web_search".to_string(), "visit_webpage".to_string()],
        );
        let message = error.to_string();
        assert!(message.contains("browse"));
        assert!(message.contains("web_search, visit_webpage"));
    }

    #[test]
    fn budget_exhausted_display() {
        let error = RunError::budget_exhausted("web_agent", 10);
        assert!(error.is_budget_exhausted());
        assert!(!error.is_cancelled());
        assert!(!error.is_retriable());

        let message = error.to_string();
        assert!(message.contains("web_agent"));
        assert!(message.contains("10"));
    }

    #[test]
    fn cancelled_display() {
        let error = RunError::cancelled("manager_agent", 2);
        assert!(error.is_cancelled());
        assert!(error.to_string().contains("after 2 step(s)"));
    }

    #[test]
    fn errors_are_std_errors() {
        fn assert_error<E: std::error::Error>(_: &E) {}
        assert_error(&ConfigurationError::duplicate_agent("a"));
        assert_error(&RunError::budget_exhausted("a", 1));
    }
}
