//! Step records, trajectories and run results.

use crate::agent::state::AgentState;
use crate::error::RunError;
use crate::messages::ToolCallRequest;
use crate::types::RunId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which recoverable failure a step ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepErrorKind {
    /// The tool ran and failed, or its arguments were invalid
    ToolExecution,
    /// The model asked for a tool that is not registered
    UnknownTool,
    /// The model reply was neither an answer nor a call
    Parse,
    /// The inference endpoint could not be reached
    Inference,
    /// A delegated sub-agent ended without an answer
    Delegation,
}

impl fmt::Display for StepErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ToolExecution => write!(f, "tool execution error"),
            Self::UnknownTool => write!(f, "unknown tool"),
            Self::Parse => write!(f, "parse error"),
            Self::Inference => write!(f, "inference error"),
            Self::Delegation => write!(f, "delegation failure"),
        }
    }
}

/// What a step produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepOutcome {
    /// The run's answer
    FinalAnswer {
        /// The answer text
        text: String,
    },
    /// The text a tool returned
    Observation {
        /// The tool output
        text: String,
    },
    /// A failure that was fed back to the model
    Error {
        /// The failure category
        kind: StepErrorKind,
        /// The observation text the model saw
        message: String,
    },
}

impl StepOutcome {
    /// The text this step contributed to the conversation or the answer.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::FinalAnswer { text } | Self::Observation { text } => text,
            Self::Error { message, .. } => message,
        }
    }

    /// Returns true for an error outcome.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// One think/act/observe iteration. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// 1-based position in the trajectory
    pub index: usize,
    /// The model's announcement of what it is doing
    pub reasoning: String,
    /// The call the model issued, if any
    pub tool_call: Option<ToolCallRequest>,
    /// The result of the step
    pub outcome: StepOutcome,
    /// When the step finished
    pub timestamp: DateTime<Utc>,
}

/// The ordered steps of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trajectory {
    steps: Vec<StepRecord>,
}

impl Trajectory {
    /// Creates an empty trajectory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step, numbering it after the last one. Returns the index.
    pub(crate) fn record(
        &mut self,
        reasoning: String,
        tool_call: Option<ToolCallRequest>,
        outcome: StepOutcome,
    ) -> usize {
        let index = self.steps.len() + 1;
        self.steps.push(StepRecord {
            index,
            reasoning,
            tool_call,
            outcome,
            timestamp: Utc::now(),
        });
        index
    }

    /// All steps in order.
    #[must_use]
    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if no step was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The most recent step.
    #[must_use]
    pub fn last(&self) -> Option<&StepRecord> {
        self.steps.last()
    }

    /// Iterates over the steps.
    pub fn iter(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps.iter()
    }

    /// Steps that ended in a recoverable error.
    pub fn errors(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps.iter().filter(|s| s.outcome.is_error())
    }
}

/// The result of one agent run. Owned by the caller.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Identifier of the run
    pub run_id: RunId,
    /// Name of the agent that ran
    pub agent: String,
    /// The final answer, or why there is none
    pub outcome: Result<String, RunError>,
    /// Every step the run took
    pub trajectory: Trajectory,
    /// The state the run ended in
    pub state: AgentState,
}

impl RunResult {
    /// The final answer, if the run produced one.
    #[must_use]
    pub fn answer(&self) -> Option<&str> {
        self.outcome.as_deref().ok()
    }

    /// The failure, if the run produced no answer.
    #[must_use]
    pub fn error(&self) -> Option<&RunError> {
        self.outcome.as_ref().err()
    }

    /// Returns true if the run produced an answer.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_numbers_steps_from_one() {
        let mut trajectory = Trajectory::new();
        let first = trajectory.record(
            "looking it up".into(),
            Some(ToolCallRequest::from_json("c1", "web_search", json!({"query": "x"}))),
            StepOutcome::Observation { text: "results".into() },
        );
        let second = trajectory.record(
            String::new(),
            None,
            StepOutcome::FinalAnswer { text: "done".into() },
        );

        assert_eq!((first, second), (1, 2));
        let indices: Vec<usize> = trajectory.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![1, 2]);
        assert_eq!(trajectory.last().map(|s| s.outcome.text()), Some("done"));
    }

    #[test]
    fn errors_filters_error_steps() {
        let mut trajectory = Trajectory::new();
        trajectory.record(
            String::new(),
            None,
            StepOutcome::Error {
                kind: StepErrorKind::Parse,
                message: "could not parse".into(),
            },
        );
        trajectory.record(String::new(), None, StepOutcome::Observation { text: "ok".into() });

        let errors: Vec<_> = trajectory.errors().collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].index, 1);
    }

    #[test]
    fn outcome_serializes_with_type_tag() {
        let outcome = StepOutcome::Error {
            kind: StepErrorKind::UnknownTool,
            message: "Unknown tool 'x'".into(),
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["kind"], "unknown_tool");
    }

    #[test]
    fn run_result_accessors() {
        let result = RunResult {
            run_id: RunId::new(),
            agent: "calc_agent".into(),
            outcome: Err(RunError::budget_exhausted("calc_agent", 3)),
            trajectory: Trajectory::new(),
            state: AgentState::Terminated(crate::agent::Termination::Exhausted),
        };
        assert!(!result.is_success());
        assert!(result.answer().is_none());
        assert!(result.error().is_some_and(RunError::is_budget_exhausted));
    }
}
