//! Agent state enumeration.
//!
//! One run moves through
//! `Ready → Thinking → (Acting | Answering) → Observing → Thinking | Terminated`.
//! The state lives in the run, not in the agent, so concurrent runs of one
//! agent each have their own.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// A final answer was produced
    Success,
    /// The step budget ran out
    Exhausted,
    /// The run was cancelled between steps
    Cancelled,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Exhausted => write!(f, "exhausted"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// The current state of a run in its think/act/observe loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    /// The run has not started
    #[default]
    Ready,
    /// Waiting on the inference endpoint
    Thinking,
    /// Executing a tool call
    Acting,
    /// Recording a final answer
    Answering,
    /// Feeding an observation back into the conversation
    Observing,
    /// The run is over
    Terminated(Termination),
}

impl AgentState {
    /// Returns true if the loop may move from `self` to `next`.
    #[must_use]
    pub fn can_transition_to(&self, next: AgentState) -> bool {
        use AgentState::*;
        match (self, next) {
            (Ready, Thinking) => true,
            (Thinking, Acting | Answering | Observing) => true,
            (Acting, Observing) => true,
            (Answering, Terminated(Termination::Success)) => true,
            (Observing, Thinking) => true,
            // Budget and cancellation are checked between steps.
            (Ready | Observing, Terminated(Termination::Exhausted | Termination::Cancelled)) => {
                true
            }
            _ => false,
        }
    }

    /// Returns true if the run is actively processing.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Thinking | Self::Acting | Self::Answering | Self::Observing
        )
    }

    /// Returns true if the run is over.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminated(_))
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => write!(f, "ready"),
            Self::Thinking => write!(f, "thinking"),
            Self::Acting => write!(f, "acting"),
            Self::Answering => write!(f, "answering"),
            Self::Observing => write!(f, "observing"),
            Self::Terminated(how) => write!(f, "terminated({how})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_ready() {
        assert_eq!(AgentState::default(), AgentState::Ready);
    }

    #[test]
    fn tool_step_cycle_is_allowed() {
        let cycle = [
            AgentState::Ready,
            AgentState::Thinking,
            AgentState::Acting,
            AgentState::Observing,
            AgentState::Thinking,
            AgentState::Answering,
            AgentState::Terminated(Termination::Success),
        ];
        for pair in cycle.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn malformed_reply_goes_straight_to_observing() {
        assert!(AgentState::Thinking.can_transition_to(AgentState::Observing));
    }

    #[test]
    fn answering_cannot_loop_back() {
        assert!(!AgentState::Answering.can_transition_to(AgentState::Thinking));
        assert!(!AgentState::Thinking.can_transition_to(AgentState::Terminated(Termination::Success)));
        assert!(!AgentState::Terminated(Termination::Success).can_transition_to(AgentState::Thinking));
    }

    #[test]
    fn exhaustion_only_between_steps() {
        let exhausted = AgentState::Terminated(Termination::Exhausted);
        assert!(AgentState::Observing.can_transition_to(exhausted));
        assert!(!AgentState::Acting.can_transition_to(exhausted));
    }

    #[test]
    fn activity_predicates() {
        assert!(!AgentState::Ready.is_active());
        assert!(AgentState::Acting.is_active());
        assert!(AgentState::Terminated(Termination::Cancelled).is_terminal());
        assert!(!AgentState::Observing.is_terminal());
    }

    #[test]
    fn display_format() {
        assert_eq!(AgentState::Thinking.to_string(), "thinking");
        assert_eq!(
            AgentState::Terminated(Termination::Exhausted).to_string(),
            "terminated(exhausted)"
        );
    }
}
