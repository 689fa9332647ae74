//! Run identifier type using TypeID format.
//!
//! Format: `run_01h455vb4pex5vsknk084sn02q`. The UUIDv7 payload makes ids
//! sort by creation time, so a manager's run id sorts before the ids of
//! the sub-agent runs it delegates to.

use mti::prelude::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Identifies one invocation of [`Agent::run`](crate::agent::Agent::run).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunId(MagicTypeId);

/// Error returned when a string is not a valid run id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidRunId {
    /// TypeID parsing failed
    Parse(String),
    /// The TypeID carried a prefix other than "run"
    WrongPrefix {
        /// The expected prefix
        expected: &'static str,
        /// The actual prefix found
        actual: String,
    },
}

impl fmt::Display for InvalidRunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "invalid run ID: {e}"),
            Self::WrongPrefix { expected, actual } => {
                write!(f, "expected prefix '{expected}', got '{actual}'")
            }
        }
    }
}

impl std::error::Error for InvalidRunId {}

impl RunId {
    /// The TypeID prefix for run identifiers.
    pub const PREFIX: &'static str = "run";

    /// Creates a fresh, time-sortable run id.
    #[must_use]
    pub fn new() -> Self {
        Self(Self::PREFIX.create_type_id::<V7>())
    }

    /// Parses a run id, checking the prefix.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRunId::Parse` for malformed input and
    /// `InvalidRunId::WrongPrefix` for a TypeID of another kind.
    pub fn parse(s: &str) -> Result<Self, InvalidRunId> {
        let id = MagicTypeId::from_str(s).map_err(|e| InvalidRunId::Parse(e.to_string()))?;

        let prefix = id.prefix().as_str();
        if prefix != Self::PREFIX {
            return Err(InvalidRunId::WrongPrefix {
                expected: Self::PREFIX,
                actual: prefix.to_string(),
            });
        }

        Ok(Self(id))
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RunId {
    type Err = InvalidRunId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for RunId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.to_string().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RunId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_has_run_prefix() {
        assert!(RunId::new().to_string().starts_with("run_"));
    }

    #[test]
    fn parse_round_trips_display() {
        let id = RunId::new();
        let parsed = RunId::parse(&id.to_string()).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn parse_rejects_other_prefix() {
        let result = RunId::parse("agent_01h455vb4pex5vsknk084sn02q");
        assert!(matches!(
            result,
            Err(InvalidRunId::WrongPrefix {
                expected: "run",
                ..
            })
        ));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            RunId::parse("not-a-typeid"),
            Err(InvalidRunId::Parse(_))
        ));
    }

    #[test]
    fn ids_are_distinct() {
        assert_ne!(RunId::new(), RunId::new());
    }

    #[test]
    fn serde_uses_string_form() {
        let id = RunId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        let back: RunId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
