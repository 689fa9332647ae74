//! Identifier types.
//!
//! Every run, including each delegated sub-agent run, gets its own [`RunId`]
//! so trace chunks and log lines from nested runs can be told apart.

mod run_id;

pub use run_id::{InvalidRunId, RunId};
