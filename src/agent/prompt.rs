//! System prompt rendering.

use crate::agent::config::{AgentConfig, AgentKind};
use crate::llm::FINAL_ANSWER_TOOL;
use std::fmt::Write;

/// Renders the system message that opens every run of an agent.
///
/// It names the agent, states its role, lists each tool with its signature
/// and explains how to finish.
#[must_use]
pub fn render_system_prompt(config: &AgentConfig) -> String {
    let mut prompt = format!("You are {}.", config.name);
    if !config.description.is_empty() {
        let _ = write!(prompt, " {}", config.description.trim());
    }
    prompt.push_str("\n\n");

    let delegates = config.registry.delegates();
    if !delegates.is_empty() {
        prompt.push_str(
            "You lead a team. Hand sub-tasks to your team members with the \
             delegate_to_* tools, give each one a complete, self-contained task, \
             and combine their answers.\n",
        );
    }
    match config.kind {
        AgentKind::ToolCalling => prompt.push_str(
            "Gather facts with your tools before answering; do not guess \
             information you could look up.\n",
        ),
        AgentKind::CodeExecuting => prompt.push_str(
            "Work out every number with your tools instead of computing it in \
             your head.\n",
        ),
    }

    if config.registry.is_empty() {
        prompt.push_str("\nYou have no tools.\n");
    } else {
        prompt.push_str("\nYou can use these tools:\n");
        for schema in config.registry.schemas() {
            let _ = writeln!(prompt, "- {}: {}", schema.signature(), schema.description);
        }
    }

    let _ = write!(
        prompt,
        "\nCall one tool per step and wait for its result. When you know the \
         answer, call {FINAL_ANSWER_TOOL}(answer) or reply with the answer as \
         plain text. You have at most {} steps.",
        config.max_steps
    );
    prompt
}
