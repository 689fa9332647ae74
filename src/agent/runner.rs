//! The think/act/observe loop.
//!
//! [`Agent`] is immutable after construction. Every call to
//! [`Agent::run_with`] builds its own conversation, trajectory and state, so
//! one agent can serve any number of concurrent runs.

use crate::agent::config::AgentConfig;
use crate::agent::prompt::render_system_prompt;
use crate::agent::state::{AgentState, Termination};
use crate::agent::trajectory::{RunResult, StepErrorKind, StepOutcome, Trajectory};
use crate::error::{ConfigurationError, RunError};
use crate::llm::ModelResponse;
use crate::messages::{Message, ToolCallRequest};
use crate::tools::{ToolContext, ToolError, ToolErrorKind};
use crate::trace::{ChunkKind, ExecutionTrace};
use crate::types::RunId;
use tokio_util::sync::CancellationToken;

/// Longest slice of an unparseable reply quoted back to the model.
const MALFORMED_PREVIEW_CHARS: usize = 500;

/// Per-run collaborators: where progress goes and how to stop.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    /// Receives every chunk the run emits
    pub trace: ExecutionTrace,
    /// Checked between steps
    pub cancel: CancellationToken,
}

impl RunContext {
    /// A context with a disabled trace and a fresh token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the trace.
    #[must_use]
    pub fn with_trace(mut self, trace: ExecutionTrace) -> Self {
        self.trace = trace;
        self
    }

    /// Sets the cancellation token.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn tool_context(&self) -> ToolContext {
        ToolContext {
            trace: self.trace.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

/// A bounded think/act/observe loop over a model and a fixed tool set.
#[derive(Debug)]
pub struct Agent {
    config: AgentConfig,
    system_prompt: String,
}

impl Agent {
    /// Validates the configuration and builds the agent.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` when the name is not a valid identifier
    /// or the step budget is zero.
    pub fn new(config: AgentConfig) -> Result<Self, ConfigurationError> {
        if !is_valid_agent_name(&config.name) {
            tracing::error!(agent = %config.name, "invalid agent name rejected");
            return Err(ConfigurationError::invalid_name("agent", &config.name));
        }
        if config.max_steps == 0 {
            tracing::error!(agent = %config.name, "zero step budget rejected");
            return Err(ConfigurationError::invalid_max_steps(&config.name, 0));
        }

        let system_prompt = render_system_prompt(&config);
        tracing::debug!(
            agent = %config.name,
            kind = %config.kind,
            tools = config.registry.len(),
            max_steps = config.max_steps,
            provider = config.endpoint.provider_name(),
            "Agent configured"
        );
        Ok(Self {
            config,
            system_prompt,
        })
    }

    /// The agent's configuration.
    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// The agent's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// The agent's description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.config.description
    }

    /// The system message every run starts with.
    #[must_use]
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Runs a task with no trace consumer and no way to cancel.
    pub async fn run(&self, task: &str) -> RunResult {
        self.run_with(task, &RunContext::default()).await
    }

    /// Runs a task until a final answer, budget exhaustion or cancellation.
    ///
    /// Failures inside the run never escape: tool errors, unknown tools,
    /// unparseable replies and endpoint failures become observations the
    /// model sees on its next step. The result always carries the full
    /// trajectory.
    pub async fn run_with(&self, task: &str, ctx: &RunContext) -> RunResult {
        let run = Run {
            agent: self,
            ctx,
            run_id: RunId::new(),
            conversation: Vec::with_capacity(2 + 2 * self.config.max_steps),
            trajectory: Trajectory::new(),
            state: AgentState::Ready,
        };
        run.execute(task).await
    }
}

/// Agent names become tool names (`delegate_to_<name>`), so they share the
/// tool-name alphabet.
fn is_valid_agent_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// State owned by exactly one run.
struct Run<'a> {
    agent: &'a Agent,
    ctx: &'a RunContext,
    run_id: RunId,
    conversation: Vec<Message>,
    trajectory: Trajectory,
    state: AgentState,
}

impl Run<'_> {
    #[tracing::instrument(skip_all, fields(agent = %self.agent.config.name, run_id = %self.run_id))]
    async fn execute(mut self, task: &str) -> RunResult {
        let agent = self.agent;
        let config = &agent.config;
        let tools = config.registry.schemas();

        tracing::info!(task_len = task.len(), max_steps = config.max_steps, "Run started");
        self.emit(0, ChunkKind::Reasoning, format!("{} started: {}", config.name, task));

        self.conversation.push(Message::system(agent.system_prompt.clone()));
        self.conversation.push(Message::user(task));

        for step in 1..=config.max_steps {
            if self.ctx.cancel.is_cancelled() {
                return self.cancelled();
            }

            self.transition(AgentState::Thinking);
            let response = match config.endpoint.complete(&self.conversation, &tools).await {
                Ok(response) => response,
                Err(error) => {
                    tracing::warn!(step, error = %error, "inference failed, recording as observation");
                    self.transition(AgentState::Observing);
                    let message = format!("Error querying the model: {error}");
                    self.emit(step, ChunkKind::Error, &message);
                    self.conversation.push(Message::tool(None, &message));
                    self.trajectory.record(
                        String::new(),
                        None,
                        StepOutcome::Error {
                            kind: StepErrorKind::Inference,
                            message,
                        },
                    );
                    continue;
                }
            };

            match response {
                ModelResponse::FinalAnswer { text } => return self.answer(step, text),
                ModelResponse::ToolCall { reasoning, call } => {
                    self.act(step, reasoning, call).await;
                }
                ModelResponse::Malformed { raw } => self.reject(step, raw),
            }
        }

        self.exhausted()
    }

    fn answer(mut self, step: usize, text: String) -> RunResult {
        self.transition(AgentState::Answering);
        self.emit(step, ChunkKind::Final, &text);
        self.trajectory.record(
            String::new(),
            None,
            StepOutcome::FinalAnswer { text: text.clone() },
        );
        self.transition(AgentState::Terminated(Termination::Success));
        tracing::info!(steps = step, answer_len = text.len(), "Run produced a final answer");
        self.finish(Ok(text))
    }

    async fn act(&mut self, step: usize, reasoning: String, call: ToolCallRequest) {
        self.transition(AgentState::Acting);
        let announcement = if reasoning.trim().is_empty() {
            format!(
                "Calling tool '{}' with arguments {}",
                call.name,
                serde_json::Value::Object(call.arguments.clone())
            )
        } else {
            reasoning.trim().to_string()
        };
        self.emit(step, ChunkKind::Reasoning, &announcement);
        tracing::debug!(step, tool_name = %call.name, "Executing tool call");

        self.conversation
            .push(Message::assistant_with_tool_call(reasoning, call.clone()));
        let result = self
            .agent
            .config
            .registry
            .execute(&call, &self.ctx.tool_context())
            .await;

        self.transition(AgentState::Observing);
        let outcome = match result {
            Ok(output) => {
                self.emit(step, ChunkKind::ToolOutput, &output);
                StepOutcome::Observation { text: output }
            }
            Err(error) => {
                tracing::warn!(step, tool_name = %call.name, error = %error, "Tool call failed");
                let message = error.observation();
                self.emit(step, ChunkKind::Error, &message);
                StepOutcome::Error {
                    kind: step_error_kind(&error),
                    message,
                }
            }
        };

        self.conversation
            .push(Message::tool(Some(call.id.clone()), outcome.text()));
        self.trajectory.record(announcement, Some(call), outcome);
    }

    fn reject(&mut self, step: usize, raw: String) {
        self.transition(AgentState::Observing);
        tracing::warn!(step, raw_len = raw.len(), "Model reply could not be parsed");
        let message = format!(
            "Could not parse model output as a tool call or a final answer: '{}'. \
             Call exactly one tool, or call final_answer(answer).",
            preview(&raw, MALFORMED_PREVIEW_CHARS)
        );
        self.emit(step, ChunkKind::Error, &message);
        self.conversation.push(Message::assistant(raw.clone()));
        self.conversation.push(Message::tool(None, &message));
        self.trajectory.record(
            raw,
            None,
            StepOutcome::Error {
                kind: StepErrorKind::Parse,
                message,
            },
        );
    }

    fn exhausted(mut self) -> RunResult {
        self.transition(AgentState::Terminated(Termination::Exhausted));
        let error = RunError::budget_exhausted(&self.agent.config.name, self.agent.config.max_steps);
        tracing::warn!(steps = self.trajectory.len(), "Run exhausted its step budget");
        self.emit(0, ChunkKind::Error, error.to_string());
        self.finish(Err(error))
    }

    fn cancelled(mut self) -> RunResult {
        self.transition(AgentState::Terminated(Termination::Cancelled));
        let error = RunError::cancelled(&self.agent.config.name, self.trajectory.len());
        tracing::info!(steps = self.trajectory.len(), "Run cancelled");
        self.emit(0, ChunkKind::Error, error.to_string());
        self.finish(Err(error))
    }

    fn finish(self, outcome: Result<String, RunError>) -> RunResult {
        RunResult {
            run_id: self.run_id,
            agent: self.agent.config.name.clone(),
            outcome,
            trajectory: self.trajectory,
            state: self.state,
        }
    }

    fn transition(&mut self, next: AgentState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        tracing::trace!(from = %self.state, to = %next, "state transition");
        self.state = next;
    }

    fn emit(&self, step: usize, kind: ChunkKind, text: impl Into<String>) {
        self.ctx
            .trace
            .emit(&self.run_id, &self.agent.config.name, step, kind, text);
    }
}

fn step_error_kind(error: &ToolError) -> StepErrorKind {
    match error.kind() {
        ToolErrorKind::NotFound { .. } => StepErrorKind::UnknownTool,
        ToolErrorKind::DelegationFailed { .. } => StepErrorKind::Delegation,
        ToolErrorKind::ExecutionFailed { .. }
        | ToolErrorKind::ValidationFailed { .. }
        | ToolErrorKind::Timeout { .. } => StepErrorKind::ToolExecution,
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
