//! The inference endpoint abstraction.
//!
//! An endpoint is a stateless adapter: given the conversation so far and the
//! tools an agent declares, it answers with exactly one [`ModelResponse`].
//! Credentials, retries and rate limiting live behind this trait.

use crate::llm::error::LLMError;
use crate::messages::{Message, ToolArguments, ToolCallRequest};
use crate::tools::ToolSchema;
use async_trait::async_trait;
use serde_json::Value;

/// Name of the pseudo-tool a model calls to finish a run.
pub const FINAL_ANSWER_TOOL: &str = "final_answer";

/// Call id assigned to actions the model wrote as plain JSON text.
const TEXT_ACTION_ID: &str = "call_text_action";

/// The closed set of things a model can say in one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelResponse {
    /// The model is done and this is its answer
    FinalAnswer {
        /// The answer text
        text: String,
    },
    /// The model wants a tool invoked
    ToolCall {
        /// Text the model produced alongside the call
        reasoning: String,
        /// The requested call
        call: ToolCallRequest,
    },
    /// The reply was neither a usable answer nor a usable call
    Malformed {
        /// The raw reply, for the observation and the trace
        raw: String,
    },
}

impl ModelResponse {
    /// Creates a final answer.
    #[must_use]
    pub fn final_answer(text: impl Into<String>) -> Self {
        Self::FinalAnswer { text: text.into() }
    }

    /// Creates a tool call with a call id derived from the tool name.
    ///
    /// Non-object `arguments` become an empty argument map.
    #[must_use]
    pub fn tool_call(name: impl Into<String>, arguments: Value) -> Self {
        let name = name.into();
        Self::ToolCall {
            reasoning: String::new(),
            call: ToolCallRequest::from_json(format!("call_{name}"), name, arguments),
        }
    }

    /// Creates a malformed reply.
    #[must_use]
    pub fn malformed(raw: impl Into<String>) -> Self {
        Self::Malformed { raw: raw.into() }
    }

    /// Attaches reasoning text to a tool call; other variants are unchanged.
    #[must_use]
    pub fn with_reasoning(self, text: impl Into<String>) -> Self {
        match self {
            Self::ToolCall { call, .. } => Self::ToolCall {
                reasoning: text.into(),
                call,
            },
            other => other,
        }
    }

    /// Returns true if this is a final answer.
    #[must_use]
    pub fn is_final(&self) -> bool {
        matches!(self, Self::FinalAnswer { .. })
    }
}

/// An adapter to a language model.
///
/// Implementations must not keep per-conversation state: the same endpoint
/// is shared by concurrent runs and by a manager and its sub-agents.
#[async_trait]
pub trait InferenceEndpoint: Send + Sync + std::fmt::Debug {
    /// Asks the model for its next action.
    ///
    /// # Arguments
    ///
    /// * `conversation` - Every message of the run so far, in order
    /// * `tools` - The schemas of the tools the agent may call
    ///
    /// # Errors
    ///
    /// Returns an error when the model could not be reached or its response
    /// envelope could not be decoded. Unusable model *content* is reported
    /// as [`ModelResponse::Malformed`] instead.
    async fn complete(
        &self,
        conversation: &[Message],
        tools: &[ToolSchema],
    ) -> Result<ModelResponse, LLMError>;

    /// Returns the name of this provider for logging.
    fn provider_name(&self) -> &'static str;
}

/// Interprets free-form model text as an action.
///
/// A JSON object of the form `{"name": .., "arguments": {..}}`, optionally in
/// a code fence, is a tool call (or a final answer when the name is
/// `final_answer`). Text that starts like JSON but is not such an object is
/// malformed, as is an empty reply. Anything else is the final answer.
#[must_use]
pub fn parse_text_action(content: &str) -> ModelResponse {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return ModelResponse::malformed(content);
    }

    let body = strip_code_fence(trimmed);
    if !body.starts_with('{') {
        return ModelResponse::final_answer(trimmed);
    }

    let Ok(Value::Object(mut action)) = serde_json::from_str::<Value>(body) else {
        return ModelResponse::malformed(content);
    };
    let Some(Value::String(name)) = action.remove("name") else {
        return ModelResponse::malformed(content);
    };
    let arguments = match action.remove("arguments") {
        None | Some(Value::Null) => ToolArguments::new(),
        Some(Value::Object(map)) => map,
        Some(_) => return ModelResponse::malformed(content),
    };

    action_from_parts(String::new(), TEXT_ACTION_ID.to_string(), name, arguments)
}

/// Builds a response from a decoded call, routing `final_answer` calls.
pub(crate) fn action_from_parts(
    reasoning: String,
    id: String,
    name: String,
    mut arguments: ToolArguments,
) -> ModelResponse {
    if name == FINAL_ANSWER_TOOL {
        return match arguments.remove("answer") {
            Some(Value::String(text)) => ModelResponse::final_answer(text),
            Some(Value::Null) | None => ModelResponse::malformed(format!(
                "{FINAL_ANSWER_TOOL} called without an 'answer' argument"
            )),
            Some(other) => ModelResponse::final_answer(other.to_string()),
        };
    }

    ModelResponse::ToolCall {
        reasoning,
        call: ToolCallRequest::new(id, name, arguments),
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
