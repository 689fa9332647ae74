//! A deterministic inference endpoint for tests and offline demos.

use crate::llm::endpoint::{InferenceEndpoint, ModelResponse};
use crate::llm::error::LLMError;
use crate::messages::Message;
use crate::tools::ToolSchema;
use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

type Responder = dyn Fn(&[Message], &[ToolSchema]) -> Result<ModelResponse, LLMError> + Send + Sync;

/// An endpoint whose answer is a pure function of the conversation.
///
/// Because the response depends only on the messages it is given, a
/// scripted endpoint can be shared between concurrent runs and between a
/// manager and its sub-agents without the runs affecting each other.
pub struct ScriptedEndpoint {
    responder: Box<Responder>,
    calls: AtomicUsize,
}

impl ScriptedEndpoint {
    /// Replays `responses` by step number.
    ///
    /// The step of a conversation is the number of tool observations it
    /// holds plus one, so step 1 gets `responses[0]`. Steps past the end
    /// repeat the last response; an empty script is always malformed.
    #[must_use]
    pub fn sequence(responses: Vec<ModelResponse>) -> Self {
        Self::from_fn(move |conversation, _| {
            let step = current_step(conversation);
            let response = responses
                .get(step - 1)
                .or_else(|| responses.last())
                .cloned()
                .unwrap_or_else(|| ModelResponse::malformed(""));
            Ok(response)
        })
    }

    /// Returns the same response at every step.
    #[must_use]
    pub fn always(response: ModelResponse) -> Self {
        Self::sequence(vec![response])
    }

    /// Fails every step with the given error.
    #[must_use]
    pub fn failing(error: LLMError) -> Self {
        Self::from_fn(move |_, _| Err(error.clone()))
    }

    /// Uses an arbitrary function of the conversation and tool schemas.
    #[must_use]
    pub fn from_fn<F>(responder: F) -> Self
    where
        F: Fn(&[Message], &[ToolSchema]) -> Result<ModelResponse, LLMError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of completions served so far, across all runs.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// The 1-based step a conversation is at.
#[must_use]
pub fn current_step(conversation: &[Message]) -> usize {
    conversation.iter().filter(|m| m.is_observation()).count() + 1
}

impl fmt::Debug for ScriptedEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedEndpoint")
            .field("calls", &self.calls())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl InferenceEndpoint for ScriptedEndpoint {
    async fn complete(
        &self,
        conversation: &[Message],
        tools: &[ToolSchema],
    ) -> Result<ModelResponse, LLMError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.responder)(conversation, tools)
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn sequence_follows_observation_count() {
        let endpoint = ScriptedEndpoint::sequence(vec![
            ModelResponse::tool_call("calculate", json!({"expression": "1+1"})),
            ModelResponse::final_answer("2"),
        ]);

        let mut conversation = vec![Message::user("1+1")];
        let first = endpoint.complete(&conversation, &[]).await.unwrap();
        assert!(matches!(first, ModelResponse::ToolCall { .. }));

        conversation.push(Message::tool(Some("call_calculate".into()), "2"));
        let second = endpoint.complete(&conversation, &[]).await.unwrap();
        assert_eq!(second, ModelResponse::final_answer("2"));

        conversation.push(Message::tool(None, "again"));
        let repeated = endpoint.complete(&conversation, &[]).await.unwrap();
        assert_eq!(repeated, ModelResponse::final_answer("2"));

        assert_eq!(endpoint.calls(), 3);
    }

    #[tokio::test]
    async fn empty_sequence_is_malformed() {
        let endpoint = ScriptedEndpoint::sequence(Vec::new());
        let response = endpoint.complete(&[], &[]).await.unwrap();
        assert!(matches!(response, ModelResponse::Malformed { .. }));
    }

    #[tokio::test]
    async fn failing_returns_error() {
        let endpoint = ScriptedEndpoint::failing(LLMError::network("down"));
        assert!(endpoint.complete(&[], &[]).await.is_err());
    }

    #[tokio::test]
    async fn from_fn_sees_tools() {
        let endpoint = ScriptedEndpoint::from_fn(|_, tools| {
            Ok(ModelResponse::final_answer(tools.len().to_string()))
        });
        let tools = vec![ToolSchema::new("a", "x"), ToolSchema::new("b", "y")];
        let response = endpoint.complete(&[], &tools).await.unwrap();
        assert_eq!(response, ModelResponse::final_answer("2"));
    }

    #[test]
    fn debug_shows_call_count() {
        let endpoint = ScriptedEndpoint::always(ModelResponse::final_answer("x"));
        assert!(format!("{endpoint:?}").contains("calls: 0"));
    }
}
