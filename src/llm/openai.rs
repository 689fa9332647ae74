//! OpenAI-compatible chat completions endpoint.
//!
//! Works against Cerebras (the default), OpenAI, Ollama, vLLM and any other
//! server speaking the `/chat/completions` protocol with function calling.
//! Besides the agent's tools, every request advertises a `final_answer`
//! function so the model has an explicit way to finish.

use crate::llm::config::{ProviderConfig, RetryPolicy};
use crate::llm::endpoint::{
    action_from_parts, parse_text_action, InferenceEndpoint, ModelResponse, FINAL_ANSWER_TOOL,
};
use crate::llm::error::LLMError;
use crate::messages::{Message, MessageRole};
use crate::tools::{ParamType, ToolParameter, ToolSchema};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Endpoint for OpenAI-compatible APIs.
#[derive(Debug, Clone)]
pub struct OpenAIEndpoint {
    /// HTTP client
    client: Client,
    /// Base URL for the API
    base_url: String,
    /// API key (optional for local providers)
    api_key: Option<String>,
    /// Model name
    model: String,
    /// Maximum tokens to generate
    max_tokens: u32,
    /// Request timeout, reported in timeout errors
    timeout: Duration,
    /// Retries for transient failures
    retry: RetryPolicy,
}

/// Request body for the chat completions API.
#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    tools: Vec<OpenAITool>,
    stream: bool,
}

/// A message in OpenAI format.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAIToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

/// A tool definition in OpenAI format.
#[derive(Debug, Clone, Serialize)]
struct OpenAITool {
    #[serde(rename = "type")]
    tool_type: String,
    function: OpenAIFunction,
}

/// A function definition in OpenAI format.
#[derive(Debug, Clone, Serialize)]
struct OpenAIFunction {
    name: String,
    description: String,
    parameters: Value,
}

/// A tool call in OpenAI format.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    call_type: String,
    function: OpenAIFunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

/// A function call in OpenAI format. `arguments` is a JSON-encoded string.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIFunctionCall {
    name: String,
    arguments: String,
}

/// Non-streaming response from the API.
#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

/// A choice in the response.
#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionChoice {
    message: OpenAIMessage,
}

/// Error response from the API.
#[derive(Debug, Clone, Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIErrorDetail,
}

/// Error detail from the API.
#[derive(Debug, Clone, Deserialize)]
struct OpenAIErrorDetail {
    #[serde(rename = "type")]
    error_type: Option<String>,
    message: String,
}

impl OpenAIEndpoint {
    /// Creates a new endpoint from a provider configuration.
    ///
    /// # Errors
    ///
    /// Returns `LLMError::invalid_config` for an unusable configuration and
    /// `LLMError::network` if the HTTP client cannot be created.
    pub fn new(config: &ProviderConfig) -> Result<Self, LLMError> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LLMError::network(format!("failed to create HTTP client: {}", e)))?;

        let api_key = if config.api_key.is_empty() {
            None
        } else {
            Some(config.api_key.clone())
        };

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            timeout: config.timeout,
            retry: config.retry,
        })
    }

    /// Returns the model this endpoint talks to.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the chat completions endpoint URL.
    fn chat_completions_endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Converts internal messages to OpenAI API format.
    ///
    /// Observations that do not answer a real tool call are sent as user
    /// messages, since the API rejects orphaned `tool` messages.
    fn convert_messages(&self, messages: &[Message]) -> Vec<OpenAIMessage> {
        messages
            .iter()
            .map(|msg| match msg.role {
                MessageRole::System => OpenAIMessage {
                    role: "system".to_string(),
                    content: Some(msg.content.clone()),
                    tool_calls: None,
                    tool_call_id: None,
                },
                MessageRole::User => OpenAIMessage {
                    role: "user".to_string(),
                    content: Some(msg.content.clone()),
                    tool_calls: None,
                    tool_call_id: None,
                },
                MessageRole::Assistant => {
                    let tool_calls = msg.tool_calls.as_ref().map(|calls| {
                        calls
                            .iter()
                            .map(|call| OpenAIToolCall {
                                id: call.id.clone(),
                                call_type: function_type(),
                                function: OpenAIFunctionCall {
                                    name: call.name.clone(),
                                    arguments: Value::Object(call.arguments.clone()).to_string(),
                                },
                            })
                            .collect()
                    });

                    OpenAIMessage {
                        role: "assistant".to_string(),
                        content: if msg.content.is_empty() {
                            None
                        } else {
                            Some(msg.content.clone())
                        },
                        tool_calls,
                        tool_call_id: None,
                    }
                }
                MessageRole::Tool => match &msg.tool_call_id {
                    Some(id) => OpenAIMessage {
                        role: "tool".to_string(),
                        content: Some(msg.content.clone()),
                        tool_calls: None,
                        tool_call_id: Some(id.clone()),
                    },
                    None => OpenAIMessage {
                        role: "user".to_string(),
                        content: Some(format!("Observation: {}", msg.content)),
                        tool_calls: None,
                        tool_call_id: None,
                    },
                },
            })
            .collect()
    }

    /// Converts tool schemas to OpenAI API format, appending `final_answer`.
    fn convert_tools(&self, tools: &[ToolSchema]) -> Vec<OpenAITool> {
        let final_answer = final_answer_schema();
        tools
            .iter()
            .chain(std::iter::once(&final_answer))
            .map(|schema| OpenAITool {
                tool_type: "function".to_string(),
                function: OpenAIFunction {
                    name: schema.name.clone(),
                    description: schema.description.clone(),
                    parameters: schema.to_json_schema(),
                },
            })
            .collect()
    }

    /// Builds the request with optional authorization header.
    fn build_request(&self, request_body: &ChatCompletionRequest) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .post(self.chat_completions_endpoint())
            .header("content-type", "application/json")
            .json(request_body);

        if let Some(ref api_key) = self.api_key {
            request = request.header("Authorization", format!("Bearer {}", api_key));
        }

        request
    }

    /// Sends one request and interprets the reply.
    async fn attempt(&self, request_body: &ChatCompletionRequest) -> Result<ModelResponse, LLMError> {
        let response = self
            .build_request(request_body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LLMError::timeout(self.timeout)
                } else {
                    LLMError::network(format!("request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            return Err(self.parse_error_response(response).await);
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LLMError::parse_error(format!("failed to parse response: {}", e)))?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LLMError::parse_error("response contained no choices"))?;

        Ok(self.interpret(choice.message))
    }

    /// Parses an error response from the API.
    async fn parse_error_response(&self, response: reqwest::Response) -> LLMError {
        let status = response.status();
        let status_code = status.as_u16();

        if status_code == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);

            return LLMError::rate_limited(Duration::from_secs(retry_after));
        }

        let error_body = response.text().await.unwrap_or_default();

        if let Ok(api_error) = serde_json::from_str::<OpenAIErrorResponse>(&error_body) {
            let error_type = api_error.error.error_type.as_deref().unwrap_or("unknown");

            match error_type {
                "authentication_error" | "invalid_api_key" => {
                    LLMError::authentication_failed(api_error.error.message)
                }
                _ if status_code == 401 => LLMError::authentication_failed(api_error.error.message),
                _ => LLMError::api_error(
                    status_code,
                    api_error.error.message,
                    api_error.error.error_type,
                ),
            }
        } else if status_code == 401 {
            LLMError::authentication_failed(status.canonical_reason().unwrap_or("Unauthorized"))
        } else {
            LLMError::api_error(
                status_code,
                if error_body.is_empty() {
                    status.canonical_reason().unwrap_or("Unknown error")
                } else {
                    &error_body
                },
                None,
            )
        }
    }

    /// Maps the first choice of a completion to a model response.
    fn interpret(&self, message: OpenAIMessage) -> ModelResponse {
        let content = message.content.unwrap_or_default();
        let mut calls = message.tool_calls.unwrap_or_default();

        if calls.is_empty() {
            return parse_text_action(&content);
        }
        if calls.len() > 1 {
            tracing::warn!(
                model = %self.model,
                dropped = calls.len() - 1,
                "model issued several tool calls; executing only the first"
            );
        }

        let call = calls.swap_remove(0);
        match serde_json::from_str::<Value>(&call.function.arguments) {
            Ok(Value::Object(arguments)) => {
                action_from_parts(content, call.id, call.function.name, arguments)
            }
            // Some servers send "" for argument-less calls.
            _ if call.function.arguments.trim().is_empty() => action_from_parts(
                content,
                call.id,
                call.function.name,
                serde_json::Map::new(),
            ),
            _ => ModelResponse::malformed(format!(
                "{}({})",
                call.function.name, call.function.arguments
            )),
        }
    }
}

/// The pseudo-tool every request advertises for finishing a run.
fn final_answer_schema() -> ToolSchema {
    ToolSchema::new(
        FINAL_ANSWER_TOOL,
        "Provides the final answer to the task and ends the run.",
    )
    .with_parameter(ToolParameter::required(
        "answer",
        ParamType::String,
        "The complete final answer",
    ))
}

#[async_trait]
impl InferenceEndpoint for OpenAIEndpoint {
    #[tracing::instrument(skip_all, fields(model = %self.model, messages = conversation.len()))]
    async fn complete(
        &self,
        conversation: &[Message],
        tools: &[ToolSchema],
    ) -> Result<ModelResponse, LLMError> {
        let request_body = ChatCompletionRequest {
            model: self.model.clone(),
            max_tokens: Some(self.max_tokens),
            messages: self.convert_messages(conversation),
            tools: self.convert_tools(tools),
            stream: false,
        };

        let mut retries = 0;
        loop {
            match self.attempt(&request_body).await {
                Err(error) if error.is_retriable() && retries < self.retry.max_retries => {
                    let wait = self.retry.delay(retries, &error);
                    retries += 1;
                    tracing::warn!(
                        retry = retries,
                        max_retries = self.retry.max_retries,
                        wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                        error = %error,
                        "completion failed, retrying"
                    );
                    tokio::time::sleep(wait).await;
                }
                Ok(response) => {
                    tracing::debug!(final_answer = response.is_final(), retries, "completion received");
                    return Ok(response);
                }
                Err(error) => return Err(error),
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::ToolCallRequest;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn endpoint_for(base_url: &str) -> OpenAIEndpoint {
        let config = ProviderConfig::cerebras("test-key")
            .with_base_url(base_url)
            .with_retry(RetryPolicy::none());
        OpenAIEndpoint::new(&config).unwrap()
    }

    fn retrying_endpoint_for(base_url: &str, max_retries: u32) -> OpenAIEndpoint {
        let retry = RetryPolicy::new(max_retries).with_initial_backoff(Duration::from_millis(10));
        let config = ProviderConfig::cerebras("test-key")
            .with_base_url(base_url)
            .with_retry(retry);
        OpenAIEndpoint::new(&config).unwrap()
    }

    fn completion(message: Value) -> Value {
        json!({
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": message, "finish_reason": "stop"}]
        })
    }

    #[test]
    fn endpoint_url_trims_trailing_slash() {
        let endpoint = endpoint_for("http://localhost:9999/v1/");
        assert_eq!(
            endpoint.chat_completions_endpoint(),
            "http://localhost:9999/v1/chat/completions"
        );
    }

    #[test]
    fn new_rejects_invalid_config() {
        let config = ProviderConfig::cerebras("k").with_max_tokens(0);
        assert!(OpenAIEndpoint::new(&config).is_err());
    }

    #[test]
    fn convert_tools_appends_final_answer() {
        let endpoint = endpoint_for("http://localhost");
        let tools = vec![ToolSchema::new("calculate", "Evaluates math")];
        let converted = endpoint.convert_tools(&tools);

        assert_eq!(converted.len(), 2);
        assert_eq!(converted[0].function.name, "calculate");
        assert_eq!(converted[1].function.name, FINAL_ANSWER_TOOL);
        assert_eq!(converted[1].function.parameters["required"], json!(["answer"]));
    }

    #[test]
    fn convert_assistant_tool_call_encodes_arguments() {
        let endpoint = endpoint_for("http://localhost");
        let call = ToolCallRequest::from_json("c1", "calculate", json!({"expression": "2+2"}));
        let converted = endpoint.convert_messages(&[Message::assistant_with_tool_call("", call)]);

        assert_eq!(converted[0].content, None);
        let calls = converted[0].tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.arguments, r#"{"expression":"2+2"}"#);
    }

    #[test]
    fn convert_orphan_observation_to_user_message() {
        let endpoint = endpoint_for("http://localhost");
        let converted = endpoint.convert_messages(&[
            Message::tool(Some("c1".into()), "4"),
            Message::tool(None, "could not parse"),
        ]);

        assert_eq!(converted[0].role, "tool");
        assert_eq!(converted[0].tool_call_id.as_deref(), Some("c1"));
        assert_eq!(converted[1].role, "user");
        assert_eq!(
            converted[1].content.as_deref(),
            Some("Observation: could not parse")
        );
    }

    #[test]
    fn interpret_keeps_only_first_call() {
        let endpoint = endpoint_for("http://localhost");
        let message: OpenAIMessage = serde_json::from_value(json!({
            "role": "assistant",
            "content": "Let me look.",
            "tool_calls": [
                {"id": "a", "type": "function", "function": {"name": "web_search", "arguments": "{\"query\":\"rust\"}"}},
                {"id": "b", "type": "function", "function": {"name": "visit_webpage", "arguments": "{}"}}
            ]
        }))
        .unwrap();

        let ModelResponse::ToolCall { reasoning, call } = endpoint.interpret(message) else {
            panic!("expected tool call");
        };
        assert_eq!(reasoning, "Let me look.");
        assert_eq!(call.id, "a");
        assert_eq!(call.name, "web_search");
    }

    #[test]
    fn interpret_bad_arguments_is_malformed() {
        let endpoint = endpoint_for("http://localhost");
        let message: OpenAIMessage = serde_json::from_value(json!({
            "role": "assistant",
            "tool_calls": [
                {"id": "a", "type": "function", "function": {"name": "web_search", "arguments": "{not json"}}
            ]
        }))
        .unwrap();

        assert_eq!(
            endpoint.interpret(message),
            ModelResponse::malformed("web_search({not json)")
        );
    }

    #[tokio::test]
    async fn complete_returns_tool_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({"model": "llama-4-scout-17b-16e-instruct"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!({
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "visit_webpage", "arguments": "{\"url\":\"http://x\"}"}
                }]
            }))))
            .mount(&server)
            .await;

        let endpoint = endpoint_for(&server.uri());
        let response = endpoint
            .complete(&[Message::user("go")], &[])
            .await
            .unwrap();

        let ModelResponse::ToolCall { call, .. } = response else {
            panic!("expected tool call, got {response:?}");
        };
        assert_eq!(call.id, "call_1");
        assert_eq!(call.arguments["url"], json!("http://x"));
    }

    #[tokio::test]
    async fn complete_maps_final_answer_tool() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!({
                "role": "assistant",
                "tool_calls": [{
                    "id": "call_9",
                    "type": "function",
                    "function": {"name": "final_answer", "arguments": "{\"answer\":\"4\"}"}
                }]
            }))))
            .mount(&server)
            .await;

        let response = endpoint_for(&server.uri())
            .complete(&[Message::user("2+2")], &[])
            .await
            .unwrap();
        assert_eq!(response, ModelResponse::final_answer("4"));
    }

    #[tokio::test]
    async fn complete_plain_text_is_final_answer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!({
                "role": "assistant",
                "content": "Saturday: meetup. Sunday: books."
            }))))
            .mount(&server)
            .await;

        let response = endpoint_for(&server.uri())
            .complete(&[Message::user("plan")], &[])
            .await
            .unwrap();
        assert_eq!(
            response,
            ModelResponse::final_answer("Saturday: meetup. Sunday: books.")
        );
    }

    #[tokio::test]
    async fn complete_maps_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
            .mount(&server)
            .await;

        let error = endpoint_for(&server.uri())
            .complete(&[Message::user("x")], &[])
            .await
            .unwrap_err();
        assert_eq!(error.retry_after(), Some(Duration::from_secs(7)));
    }

    #[tokio::test]
    async fn rate_limit_is_retried_until_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!({
                "role": "assistant",
                "content": "Meetup at noon."
            }))))
            .expect(1)
            .mount(&server)
            .await;

        let response = retrying_endpoint_for(&server.uri(), 2)
            .complete(&[Message::user("plan")], &[])
            .await
            .unwrap();
        assert_eq!(response, ModelResponse::final_answer("Meetup at noon."));
    }

    #[tokio::test]
    async fn server_errors_stop_after_max_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let error = retrying_endpoint_for(&server.uri(), 2)
            .complete(&[Message::user("x")], &[])
            .await
            .unwrap_err();
        assert!(matches!(
            error.kind,
            crate::llm::LLMErrorKind::ApiError {
                status_code: 503,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"type": "invalid_request_error", "message": "bad model"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let error = retrying_endpoint_for(&server.uri(), 3)
            .complete(&[Message::user("x")], &[])
            .await
            .unwrap_err();
        assert!(!error.is_retriable());
    }

    #[tokio::test]
    async fn complete_maps_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"type": "invalid_api_key", "message": "Wrong API Key"}
            })))
            .mount(&server)
            .await;

        let error = endpoint_for(&server.uri())
            .complete(&[Message::user("x")], &[])
            .await
            .unwrap_err();
        assert!(matches!(
            error.kind,
            crate::llm::LLMErrorKind::AuthenticationFailed { .. }
        ));
    }

    #[tokio::test]
    async fn complete_without_choices_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "x", "choices": []})))
            .mount(&server)
            .await;

        let error = endpoint_for(&server.uri())
            .complete(&[Message::user("x")], &[])
            .await
            .unwrap_err();
        assert!(error.to_string().contains("no choices"));
    }
}
