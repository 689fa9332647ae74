//! Conversation messages exchanged between an agent and its inference endpoint.
//!
//! A conversation is an ordered `Vec<Message>` that is only ever appended to
//! within a run.

use serde::{Deserialize, Serialize};

/// Arguments of a tool call: string keys mapped to JSON values.
pub type ToolArguments = serde_json::Map<String, serde_json::Value>;

/// A message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender
    pub role: MessageRole,
    /// The content of the message
    pub content: String,
    /// The tool call this assistant message issued, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallRequest>>,
    /// ID of the tool call a `tool` message answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn plain(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Creates a new system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(MessageRole::System, content)
    }

    /// Creates a new user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(MessageRole::User, content)
    }

    /// Creates a new assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(MessageRole::Assistant, content)
    }

    /// Creates an assistant message that carries the tool call it issued.
    #[must_use]
    pub fn assistant_with_tool_call(content: impl Into<String>, call: ToolCallRequest) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            tool_calls: Some(vec![call]),
            tool_call_id: None,
        }
    }

    /// Creates a tool observation.
    ///
    /// `tool_call_id` is `None` when the observation does not answer a real
    /// call, e.g. after an unparseable model reply.
    #[must_use]
    pub fn tool(tool_call_id: Option<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: content.into(),
            tool_calls: None,
            tool_call_id,
        }
    }

    /// Returns true if this is a tool observation.
    #[must_use]
    pub fn is_observation(&self) -> bool {
        self.role == MessageRole::Tool
    }
}

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instructions
    System,
    /// User input
    User,
    /// Assistant response
    Assistant,
    /// Tool observation
    Tool,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::Tool => write!(f, "tool"),
        }
    }
}

/// A tool invocation requested by the inference endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Provider-assigned call id
    pub id: String,
    /// The name of the tool to call
    pub name: String,
    /// The arguments to pass to the tool
    pub arguments: ToolArguments,
}

impl ToolCallRequest {
    /// Creates a tool call request.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: ToolArguments) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Builds a request from a JSON value.
    ///
    /// Non-object values produce an empty argument map; used by test stubs
    /// where the literal is always an object.
    #[must_use]
    pub fn from_json(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        let arguments = match arguments {
            serde_json::Value::Object(map) => map,
            _ => ToolArguments::new(),
        };
        Self::new(id, name, arguments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_serializes_lowercase() {
        let message = Message::user("hello");
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["role"], "user");
        assert!(value.get("tool_calls").is_none());
    }

    #[test]
    fn tool_message_is_observation() {
        let message = Message::tool(Some("call_1".to_string()), "4");
        assert!(message.is_observation());
        assert_eq!(message.tool_call_id.as_deref(), Some("call_1"));
        assert!(!Message::assistant("x").is_observation());
    }

    #[test]
    fn assistant_with_tool_call_keeps_call() {
        let call = ToolCallRequest::from_json("c1", "calculate", json!({"expression": "2+2"}));
        let message = Message::assistant_with_tool_call("computing", call.clone());
        assert_eq!(message.tool_calls, Some(vec![call]));
    }

    #[test]
    fn from_json_ignores_non_objects() {
        let call = ToolCallRequest::from_json("c1", "calculate", json!([1, 2]));
        assert!(call.arguments.is_empty());
    }

    #[test]
    fn role_display() {
        assert_eq!(MessageRole::Tool.to_string(), "tool");
        assert_eq!(MessageRole::System.to_string(), "system");
    }
}
