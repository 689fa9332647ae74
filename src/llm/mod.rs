//! Inference endpoints.
//!
//! [`InferenceEndpoint`] is the seam between the agent loop and a language
//! model. [`OpenAIEndpoint`] talks to any OpenAI-compatible server (Cerebras
//! by default); [`ScriptedEndpoint`] replays canned responses for tests.

mod config;
mod endpoint;
mod error;
mod openai;
mod scripted;

pub use config::{
    normalize_model_id, ProviderConfig, RetryPolicy, DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL,
    DEFAULT_MODEL,
};
pub use endpoint::{parse_text_action, InferenceEndpoint, ModelResponse, FINAL_ANSWER_TOOL};
pub use error::{LLMError, LLMErrorKind};
pub use openai::OpenAIEndpoint;
pub use scripted::{current_step, ScriptedEndpoint};
