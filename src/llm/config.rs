//! Inference provider configuration.

use crate::llm::error::LLMError;
use std::time::Duration;

/// Default OpenAI-compatible base URL (Cerebras inference).
pub const DEFAULT_BASE_URL: &str = "https://api.cerebras.ai/v1";

/// Default model id.
pub const DEFAULT_MODEL: &str = "llama-4-scout-17b-16e-instruct";

/// Environment variable the API key is read from by default.
pub const DEFAULT_API_KEY_ENV: &str = "CEREBRAS_API_KEY";

/// Provider prefix accepted on model ids and stripped before use.
const MODEL_PREFIX: &str = "cerebras/";

/// Settings for an OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Base URL for the API (without the `/chat/completions` suffix)
    pub base_url: String,
    /// The API key for authentication (may be empty for local providers)
    pub api_key: String,
    /// The model to use
    pub model: String,
    /// Maximum tokens to generate per completion
    pub max_tokens: u32,
    /// Request timeout
    pub timeout: Duration,
    /// How transient failures are retried within one completion
    pub retry: RetryPolicy,
}

impl ProviderConfig {
    /// Creates a configuration for Cerebras with the default model.
    ///
    /// # Examples
    ///
    /// ```
    /// use conductor::llm::ProviderConfig;
    ///
    /// let config = ProviderConfig::cerebras("csk-...");
    /// assert_eq!(config.model, "llama-4-scout-17b-16e-instruct");
    /// ```
    #[must_use]
    pub fn cerebras(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 4096,
            timeout: Duration::from_secs(120),
            retry: RetryPolicy::default(),
        }
    }

    /// Creates a configuration for any OpenAI-compatible endpoint.
    ///
    /// No API key is set; local servers such as Ollama or vLLM do not need one.
    #[must_use]
    pub fn openai_compatible(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: String::new(),
            model: normalize_model_id(&model.into()),
            max_tokens: 4096,
            timeout: Duration::from_secs(300),
            retry: RetryPolicy::default(),
        }
    }

    /// Sets the model, stripping a `cerebras/` prefix if present.
    #[must_use]
    pub fn with_model(mut self, model: impl AsRef<str>) -> Self {
        self.model = normalize_model_id(model.as_ref());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the maximum tokens per completion.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Checks the configuration for values that can never work.
    ///
    /// # Errors
    ///
    /// Returns `LLMError::invalid_config` naming the offending field.
    pub fn validate(&self) -> Result<(), LLMError> {
        if self.base_url.trim().is_empty() {
            return Err(LLMError::invalid_config("base_url", "must not be empty"));
        }
        if self.model.trim().is_empty() {
            return Err(LLMError::invalid_config("model", "must not be empty"));
        }
        if self.max_tokens == 0 {
            return Err(LLMError::invalid_config("max_tokens", "must be positive"));
        }
        if self.timeout.is_zero() {
            return Err(LLMError::invalid_config("timeout", "must be positive"));
        }
        Ok(())
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::cerebras(String::new())
    }
}

/// Retries for rate limits, timeouts, network errors and 5xx responses.
///
/// Waits grow exponentially from `initial_backoff` and are capped at
/// `max_backoff`. A rate limit's `retry-after` replaces the computed wait,
/// under the same cap. Exhausted retries surface the last error, which the
/// agent loop records as an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Wait before the first retry
    pub initial_backoff: Duration,
    /// Longest single wait
    pub max_backoff: Duration,
    /// Growth factor between retries
    pub backoff_multiplier: u32,
}

impl RetryPolicy {
    /// A policy with `max_retries` retries and the default backoff.
    #[must_use]
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Never retries.
    #[must_use]
    pub fn none() -> Self {
        Self::new(0)
    }

    /// Sets the wait before the first retry.
    #[must_use]
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// Sets the longest single wait.
    #[must_use]
    pub fn with_max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff = backoff;
        self
    }

    /// Wait before retry number `retry` (0-based) after `error`.
    #[must_use]
    pub fn delay(&self, retry: u32, error: &LLMError) -> Duration {
        let computed = self
            .initial_backoff
            .saturating_mul(self.backoff_multiplier.saturating_pow(retry));
        error
            .retry_after()
            .unwrap_or(computed)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            backoff_multiplier: 2,
        }
    }
}

/// Strips the `cerebras/` routing prefix from a model id.
#[must_use]
pub fn normalize_model_id(model: &str) -> String {
    model
        .trim()
        .strip_prefix(MODEL_PREFIX)
        .unwrap_or(model.trim())
        .to_string()
}
