//! Inference endpoint error types.
//!
//! Transient failures are retried inside the endpoint (see
//! [`RetryPolicy`](crate::llm::RetryPolicy)). Whatever is left never aborts a
//! run: the agent loop turns it into an error observation that consumes one
//! step.

use std::fmt;
use std::time::Duration;

/// A failed completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LLMError {
    /// The specific error that occurred
    pub kind: LLMErrorKind,
}

/// Why a completion failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LLMErrorKind {
    /// The request never got an HTTP response
    Network {
        /// What the transport reported
        message: String,
    },
    /// HTTP 429
    RateLimited {
        /// The server's `retry-after`, or a default
        retry_after: Duration,
    },
    /// Any other non-success status
    ApiError {
        /// HTTP status
        status_code: u16,
        /// The provider's message, or the status reason
        message: String,
        /// The provider's error type, when the body had one
        error_type: Option<String>,
    },
    /// The key was missing, wrong or revoked
    AuthenticationFailed {
        /// The provider's explanation
        reason: String,
    },
    /// A success response whose body was unusable
    ParseError {
        /// What was wrong with it
        message: String,
    },
    /// The provider settings can never work
    InvalidConfig {
        /// The offending field
        field: String,
        /// What is wrong with it
        reason: String,
    },
    /// No response within the configured timeout
    Timeout {
        /// The configured timeout
        duration: Duration,
    },
}

impl LLMError {
    /// Creates a new LLMError with the given kind.
    #[must_use]
    pub fn new(kind: LLMErrorKind) -> Self {
        Self { kind }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(LLMErrorKind::Network {
            message: message.into(),
        })
    }

    /// Creates a rate limited error.
    #[must_use]
    pub fn rate_limited(retry_after: Duration) -> Self {
        Self::new(LLMErrorKind::RateLimited { retry_after })
    }

    /// Creates an API error.
    #[must_use]
    pub fn api_error(
        status_code: u16,
        message: impl Into<String>,
        error_type: Option<String>,
    ) -> Self {
        Self::new(LLMErrorKind::ApiError {
            status_code,
            message: message.into(),
            error_type,
        })
    }

    /// Creates an authentication failed error.
    #[must_use]
    pub fn authentication_failed(reason: impl Into<String>) -> Self {
        Self::new(LLMErrorKind::AuthenticationFailed {
            reason: reason.into(),
        })
    }

    /// Creates a parse error.
    #[must_use]
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(LLMErrorKind::ParseError {
            message: message.into(),
        })
    }

    /// Creates an invalid config error.
    #[must_use]
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(LLMErrorKind::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        })
    }

    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(duration: Duration) -> Self {
        Self::new(LLMErrorKind::Timeout { duration })
    }

    /// Returns true if the endpoint retries this failure: transport errors,
    /// timeouts, rate limits and 5xx statuses.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(
            self.kind,
            LLMErrorKind::Network { .. }
                | LLMErrorKind::RateLimited { .. }
                | LLMErrorKind::Timeout { .. }
                | LLMErrorKind::ApiError {
                    status_code: 500..=599,
                    ..
                }
        )
    }

    /// The server-requested wait, for rate limits only.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match &self.kind {
            LLMErrorKind::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

impl fmt::Display for LLMError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            LLMErrorKind::Network { message } => {
                write!(
                    f,
                    "could not reach the inference endpoint: {}; check the base URL and network",
                    message
                )
            }
            LLMErrorKind::RateLimited { retry_after } => {
                write!(
                    f,
                    "inference endpoint is rate limiting requests; retry after {} seconds",
                    retry_after.as_secs()
                )
            }
            LLMErrorKind::ApiError {
                status_code,
                message,
                error_type,
            } => {
                if let Some(error_type) = error_type {
                    write!(
                        f,
                        "API error (HTTP {}): {} (type: {})",
                        status_code, message, error_type
                    )
                } else {
                    write!(f, "API error (HTTP {}): {}", status_code, message)
                }
            }
            LLMErrorKind::AuthenticationFailed { reason } => {
                write!(
                    f,
                    "inference endpoint rejected the API key: {}; check provider.api_key or its environment variable",
                    reason
                )
            }
            LLMErrorKind::ParseError { message } => {
                write!(f, "unusable completion response: {}", message)
            }
            LLMErrorKind::InvalidConfig { field, reason } => {
                write!(f, "invalid provider configuration '{}': {}", field, reason)
            }
            LLMErrorKind::Timeout { duration } => {
                write!(
                    f,
                    "inference request timed out after {} seconds",
                    duration.as_secs()
                )
            }
        }
    }
}

impl std::error::Error for LLMError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_errors_are_retriable() {
        assert!(LLMError::network("connection reset").is_retriable());
        assert!(LLMError::timeout(Duration::from_secs(5)).is_retriable());
        assert!(LLMError::api_error(503, "overloaded", None).is_retriable());
    }

    #[test]
    fn client_errors_are_not_retriable() {
        assert!(!LLMError::authentication_failed("bad key").is_retriable());
        assert!(!LLMError::api_error(400, "bad request", None).is_retriable());
        assert!(!LLMError::parse_error("eof").is_retriable());
    }

    #[test]
    fn retry_after_only_for_rate_limit() {
        let error = LLMError::rate_limited(Duration::from_secs(30));
        assert_eq!(error.retry_after(), Some(Duration::from_secs(30)));
        assert_eq!(LLMError::network("x").retry_after(), None);
    }

    #[test]
    fn api_error_display_includes_type() {
        let error = LLMError::api_error(400, "bad model", Some("invalid_request_error".into()));
        let message = error.to_string();
        assert!(message.contains("HTTP 400"));
        assert!(message.contains("invalid_request_error"));
    }

    #[test]
    fn timeout_display() {
        let error = LLMError::timeout(Duration::from_secs(120));
        assert!(error.to_string().contains("120 seconds"));
    }
}
