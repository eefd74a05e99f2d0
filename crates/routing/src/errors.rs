//! Error and retry-policy types for the relay domain.
//!
//! Each collaborator boundary has its own error type: [`PayloadError`] for
//! inbound bytes, [`AgentApiError`] for the remote agent API, [`NotifyError`]
//! for the notification channel, and [`MappingError`] for the agent mapping
//! loaded at startup.
//!
//! [`RetryPolicy`] is informational. Nothing in this crate retries; callers
//! and operators use it to decide whether re-submitting makes sense.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    ///
    /// `after` optionally specifies the minimum delay before retrying (derived
    /// from a `Retry-After` response header).
    Retryable {
        /// Minimum back-off before the next attempt. `None` means the caller
        /// applies its own back-off schedule.
        after: Option<Duration>,
    },
    /// Retrying the same request will not succeed.
    NonRetryable,
}

impl RetryPolicy {
    /// Returns `true` for [`RetryPolicy::Retryable`].
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable { .. })
    }
}

// ---------------------------------------------------------------------------
// Inbound payloads
// ---------------------------------------------------------------------------

/// Failure to turn raw webhook bytes into a [`crate::WebhookEvent`].
#[derive(Debug, Error)]
pub enum PayloadError {
    /// The body is not valid JSON.
    #[error("Invalid JSON: {0}")]
    MalformedJson(#[source] serde_json::Error),

    /// The body is JSON but required fields are absent or mistyped.
    #[error("Invalid payload structure: {message}")]
    InvalidSchema {
        /// Description of the offending field.
        message: String,
    },
}

impl PayloadError {
    pub(crate) fn schema(message: impl Into<String>) -> Self {
        Self::InvalidSchema {
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Remote agent API
// ---------------------------------------------------------------------------

/// Failure reported by an [`crate::AgentApi`] implementation.
#[derive(Debug, Clone, Error)]
pub enum AgentApiError {
    /// The request could not be sent or the connection failed.
    #[error("Agent API request failed: {message}")]
    Network {
        /// Transport error description.
        message: String,
    },

    /// The request did not complete within the configured timeout.
    #[error("Agent API request timed out: {message}")]
    Timeout {
        /// Transport error description.
        message: String,
    },

    /// The API answered with a non-2xx status.
    #[error("Agent API returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
        /// Parsed `Retry-After` header, when present.
        retry_after: Option<Duration>,
    },

    /// The request could not be formed from the given input (for example, a
    /// session id that is not a single URL path segment). Nothing was sent.
    #[error("Invalid agent API request: {message}")]
    InvalidRequest {
        /// What was wrong with the input.
        message: String,
    },

    /// The API answered 2xx but the body could not be decoded.
    #[error("Agent API response could not be decoded: {message}")]
    Decode {
        /// Decoder error description.
        message: String,
    },
}

impl AgentApiError {
    /// Classifies the failure for callers deciding whether to re-submit.
    ///
    /// Timeouts, connection failures, `429`, and `5xx` are retryable; every
    /// other status, invalid input, and all decode failures are not.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Network { .. } | Self::Timeout { .. } => RetryPolicy::Retryable { after: None },
            Self::Status {
                status,
                retry_after,
                ..
            } if *status == 429 || *status >= 500 => RetryPolicy::Retryable {
                after: *retry_after,
            },
            Self::Status { .. } | Self::InvalidRequest { .. } | Self::Decode { .. } => {
                RetryPolicy::NonRetryable
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// Failure reported by a [`crate::Notifier`] implementation.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The message could not be handed to the messaging service.
    #[error("Notification delivery failed: {message}")]
    Delivery {
        /// Transport or API error description.
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// The agent mapping could not be loaded.
#[derive(Debug, Error)]
pub enum MappingError {
    /// The mapping source is not a JSON object of strings.
    #[error("Agent mapping must be a JSON object of strings: {0}")]
    Invalid(#[source] serde_json::Error),

    /// A routing key maps to an empty agent id.
    #[error("Agent mapping entry '{key}' has an empty agent id")]
    EmptyAgent {
        /// The offending routing key.
        key: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> AgentApiError {
        AgentApiError::Status {
            status: code,
            body: String::new(),
            retry_after: None,
        }
    }

    #[test]
    fn transient_failures_are_retryable() {
        assert!(status(503).retry_policy().is_retryable());
        assert!(status(429).retry_policy().is_retryable());
        assert!(AgentApiError::Timeout {
            message: "deadline".into()
        }
        .retry_policy()
        .is_retryable());
    }

    #[test]
    fn client_errors_are_not_retryable() {
        assert_eq!(status(401).retry_policy(), RetryPolicy::NonRetryable);
        assert_eq!(
            AgentApiError::Decode {
                message: "missing id".into()
            }
            .retry_policy(),
            RetryPolicy::NonRetryable
        );
    }

    #[test]
    fn retry_after_is_carried_through() {
        let err = AgentApiError::Status {
            status: 429,
            body: "slow down".into(),
            retry_after: Some(Duration::from_secs(7)),
        };
        assert_eq!(
            err.retry_policy(),
            RetryPolicy::Retryable {
                after: Some(Duration::from_secs(7))
            }
        );
    }
}
