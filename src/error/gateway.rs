//! Gateway error type.
//!
//! Every failure the gateway can surface (transport, HTTP status, body
//! decoding, deadline) is folded into one [`GatewayError`] so callers can
//! always render `err.to_string()` without matching on the kind.

use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use super::category::ErrorCategory;
use crate::traits::TransportError;

/// Which failure mode produced a [`GatewayError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayErrorKind {
    /// Non-2xx response with a decodable error envelope.
    Http,
    /// Non-2xx response whose body is not an error envelope.
    Protocol,
    /// No response: refused connection, DNS failure, caller abort.
    Network,
    /// The configured request deadline elapsed.
    Timeout,
    /// 2xx response whose body does not fit the expected shape.
    Decode,
    /// The request body could not be serialized; nothing was sent.
    Encode,
}

impl GatewayErrorKind {
    /// Stable code used when the server supplies none.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayErrorKind::Http => "E_GW_HTTP",
            GatewayErrorKind::Protocol => "E_GW_PROTOCOL",
            GatewayErrorKind::Network => "E_GW_NETWORK",
            GatewayErrorKind::Timeout => "E_GW_TIMEOUT",
            GatewayErrorKind::Decode => "E_GW_DECODE",
            GatewayErrorKind::Encode => "E_GW_ENCODE",
        }
    }
}

/// Error envelope returned by the node on non-2xx responses.
///
/// The node sends `{error, details?, correlation_id?}`; older handlers send
/// `{error_code, message}` instead, so both spellings are accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub details: Option<Value>,
    #[serde(default)]
    pub correlation_id: Option<String>,
}

impl ErrorEnvelope {
    /// Human-readable message, preferring `error` over `message`.
    pub fn text(&self) -> Option<&str> {
        self.error
            .as_deref()
            .or(self.message.as_deref())
            .filter(|s| !s.is_empty())
    }
}

/// Uniform error surfaced by the gateway client.
///
/// `status_code` is 0 when no response was received.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message}")]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub status_code: u16,
    pub error_code: String,
    pub message: String,
    pub details: Option<Value>,
    pub correlation_id: Option<String>,
}

impl GatewayError {
    fn bare(kind: GatewayErrorKind, status_code: u16, message: impl Into<String>) -> Self {
        Self {
            kind,
            status_code,
            error_code: kind.code().to_string(),
            message: message.into(),
            details: None,
            correlation_id: None,
        }
    }

    /// Build an error from a non-2xx response body.
    ///
    /// A JSON object carrying `error` (or `message`) becomes
    /// [`GatewayErrorKind::Http`] with the whole object as `details`.
    /// Anything else becomes [`GatewayErrorKind::Protocol`] with the raw
    /// text as the message.
    pub fn from_status(status: u16, body: &str) -> Self {
        let parsed = serde_json::from_str::<Value>(body).ok().and_then(|value| {
            let envelope = ErrorEnvelope::deserialize(&value).ok()?;
            envelope.text().is_some().then_some((envelope, value))
        });

        match parsed {
            Some((envelope, value)) => {
                let message = envelope.text().unwrap_or_default().to_string();
                Self {
                    kind: GatewayErrorKind::Http,
                    status_code: status,
                    error_code: envelope
                        .error_code
                        .clone()
                        .unwrap_or_else(|| GatewayErrorKind::Http.code().to_string()),
                    message,
                    details: Some(value),
                    correlation_id: envelope.correlation_id,
                }
            }
            None => {
                let text = body.trim();
                let message = if text.is_empty() {
                    format!("HTTP {}", status)
                } else {
                    text.to_string()
                };
                Self::bare(GatewayErrorKind::Protocol, status, message)
            }
        }
    }

    /// No response reached the client.
    pub fn network(message: impl Into<String>) -> Self {
        Self::bare(GatewayErrorKind::Network, 0, message)
    }

    /// The configured deadline elapsed.
    pub fn timeout(after: Duration) -> Self {
        Self::bare(
            GatewayErrorKind::Timeout,
            0,
            format!("Request timed out after {}ms", after.as_millis()),
        )
    }

    /// A successful response could not be decoded into the expected shape.
    pub fn decode(status: u16, message: impl Into<String>) -> Self {
        Self::bare(GatewayErrorKind::Decode, status, message)
    }

    /// The request body could not be serialized.
    pub fn encode(message: impl Into<String>) -> Self {
        Self::bare(GatewayErrorKind::Encode, 0, message)
    }

    /// Category used for retry and messaging decisions.
    pub fn category(&self) -> ErrorCategory {
        match self.kind {
            GatewayErrorKind::Network | GatewayErrorKind::Timeout => ErrorCategory::Network,
            GatewayErrorKind::Decode | GatewayErrorKind::Encode => ErrorCategory::Client,
            GatewayErrorKind::Protocol => ErrorCategory::Server,
            GatewayErrorKind::Http => match self.status_code {
                401 | 403 => ErrorCategory::Auth,
                408 | 429 => ErrorCategory::Network,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Client,
            },
        }
    }

    /// Check if this error is likely transient.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self.kind {
            GatewayErrorKind::Network => {
                "Unable to reach the node. Check that it is running.".to_string()
            }
            GatewayErrorKind::Timeout => {
                "The node did not answer in time. It may be overloaded.".to_string()
            }
            GatewayErrorKind::Decode => {
                "The node sent a response this client does not understand.".to_string()
            }
            GatewayErrorKind::Encode => {
                format!("The request could not be built: {}", self.message)
            }
            GatewayErrorKind::Http | GatewayErrorKind::Protocol => match self.status_code {
                401 => "Authentication required. Check your API key or token.".to_string(),
                403 => "Access denied for this operation.".to_string(),
                404 => format!("Not found: {}", self.message),
                429 => "Too many requests. Please wait a moment.".to_string(),
                500..=599 => format!("The node reported an error: {}", self.message),
                _ => self.message.clone(),
            },
        }
    }

    /// Look up a field of the decoded error body.
    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.as_ref().and_then(|d| d.get(key))
    }
}

impl From<TransportError> for GatewayError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout(_) => {
                Self::bare(GatewayErrorKind::Timeout, 0, err.to_string())
            }
            other => GatewayError::network(other.to_string()),
        }
    }
}
