//! Error category classification.
//!
//! Categories drive retry policy and the wording shown to a user; they are
//! coarser than [`GatewayErrorKind`](super::GatewayErrorKind).

use std::fmt;

/// High-level categorization of errors for handling decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The node could not be reached, or the request ran out of time.
    Network,

    /// The node rejected the credentials (HTTP 401/403).
    Auth,

    /// The node failed to serve the request (HTTP 5xx, unreadable error body).
    Server,

    /// The request or the expected response shape is wrong (HTTP 4xx,
    /// decode failures). Retrying the same request will not help.
    Client,
}

impl ErrorCategory {
    /// Returns true if errors in this category are generally transient.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCategory::Network | ErrorCategory::Server)
    }

    /// Returns a short label for the category suitable for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "network",
            ErrorCategory::Auth => "auth",
            ErrorCategory::Server => "server",
            ErrorCategory::Client => "client",
        }
    }

    /// Returns suggested recovery actions for this category.
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "Check that the node is running and reachable",
            ErrorCategory::Auth => "Check the configured API key or bearer token",
            ErrorCategory::Server => "The node may be busy or restarting; it will be retried",
            ErrorCategory::Client => "The request was rejected; retrying will not help",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
