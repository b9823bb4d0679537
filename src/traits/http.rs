//! HTTP client trait abstraction.
//!
//! The gateway never touches reqwest directly. It talks to [`HttpClient`],
//! which lets tests swap in a scripted client and keeps transport failures
//! in one small enum.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;
use thiserror::Error;

/// HTTP headers represented as a key-value map.
pub type Headers = HashMap<String, String>;

/// Streaming response body.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// HTTP response wrapper.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Response headers, names lowercased
    pub headers: Headers,
    /// Response body
    pub body: Bytes,
}

impl Response {
    /// Create a new response.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Create a new response with headers.
    pub fn with_headers(status: u16, headers: Headers, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Check if the response indicates success (2xx status).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Header lookup, case-insensitive on the name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Get the response body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Failures below the HTTP layer: the request never produced a response.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    /// Connection refused, reset, or otherwise not established
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    /// Host name could not be resolved
    #[error("DNS resolution failed: {0}")]
    Dns(String),
    /// Transport-level timeout reported by the client library
    #[error("Request timeout: {0}")]
    Timeout(String),
    /// Request was cancelled by the caller
    #[error("Request cancelled")]
    Cancelled,
    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    /// Body read failed mid-stream
    #[error("IO error: {0}")]
    Io(String),
    /// Other error
    #[error("HTTP error: {0}")]
    Other(String),
}

/// Trait for HTTP client operations.
///
/// Implementations return `Ok` for every response the server produced,
/// whatever its status; status handling belongs to the caller.
///
/// # Example
///
/// ```ignore
/// use icn_realtime::traits::{HttpClient, Headers};
///
/// async fn fetch_health<C: HttpClient>(client: &C) -> bool {
///     match client.get("http://localhost:8080/health", &Headers::new()).await {
///         Ok(response) => response.is_success(),
///         Err(_) => false,
///     }
/// }
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Perform a GET request.
    async fn get(&self, url: &str, headers: &Headers) -> Result<Response, TransportError>;

    /// Perform a POST request with a pre-serialized body.
    async fn post(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
    ) -> Result<Response, TransportError>;

    /// Perform a GET request and return the body as a stream.
    ///
    /// Used for `text/event-stream` endpoints. A non-2xx status is reported
    /// as [`TransportError::Other`] carrying the status and body text.
    async fn get_stream(&self, url: &str, headers: &Headers) -> Result<ByteStream, TransportError>;
}
