//! Mock HTTP client for testing.
//!
//! Returns scripted responses per URL and records every request so tests can
//! assert on headers and bodies without a network.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use crate::traits::{ByteStream, Headers, HttpClient, Response, TransportError};

/// A recorded HTTP request for verification in tests.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method (GET or POST)
    pub method: String,
    /// Request URL
    pub url: String,
    /// Request headers
    pub headers: Headers,
    /// Request body (for POST requests)
    pub body: Option<String>,
}

/// Configuration for a mock response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return a response
    Success(Response),
    /// Return a transport error
    Error(TransportError),
    /// Return a stream of body chunks
    Stream(Vec<Bytes>),
    /// Return the inner response after a delay
    Delayed(Duration, Box<MockResponse>),
    /// Never complete
    Hang,
}

impl MockResponse {
    /// JSON body with the given status.
    pub fn json(status: u16, value: serde_json::Value) -> Self {
        let mut headers = Headers::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        MockResponse::Success(Response::with_headers(status, headers, value.to_string()))
    }

    /// Plain text body with the given status.
    pub fn text(status: u16, body: &str) -> Self {
        MockResponse::Success(Response::new(status, body.to_string()))
    }
}

/// Mock HTTP client for testing.
///
/// Responses are matched by exact URL, then by URL prefix, then by the
/// default. Queued responses for a URL are consumed in order; the last one
/// stays in place for every later request.
#[derive(Debug, Clone, Default)]
pub struct MockHttpClient {
    responses: Arc<Mutex<HashMap<String, VecDeque<MockResponse>>>>,
    default_response: Arc<Mutex<Option<MockResponse>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockHttpClient {
    /// Create a new mock HTTP client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the responses for a URL with a single one.
    pub fn set_response(&self, url: &str, response: MockResponse) {
        let mut responses = self.responses.lock();
        responses.insert(url.to_string(), VecDeque::from([response]));
    }

    /// Append a response to the queue for a URL.
    pub fn push_response(&self, url: &str, response: MockResponse) {
        let mut responses = self.responses.lock();
        responses
            .entry(url.to_string())
            .or_default()
            .push_back(response);
    }

    /// Set a default response for URLs without specific matches.
    pub fn set_default_response(&self, response: MockResponse) {
        *self.default_response.lock() = Some(response);
    }

    /// Get all recorded requests.
    pub fn get_requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests made so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Clear all recorded requests.
    pub fn clear_requests(&self) {
        self.requests.lock().clear();
    }

    fn record_request(&self, method: &str, url: &str, headers: &Headers, body: Option<String>) {
        self.requests.lock().push(RecordedRequest {
            method: method.to_string(),
            url: url.to_string(),
            headers: headers.clone(),
            body,
        });
    }

    fn next_from(queue: &mut VecDeque<MockResponse>) -> Option<MockResponse> {
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }

    fn get_response(&self, url: &str) -> Option<MockResponse> {
        let mut responses = self.responses.lock();

        if let Some(queue) = responses.get_mut(url) {
            return Self::next_from(queue);
        }

        let prefix = responses
            .keys()
            .filter(|pattern| url.starts_with(pattern.as_str()))
            .max_by_key(|pattern| pattern.len())
            .cloned();
        if let Some(queue) = prefix.and_then(|p| responses.get_mut(&p)) {
            return Self::next_from(queue);
        }

        self.default_response.lock().clone()
    }

    async fn resolve(response: Option<MockResponse>, url: &str) -> Result<MockResponse, TransportError> {
        let mut current = response
            .ok_or_else(|| TransportError::Other(format!("No mock response for URL: {}", url)))?;
        loop {
            match current {
                MockResponse::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    current = *inner;
                }
                MockResponse::Hang => std::future::pending::<()>().await,
                other => return Ok(other),
            }
        }
    }

    async fn respond(&self, url: &str) -> Result<Response, TransportError> {
        match Self::resolve(self.get_response(url), url).await? {
            MockResponse::Success(response) => Ok(response),
            MockResponse::Error(err) => Err(err),
            MockResponse::Stream(_) => Err(TransportError::Other(
                "Stream response on non-stream request".to_string(),
            )),
            MockResponse::Delayed(..) | MockResponse::Hang => unreachable!("resolved above"),
        }
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn get(&self, url: &str, headers: &Headers) -> Result<Response, TransportError> {
        self.record_request("GET", url, headers, None);
        self.respond(url).await
    }

    async fn post(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
    ) -> Result<Response, TransportError> {
        self.record_request("POST", url, headers, Some(body.to_string()));
        self.respond(url).await
    }

    async fn get_stream(&self, url: &str, headers: &Headers) -> Result<ByteStream, TransportError> {
        self.record_request("GET", url, headers, None);

        match Self::resolve(self.get_response(url), url).await? {
            MockResponse::Stream(chunks) => {
                let stream = futures::stream::iter(chunks.into_iter().map(Ok));
                Ok(Box::pin(stream))
            }
            MockResponse::Error(err) => Err(err),
            MockResponse::Success(response) => Err(TransportError::Other(format!(
                "HTTP {}: {}",
                response.status,
                response.text()
            ))),
            MockResponse::Delayed(..) | MockResponse::Hang => unreachable!("resolved above"),
        }
    }
}
