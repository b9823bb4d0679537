//! HTTP client for the ICN node API.
//!
//! [`GatewayClient`] is the only component that talks to the node. It
//! builds URLs from the configured base, attaches credentials, bounds every
//! call by the configured timeout and folds every failure into
//! [`GatewayError`]. Typed endpoint wrappers live in `endpoints.rs`.

mod credentials;
mod endpoints;
pub mod normalize;
mod request;

pub use credentials::{Credentials, API_KEY_HEADER};
pub use normalize::{ListShape, ObjectShape, Payload, ShapeError};
pub use request::{GatewayRequest, Method};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

use crate::adapters::ReqwestHttpClient;
use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::traits::{Headers, HttpClient};

/// Header carrying the per-request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// A 2xx response with its body classified.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub payload: Payload,
}

impl RawResponse {
    /// Decode as an object endpoint, unwrapping `{data: ...}`.
    pub fn into_object<T: DeserializeOwned>(self) -> GatewayResult<T> {
        let status = self.status;
        normalize::normalize_object(self.payload)
            .map_err(|e| GatewayError::decode(status, e.to_string()))
    }

    /// Decode as a list endpoint; `names` are the resource keys to try.
    pub fn into_list<T: DeserializeOwned>(self, names: &[&str]) -> GatewayResult<Vec<T>> {
        let status = self.status;
        normalize::normalize_list(self.payload, names)
            .map_err(|e| GatewayError::decode(status, e.to_string()))
    }
}

/// Client for the node's HTTP API.
pub struct GatewayClient {
    base_url: String,
    http: Arc<dyn HttpClient>,
    credentials: RwLock<Credentials>,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl GatewayClient {
    /// Create a client backed by reqwest.
    pub fn new(config: &GatewayConfig) -> Self {
        Self::with_http_client(config, Arc::new(ReqwestHttpClient::new()))
    }

    /// Create a client over any [`HttpClient`], e.g. a mock in tests.
    pub fn with_http_client(config: &GatewayConfig, http: Arc<dyn HttpClient>) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            credentials: RwLock::new(config.credentials.clone()),
            timeout: config.timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// The transport this client sends through.
    pub fn http(&self) -> Arc<dyn HttpClient> {
        Arc::clone(&self.http)
    }

    /// Snapshot of the current credentials.
    pub fn credentials(&self) -> Credentials {
        self.credentials.read().clone()
    }

    pub fn set_auth_token(&self, token: impl Into<String>) {
        self.credentials.write().bearer_token = Some(token.into());
    }

    pub fn clear_auth_token(&self) {
        self.credentials.write().bearer_token = None;
    }

    pub fn set_api_key(&self, key: impl Into<String>) {
        self.credentials.write().api_key = Some(key.into());
    }

    pub fn clear_api_key(&self) {
        self.credentials.write().api_key = None;
    }

    /// Absolute URL for `path`.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Headers for one request: content type, credentials and a fresh id.
    pub fn headers(&self) -> Headers {
        let mut headers = Headers::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        self.credentials.read().apply(&mut headers);
        headers.insert(REQUEST_ID_HEADER.to_string(), Uuid::new_v4().to_string());
        headers
    }

    /// Send a request and classify the response body.
    ///
    /// Non-2xx responses become [`GatewayError`]s here; decoding into a
    /// concrete type is left to the caller.
    pub async fn send(&self, request: GatewayRequest) -> GatewayResult<RawResponse> {
        let url = self.url(&request.path);
        let headers = self.headers();
        let request_id = headers.get(REQUEST_ID_HEADER).cloned().unwrap_or_default();
        let span = tracing::debug_span!(
            "gateway_request",
            method = %request.method,
            path = %request.path,
            request_id = %request_id,
        );

        self.send_inner(request, url, headers).instrument(span).await
    }

    async fn send_inner(
        &self,
        request: GatewayRequest,
        url: String,
        headers: Headers,
    ) -> GatewayResult<RawResponse> {
        let body = match request.body {
            Some(ref value) => serde_json::to_string(value)
                .map_err(|e| GatewayError::encode(format!("Failed to encode request body: {}", e)))?,
            None => String::new(),
        };

        let http = Arc::clone(&self.http);
        let call = async {
            match request.method {
                Method::Get => http.get(&url, &headers).await,
                Method::Post => http.post(&url, &body, &headers).await,
            }
        };
        let timeout = self.timeout;
        let deadline = async move {
            match timeout {
                Some(after) => {
                    tokio::time::sleep(after).await;
                    after
                }
                None => std::future::pending().await,
            }
        };
        let cancel = request.cancel.clone().unwrap_or_default();

        let response = tokio::select! {
            result = call => result.map_err(|e| {
                tracing::debug!("Transport failure for {}: {}", url, e);
                GatewayError::from(e)
            })?,
            after = deadline => {
                tracing::warn!("Request to {} timed out after {:?}", url, after);
                return Err(GatewayError::timeout(after));
            }
            _ = cancel.cancelled() => {
                tracing::debug!("Request to {} aborted by caller", url);
                return Err(GatewayError::network("Request aborted"));
            }
        };

        if !response.is_success() {
            let err = GatewayError::from_status(response.status, &response.text());
            tracing::debug!(
                status = response.status,
                error_code = %err.error_code,
                "Request to {} failed: {}",
                url,
                err.message
            );
            return Err(err);
        }

        Ok(RawResponse {
            status: response.status,
            payload: Payload::from_response(&response),
        })
    }

    /// Issue `method path` with an optional JSON body and decode the result.
    ///
    /// An empty response decodes as JSON `null`, so `T` should be `()`,
    /// `Option<_>` or [`Value`] for endpoints that may answer 204.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> GatewayResult<T> {
        let request = GatewayRequest {
            method,
            path: path.to_string(),
            body,
            cancel: None,
        };
        self.send(request).await?.into_object()
    }

    /// GET an object endpoint.
    pub async fn get_object<T: DeserializeOwned>(&self, path: &str) -> GatewayResult<T> {
        self.send(GatewayRequest::get(path)).await?.into_object()
    }

    /// GET a list endpoint, accepting any of the known list shapes.
    pub async fn get_list<T: DeserializeOwned>(
        &self,
        path: &str,
        names: &[&str],
    ) -> GatewayResult<Vec<T>> {
        self.send(GatewayRequest::get(path)).await?.into_list(names)
    }

    /// POST a JSON body to an object endpoint.
    pub async fn post_object<T, B>(&self, path: &str, body: &B) -> GatewayResult<T>
    where
        T: DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let request = GatewayRequest::post(path).with_json(body)?;
        self.send(request).await?.into_object()
    }
}
