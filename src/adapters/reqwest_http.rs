//! Reqwest-based HTTP client adapter.
//!
//! Production implementation of [`HttpClient`].

use async_trait::async_trait;
use futures_util::StreamExt;

use crate::traits::{ByteStream, Headers, HttpClient, Response, TransportError};

/// HTTP client implementation using reqwest.
///
/// No client-level timeout is configured here; the gateway applies its own
/// per-request deadline so it can tell a timeout apart from other failures.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Create a new ReqwestHttpClient with default settings.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Wrap a preconfigured reqwest::Client (custom TLS, proxies, pools).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Get a reference to the underlying reqwest::Client.
    pub fn inner(&self) -> &reqwest::Client {
        &self.client
    }

    /// Convert reqwest error to TransportError.
    fn convert_error(err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            return TransportError::Timeout(err.to_string());
        }
        if err.is_builder() {
            return TransportError::InvalidUrl(err.to_string());
        }
        let text = err.to_string();
        let chain = format!("{:?}", err).to_lowercase();
        if chain.contains("dns") || chain.contains("failed to lookup") {
            TransportError::Dns(text)
        } else if err.is_connect() {
            TransportError::ConnectionFailed(text)
        } else if err.is_body() || err.is_decode() {
            TransportError::Io(text)
        } else {
            TransportError::Other(text)
        }
    }

    /// Convert reqwest headers to our Headers type.
    fn convert_headers(headers: &reqwest::header::HeaderMap) -> Headers {
        headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect()
    }

    /// Apply headers to a request builder.
    fn apply_headers(
        builder: reqwest::RequestBuilder,
        headers: &Headers,
    ) -> reqwest::RequestBuilder {
        headers
            .iter()
            .fold(builder, |builder, (key, value)| builder.header(key, value))
    }

    async fn into_response(response: reqwest::Response) -> Result<Response, TransportError> {
        let status = response.status().as_u16();
        let headers = Self::convert_headers(response.headers());
        let body = response.bytes().await.map_err(Self::convert_error)?;
        Ok(Response::with_headers(status, headers, body))
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str, headers: &Headers) -> Result<Response, TransportError> {
        let builder = Self::apply_headers(self.client.get(url), headers);
        let response = builder.send().await.map_err(Self::convert_error)?;
        Self::into_response(response).await
    }

    async fn post(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
    ) -> Result<Response, TransportError> {
        let builder = Self::apply_headers(self.client.post(url).body(body.to_string()), headers);
        let response = builder.send().await.map_err(Self::convert_error)?;
        Self::into_response(response).await
    }

    async fn get_stream(&self, url: &str, headers: &Headers) -> Result<ByteStream, TransportError> {
        let builder = Self::apply_headers(self.client.get(url), headers);
        let response = builder.send().await.map_err(Self::convert_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TransportError::Other(format!("HTTP {}: {}", status, message)));
        }

        let stream = response.bytes_stream().map(|result| {
            result.map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(e.to_string())
                } else {
                    TransportError::Io(e.to_string())
                }
            })
        });

        Ok(Box::pin(stream))
    }
}
