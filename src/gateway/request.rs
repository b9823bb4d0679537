//! Request description passed to [`GatewayClient::send`](super::GatewayClient::send).

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use tokio_util::sync::CancellationToken;

use crate::error::{GatewayError, GatewayResult};

/// HTTP methods the node API uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

/// One call against the node API.
///
/// The client's configured timeout always applies; `cancel` lets the caller
/// abort earlier, which surfaces as a network error.
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub cancel: Option<CancellationToken>,
}

impl GatewayRequest {
    /// A GET request for `path`.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
            cancel: None,
        }
    }

    /// A POST request for `path` without a body.
    pub fn post(path: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: None,
            cancel: None,
        }
    }

    /// Attach a JSON body.
    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> GatewayResult<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| GatewayError::encode(format!("Failed to encode request body: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Attach a caller-owned cancellation token.
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_has_no_body() {
        let req = GatewayRequest::get("/status");
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.path, "/status");
        assert!(req.body.is_none());
        assert!(req.cancel.is_none());
    }

    #[test]
    fn test_post_with_json_body() {
        let req = GatewayRequest::post("/dag/get")
            .with_json(&serde_json::json!({"cid": "bafy"}))
            .unwrap();
        assert_eq!(req.method.to_string(), "POST");
        assert_eq!(req.body, Some(serde_json::json!({"cid": "bafy"})));
    }

    #[test]
    fn test_unserializable_body_is_encode_error() {
        use crate::error::GatewayErrorKind;
        use std::collections::HashMap;

        let mut body = HashMap::new();
        body.insert((1u8, 2u8), "tuple keys are not valid JSON object keys");
        let err = GatewayRequest::post("/dag/put").with_json(&body).unwrap_err();
        assert_eq!(err.kind, GatewayErrorKind::Encode);
        assert_eq!(err.status_code, 0);
        assert!(err.message.starts_with("Failed to encode request body"));
    }
}
