//! Authentication material attached to every gateway request.

use crate::traits::Headers;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// API key and bearer token owned by one [`GatewayClient`](super::GatewayClient).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: Option<String>,
    pub bearer_token: Option<String>,
}

impl Credentials {
    /// True when neither credential is set.
    pub fn is_empty(&self) -> bool {
        self.api_key.is_none() && self.bearer_token.is_none()
    }

    /// Write the configured auth headers into `headers`.
    pub fn apply(&self, headers: &mut Headers) {
        if let Some(ref key) = self.api_key {
            headers.insert(API_KEY_HEADER.to_string(), key.clone());
        }
        if let Some(ref token) = self.bearer_token {
            headers.insert("Authorization".to_string(), format!("Bearer {}", token));
        }
    }
}
