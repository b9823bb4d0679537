use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::deserialize_nullable_string;

/// A block stored in the node's DAG.
///
/// `data` arrives as a byte array from `/dag/get`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DagBlock {
    pub cid: String,
    #[serde(default)]
    pub data: Vec<u8>,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    pub author_did: String,
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    pub scope: String,
    #[serde(default)]
    pub timestamp: u64,
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    pub signature: String,
}

/// Body of `POST /dag/put`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DagPutRequest {
    /// Base64-encoded payload
    pub data: String,
    pub links: Vec<String>,
    pub author_did: String,
    pub scope: String,
}

impl DagPutRequest {
    /// Build a put request from raw bytes.
    pub fn new(data: &[u8], author_did: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            data: BASE64.encode(data),
            links: Vec::new(),
            author_did: author_did.into(),
            scope: scope.into(),
        }
    }

    pub fn with_links(mut self, links: Vec<String>) -> Self {
        self.links = links;
        self
    }
}

/// `GET /dag/root`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DagRoot {
    #[serde(default)]
    pub root: Option<String>,
}

/// `GET /dag/status`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DagStatus {
    #[serde(default)]
    pub current_root: Option<String>,
    #[serde(default)]
    pub in_sync: bool,
}
