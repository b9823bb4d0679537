use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// `GET /info`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct NodeInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub did: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

/// `GET /status`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct NodeStatus {
    #[serde(default)]
    pub is_online: bool,
    #[serde(default)]
    pub peer_count: u64,
    #[serde(default)]
    pub current_block_height: u64,
    #[serde(default)]
    pub version: String,
}

/// `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub details: Option<HashMap<String, Value>>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy") || self.status.eq_ignore_ascii_case("ok")
    }
}
