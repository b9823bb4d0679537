use serde::{Deserialize, Serialize};

/// `GET /network/local-peer-id`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocalPeerId {
    pub peer_id: String,
}

/// `GET /federation/status`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct FederationStatus {
    #[serde(default)]
    pub peer_count: u64,
    #[serde(default)]
    pub peers: Vec<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Body of `POST /federation/join` and `POST /federation/leave`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FederationPeerRequest {
    pub peer: String,
}
