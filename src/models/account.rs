use serde::{Deserialize, Serialize};

/// `GET /account/{did}/mana`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct ManaBalance {
    #[serde(alias = "mana_balance", alias = "mana")]
    pub balance: u64,
}

/// `GET /keys`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountKeys {
    pub did: String,
    #[serde(default)]
    pub public_key_bs58: String,
}

/// `GET /reputation/{did}`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct ReputationScore {
    #[serde(alias = "reputation")]
    pub score: f64,
    #[serde(default)]
    pub frozen: bool,
}

/// The node's own identity and mana, as shown by the account view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountSummary {
    pub did: String,
    pub mana: u64,
}

impl AccountSummary {
    /// Placeholder used when the node cannot report its account.
    pub fn unknown() -> Self {
        Self {
            did: "unknown".to_string(),
            mana: 0,
        }
    }
}
