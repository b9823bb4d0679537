//! Typed payloads returned by the node API.
//!
//! Unknown fields are ignored everywhere so newer nodes keep decoding.

mod account;
mod dag;
mod governance;
mod mesh;
mod network;
mod node;
pub mod util;

pub use account::{AccountKeys, AccountSummary, ManaBalance, ReputationScore};
pub use dag::{DagBlock, DagPutRequest, DagRoot, DagStatus};
pub use governance::{
    CastVoteRequest, DelegateRequest, Proposal, ProposalStatus, ProposalTally,
    RevokeDelegationRequest, SubmitProposalRequest, VoteOption,
};
pub use mesh::{
    JobOutput, JobSpecification, JobStatus, MeshJob, ResourceRequirements, SubmitJobRequest,
    SubmitJobResponse,
};
pub use network::{FederationPeerRequest, FederationStatus, LocalPeerId};
pub use node::{HealthStatus, NodeInfo, NodeStatus};

use serde::{Deserialize, Deserializer};

/// Helper to deserialize an id sent as either string or integer
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    use std::fmt;

    struct IdVisitor;

    impl<'de> Visitor<'de> for IdVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or integer")
        }

        fn visit_str<E>(self, value: &str) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_string<E>(self, value: String) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(value)
        }

        fn visit_i64<E>(self, value: i64) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_u64<E>(self, value: u64) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }
    }

    deserializer.deserialize_any(IdVisitor)
}

/// Helper to deserialize nullable strings as empty string
pub(crate) fn deserialize_nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(|opt| opt.unwrap_or_default())
}
