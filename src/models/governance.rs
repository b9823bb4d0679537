use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::deserialize_id;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum VoteOption {
    Yes,
    No,
    Abstain,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ProposalStatus {
    Draft,
    #[serde(alias = "Voting")]
    Open,
    #[serde(alias = "Passed", alias = "Rejected", alias = "Expired")]
    Closed,
    Executed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ProposalTally {
    #[serde(default)]
    pub yes: u64,
    #[serde(default)]
    pub no: u64,
    #[serde(default)]
    pub abstain: u64,
}

impl ProposalTally {
    pub fn total(&self) -> u64 {
        self.yes + self.no + self.abstain
    }
}

/// A governance proposal. `proposal_type` is kept as raw JSON since its
/// variants change between node releases.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Proposal {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub proposer: String,
    #[serde(default)]
    pub proposal_type: Value,
    #[serde(default)]
    pub description: String,
    pub status: ProposalStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "voting_period_end")]
    pub voting_deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub votes: ProposalTally,
    #[serde(default)]
    pub quorum: Option<u64>,
    #[serde(default)]
    pub threshold: Option<f64>,
}

/// Body of `POST /governance/submit`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmitProposalRequest {
    pub proposer_did: String,
    pub proposal: Value,
    pub description: String,
    pub duration_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quorum: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

/// Body of `POST /governance/vote`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CastVoteRequest {
    pub voter_did: String,
    pub proposal_id: String,
    pub vote_option: VoteOption,
}

/// Body of `POST /governance/delegate`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DelegateRequest {
    pub from_did: String,
    pub to_did: String,
}

/// Body of `POST /governance/revoke`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RevokeDelegationRequest {
    pub from_did: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proposal_with_legacy_status() {
        let proposal: Proposal = serde_json::from_str(
            r#"{"id":"p1","status":"Voting","votes":{"yes":3,"no":1},
                "proposal_type":{"type":"GenericText","data":{"text":"hi"}}}"#,
        )
        .unwrap();
        assert_eq!(proposal.status, ProposalStatus::Open);
        assert_eq!(proposal.votes.total(), 4);
        assert_eq!(proposal.proposal_type["type"], "GenericText");
    }

    #[test]
    fn test_vote_serializes_option() {
        let vote = CastVoteRequest {
            voter_did: "did:key:a".to_string(),
            proposal_id: "p1".to_string(),
            vote_option: VoteOption::Abstain,
        };
        let value = serde_json::to_value(&vote).unwrap();
        assert_eq!(value["vote_option"], "Abstain");
    }
}
