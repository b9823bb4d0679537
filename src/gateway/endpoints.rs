use serde_json::{json, Value};

use super::{GatewayClient, GatewayRequest};
use crate::error::GatewayResult;
use crate::models::{
    AccountKeys, AccountSummary, CastVoteRequest, DagBlock, DagPutRequest, DagRoot, DagStatus,
    DelegateRequest, FederationPeerRequest, FederationStatus, HealthStatus, LocalPeerId,
    ManaBalance, MeshJob, NodeInfo, NodeStatus, Proposal, ReputationScore,
    RevokeDelegationRequest, SubmitJobRequest, SubmitJobResponse, SubmitProposalRequest,
};

fn segment(raw: &str) -> String {
    urlencoding::encode(raw).into_owned()
}

/// Pull an identifier out of a response that is either a bare string or an
/// object carrying one of `keys`.
fn extract_id(value: Value, keys: &[&str]) -> String {
    match value {
        Value::String(s) => s,
        Value::Object(ref map) => keys
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string()),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl GatewayClient {
    // System

    pub async fn node_info(&self) -> GatewayResult<NodeInfo> {
        self.get_object("/info").await
    }

    pub async fn node_status(&self) -> GatewayResult<NodeStatus> {
        self.get_object("/status").await
    }

    pub async fn health(&self) -> GatewayResult<HealthStatus> {
        self.get_object("/health").await
    }

    /// Prometheus text from `/metrics`.
    pub async fn metrics(&self) -> GatewayResult<String> {
        let raw = self.send(GatewayRequest::get("/metrics")).await?;
        Ok(match raw.payload.into_value() {
            Value::String(text) => text,
            Value::Null => String::new(),
            other => other.to_string(),
        })
    }

    // Mesh

    pub async fn list_jobs(&self) -> GatewayResult<Vec<MeshJob>> {
        self.get_list("/mesh/jobs", &["jobs"]).await
    }

    pub async fn get_job(&self, job_id: &str) -> GatewayResult<MeshJob> {
        self.get_object(&format!("/mesh/jobs/{}", segment(job_id)))
            .await
    }

    pub async fn submit_job(&self, request: &SubmitJobRequest) -> GatewayResult<SubmitJobResponse> {
        self.post_object("/mesh/submit", request).await
    }

    /// Submit through the collection route `POST /mesh/jobs`.
    pub async fn create_job(&self, request: &SubmitJobRequest) -> GatewayResult<SubmitJobResponse> {
        self.post_object("/mesh/jobs", request).await
    }

    // Account and identity

    pub async fn keys(&self) -> GatewayResult<AccountKeys> {
        self.get_object("/keys").await
    }

    pub async fn account_mana(&self, did: &str) -> GatewayResult<ManaBalance> {
        self.get_object(&format!("/account/{}/mana", segment(did)))
            .await
    }

    pub async fn reputation(&self, did: &str) -> GatewayResult<ReputationScore> {
        self.get_object(&format!("/reputation/{}", segment(did)))
            .await
    }

    /// The node's own DID and mana balance.
    pub async fn account_summary(&self) -> GatewayResult<AccountSummary> {
        let keys = self.keys().await?;
        let mana = self.account_mana(&keys.did).await?;
        Ok(AccountSummary {
            did: keys.did,
            mana: mana.balance,
        })
    }

    // Governance

    /// Returns the new proposal id.
    pub async fn submit_proposal(&self, request: &SubmitProposalRequest) -> GatewayResult<String> {
        let value: Value = self.post_object("/governance/submit", request).await?;
        Ok(extract_id(value, &["proposal_id", "id"]))
    }

    pub async fn cast_vote(&self, request: &CastVoteRequest) -> GatewayResult<String> {
        let value: Value = self.post_object("/governance/vote", request).await?;
        Ok(extract_id(value, &["message", "status"]))
    }

    pub async fn list_proposals(&self) -> GatewayResult<Vec<Proposal>> {
        self.get_list("/governance/proposals", &["proposals"]).await
    }

    pub async fn get_proposal(&self, proposal_id: &str) -> GatewayResult<Proposal> {
        self.get_object(&format!("/governance/proposal/{}", segment(proposal_id)))
            .await
    }

    pub async fn delegate(&self, request: &DelegateRequest) -> GatewayResult<String> {
        let value: Value = self.post_object("/governance/delegate", request).await?;
        Ok(extract_id(value, &["message", "status"]))
    }

    pub async fn revoke_delegation(&self, request: &RevokeDelegationRequest) -> GatewayResult<String> {
        let value: Value = self.post_object("/governance/revoke", request).await?;
        Ok(extract_id(value, &["message", "status"]))
    }

    // DAG

    /// Store a block and return its CID.
    pub async fn dag_put(&self, request: &DagPutRequest) -> GatewayResult<String> {
        let value: Value = self.post_object("/dag/put", request).await?;
        Ok(extract_id(value, &["cid"]))
    }

    /// Fetch a block; `None` when the node does not have it.
    pub async fn dag_get(&self, cid: &str) -> GatewayResult<Option<DagBlock>> {
        self.post_object("/dag/get", &json!({ "cid": cid })).await
    }

    pub async fn dag_root(&self) -> GatewayResult<DagRoot> {
        self.get_object("/dag/root").await
    }

    pub async fn dag_status(&self) -> GatewayResult<DagStatus> {
        self.get_object("/dag/status").await
    }

    // Network and federation

    pub async fn network_peers(&self) -> GatewayResult<Vec<String>> {
        self.get_list("/network/peers", &["peers"]).await
    }

    pub async fn local_peer_id(&self) -> GatewayResult<LocalPeerId> {
        self.get_object("/network/local-peer-id").await
    }

    pub async fn federation_peers(&self) -> GatewayResult<Vec<String>> {
        self.get_list("/federation/peers", &["peers"]).await
    }

    pub async fn federation_status(&self) -> GatewayResult<FederationStatus> {
        self.get_object("/federation/status").await
    }

    pub async fn join_federation(&self, peer: &str) -> GatewayResult<()> {
        let request = FederationPeerRequest {
            peer: peer.to_string(),
        };
        let _: Value = self.post_object("/federation/join", &request).await?;
        Ok(())
    }

    pub async fn leave_federation(&self, peer: &str) -> GatewayResult<()> {
        let request = FederationPeerRequest {
            peer: peer.to_string(),
        };
        let _: Value = self.post_object("/federation/leave", &request).await?;
        Ok(())
    }
}
