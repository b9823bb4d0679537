use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::deserialize_id;

/// Lifecycle of a mesh job.
///
/// Older nodes also report the bidding phases, so those are accepted too.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum JobStatus {
    #[serde(alias = "pending")]
    Pending,
    #[serde(alias = "bidding")]
    Bidding,
    #[serde(alias = "assigned")]
    Assigned,
    #[serde(alias = "running")]
    Running,
    #[serde(alias = "completed")]
    Completed,
    #[serde(alias = "failed")]
    Failed,
    #[serde(alias = "cancelled")]
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// True once the job can no longer change state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Pending => "Pending",
            JobStatus::Bidding => "Bidding",
            JobStatus::Assigned => "Assigned",
            JobStatus::Running => "Running",
            JobStatus::Completed => "Completed",
            JobStatus::Failed => "Failed",
            JobStatus::Cancelled => "Cancelled",
            JobStatus::Unknown => "Unknown",
        };
        write!(f, "{}", s)
    }
}

/// Output of a finished job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobOutput {
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub exit_code: i32,
}

/// One entry of `GET /mesh/jobs`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeshJob {
    #[serde(deserialize_with = "deserialize_id", alias = "job_id")]
    pub id: String,
    #[serde(default)]
    pub submitter: Option<String>,
    pub status: JobStatus,
    #[serde(default, alias = "created_at")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub executor: Option<String>,
    #[serde(default, alias = "actual_cost")]
    pub cost: Option<u64>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub result: Option<JobOutput>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ResourceRequirements {
    pub cpu_cores: u32,
    pub memory_mb: u64,
    pub storage_mb: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct JobSpecification {
    pub image: String,
    pub command: Vec<String>,
    pub resources: ResourceRequirements,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub environment: HashMap<String, String>,
}

/// Body of `POST /mesh/submit`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmitJobRequest {
    pub job_spec: JobSpecification,
    pub submitter_did: String,
    pub max_cost: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmitJobResponse {
    #[serde(deserialize_with = "deserialize_id")]
    pub job_id: String,
}
