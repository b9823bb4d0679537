//! Aggregate status over several stores.

use chrono::{DateTime, Utc};
use std::fmt;

use super::state::ConnectionState;
use super::store::LiveResource;

/// One-word status for a group of resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverallStatus {
    /// Something is loading and nothing has ever succeeded
    Connecting,
    /// At least one resource reports an error and not all are connected
    Degraded,
    /// Not all resources are connected, none reports an error
    Disconnected,
    Connected,
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OverallStatus::Connecting => "Connecting...",
            OverallStatus::Degraded => "Partial",
            OverallStatus::Disconnected => "Disconnected",
            OverallStatus::Connected => "Connected",
        };
        write!(f, "{}", s)
    }
}

/// Type-erased view of one store's state.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub key: String,
    pub is_loading: bool,
    pub is_connected: bool,
    pub error: Option<String>,
    pub last_update: Option<DateTime<Utc>>,
}

impl StatusSnapshot {
    pub fn of<T>(key: impl Into<String>, state: &ConnectionState<T>) -> Self {
        Self {
            key: key.into(),
            is_loading: state.is_loading,
            is_connected: state.is_connected,
            error: state.error.clone(),
            last_update: state.last_update,
        }
    }
}

impl<T> LiveResource<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn status_snapshot(&self) -> StatusSnapshot {
        StatusSnapshot::of(self.key(), &self.state())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceError {
    pub key: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionSummary {
    pub status: OverallStatus,
    pub errors: Vec<ResourceError>,
    /// Most recent successful update across all resources
    pub last_update: Option<DateTime<Utc>>,
    pub connected: usize,
    pub total: usize,
}

impl ConnectionSummary {
    /// Aggregate `snapshots`. An empty set counts as disconnected.
    pub fn from_snapshots(snapshots: &[StatusSnapshot]) -> Self {
        let total = snapshots.len();
        let connected = snapshots.iter().filter(|s| s.is_connected).count();
        let all_connected = total > 0 && connected == total;
        let any_loading = snapshots.iter().any(|s| s.is_loading);
        let last_update = snapshots.iter().filter_map(|s| s.last_update).max();
        let errors: Vec<ResourceError> = snapshots
            .iter()
            .filter_map(|s| {
                s.error.as_ref().map(|message| ResourceError {
                    key: s.key.clone(),
                    message: message.clone(),
                })
            })
            .collect();

        let status = if any_loading && last_update.is_none() {
            OverallStatus::Connecting
        } else if !errors.is_empty() && !all_connected {
            OverallStatus::Degraded
        } else if !all_connected {
            OverallStatus::Disconnected
        } else {
            OverallStatus::Connected
        };

        Self {
            status,
            errors,
            last_update,
            connected,
            total,
        }
    }
}
