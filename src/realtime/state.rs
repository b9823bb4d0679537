use chrono::{DateTime, Utc};
use std::fmt;

/// Connection phase of one subscribed resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    /// Not started
    #[default]
    Idle,
    /// First fetch (or the first after `reconnect`) has not settled
    Connecting,
    /// Last applied fetch succeeded
    Connected,
    /// Last applied fetch failed; data may be stale
    Degraded,
    /// Torn down
    Disconnected,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Idle => "idle",
            Phase::Connecting => "connecting",
            Phase::Connected => "connected",
            Phase::Degraded => "degraded",
            Phase::Disconnected => "disconnected",
        };
        write!(f, "{}", s)
    }
}

/// Snapshot of one resource as seen by consumers.
///
/// `data` and `error` are independent: after a failed refresh the last good
/// data is kept alongside the error.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionState<T> {
    pub data: Option<T>,
    /// True while at least one fetch is in flight
    pub is_loading: bool,
    pub error: Option<String>,
    /// True only in [`Phase::Connected`]
    pub is_connected: bool,
    /// Time of the last successful fetch
    pub last_update: Option<DateTime<Utc>>,
    /// Consecutive failures since the last success or reconnect
    pub retry_count: u32,
    pub phase: Phase,
}

impl<T> Default for ConnectionState<T> {
    fn default() -> Self {
        Self {
            data: None,
            is_loading: false,
            error: None,
            is_connected: false,
            last_update: None,
            retry_count: 0,
            phase: Phase::Idle,
        }
    }
}

impl<T> ConnectionState<T> {
    /// The state published before the first fetch settles.
    pub fn connecting() -> Self {
        Self {
            is_loading: true,
            phase: Phase::Connecting,
            ..Self::default()
        }
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// Data is present but the latest refresh failed.
    pub fn is_stale(&self) -> bool {
        self.data.is_some() && self.error.is_some()
    }
}
