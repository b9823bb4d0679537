use std::time::Duration;

/// Polling interval used when none is given.
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(10);

/// Per-subscription settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RealtimeConfig {
    /// Try the push transport before falling back to polling
    pub enable_sse: bool,
    /// Delay between the end of one fetch and the start of the next
    pub polling_interval: Duration,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            enable_sse: true,
            polling_interval: DEFAULT_POLLING_INTERVAL,
        }
    }
}

impl RealtimeConfig {
    pub fn new(polling_interval: Duration) -> Self {
        Self {
            polling_interval,
            ..Self::default()
        }
    }

    pub fn with_polling_interval(mut self, interval: Duration) -> Self {
        self.polling_interval = interval;
        self
    }

    pub fn with_enable_sse(mut self, enable: bool) -> Self {
        self.enable_sse = enable;
        self
    }

    /// Node status: every 5s.
    pub fn node_status() -> Self {
        Self::new(Duration::from_secs(5))
    }

    /// Job list: every 3s.
    pub fn jobs() -> Self {
        Self::new(Duration::from_secs(3))
    }

    /// Account and mana: every 10s.
    pub fn account() -> Self {
        Self::new(Duration::from_secs(10))
    }

    /// Peer list: every 15s.
    pub fn peers() -> Self {
        Self::new(Duration::from_secs(15))
    }
}
