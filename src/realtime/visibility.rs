use std::sync::Arc;
use tokio::sync::watch;

/// Whether the consumer is currently showing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Visible,
    Hidden,
}

impl Visibility {
    pub fn is_visible(&self) -> bool {
        matches!(self, Visibility::Visible)
    }
}

/// Process-wide visible/hidden signal.
///
/// Every store observes the same monitor. Hidden pauses the poll timers;
/// fetches already in flight complete normally.
#[derive(Debug, Clone)]
pub struct VisibilityMonitor {
    tx: Arc<watch::Sender<Visibility>>,
}

impl Default for VisibilityMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl VisibilityMonitor {
    /// Create a monitor that starts visible.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Visibility::Visible);
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> Visibility {
        *self.tx.borrow()
    }

    pub fn set(&self, visibility: Visibility) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == visibility {
                false
            } else {
                *current = visibility;
                true
            }
        });
        if changed {
            tracing::debug!("Visibility changed to {:?}", visibility);
        }
    }

    pub fn hide(&self) {
        self.set(Visibility::Hidden);
    }

    pub fn show(&self) {
        self.set(Visibility::Visible);
    }

    pub fn subscribe(&self) -> watch::Receiver<Visibility> {
        self.tx.subscribe()
    }
}
