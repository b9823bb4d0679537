//! Push-versus-polling selection.

use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::config::RealtimeConfig;
use super::machine::Transport;
use super::registry::Listener;

/// A live push feed for one resource key.
///
/// Yields the payload of every message for the key. Ends when the
/// underlying connection closes.
pub struct PushSubscription {
    rx: mpsc::UnboundedReceiver<Value>,
    closed: CancellationToken,
    _listener: Option<Listener>,
}

impl std::fmt::Debug for PushSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushSubscription")
            .field("closed", &self.closed.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl PushSubscription {
    /// Build a subscription fed by `rx`, ending when `closed` fires.
    ///
    /// `listener` is held for the subscription's lifetime so a registry
    /// holding only a weak reference keeps delivering to it.
    pub fn new(
        rx: mpsc::UnboundedReceiver<Value>,
        closed: CancellationToken,
        listener: Option<Listener>,
    ) -> Self {
        Self {
            rx,
            closed,
            _listener: listener,
        }
    }

    /// Next message, or `None` once the connection is gone.
    pub async fn recv(&mut self) -> Option<Value> {
        tokio::select! {
            biased;
            msg = self.rx.recv() => msg,
            _ = self.closed.cancelled() => None,
        }
    }
}

/// A component able to push change notifications for some resource keys.
pub trait PushSource: Send + Sync {
    /// Whether `key` can be served right now.
    fn supports(&self, key: &str) -> bool;

    /// Open a feed for `key`. `None` means push is unavailable after all.
    fn open(&self, key: &str) -> Option<PushSubscription>;
}

/// Outcome of transport selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportChoice {
    pub uses_push: bool,
}

impl TransportChoice {
    pub fn transport(&self) -> Transport {
        if self.uses_push {
            Transport::Push
        } else {
            Transport::Polling
        }
    }
}

/// Decides per resource whether to push or poll.
#[derive(Clone, Default)]
pub struct TransportSelector {
    push: Option<Arc<dyn PushSource>>,
}

impl std::fmt::Debug for TransportSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportSelector")
            .field("has_push_source", &self.push.is_some())
            .finish()
    }
}

impl TransportSelector {
    pub fn new(push: Option<Arc<dyn PushSource>>) -> Self {
        Self { push }
    }

    /// A selector that always polls.
    pub fn polling_only() -> Self {
        Self { push: None }
    }

    /// Choose a transport for `key`. Never fails; anything short of a
    /// supported push source means polling.
    pub fn select(&self, key: &str, config: &RealtimeConfig) -> TransportChoice {
        if !config.enable_sse {
            tracing::debug!(key, "Push disabled by config, polling");
            return TransportChoice { uses_push: false };
        }
        match self.push {
            Some(ref source) if source.supports(key) => TransportChoice { uses_push: true },
            Some(_) => {
                tracing::debug!(key, "Push source does not serve this key, polling");
                TransportChoice { uses_push: false }
            }
            None => {
                tracing::debug!(key, "No push source installed, polling");
                TransportChoice { uses_push: false }
            }
        }
    }

    /// Open the push feed for `key`, if a source is installed.
    pub fn open(&self, key: &str) -> Option<PushSubscription> {
        self.push.as_ref().and_then(|source| source.open(key))
    }
}
