//! Event-type to listener routing for a shared push connection.
//!
//! The registry never owns a listener: it keeps [`Weak`] references and the
//! subscriber keeps the [`Arc`]. Dropping the `Arc` is enough to stop
//! delivery; dead entries are pruned on the next dispatch.

use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// Callback invoked with the `data` field of a matching message.
pub type Listener = Arc<dyn Fn(&Value) + Send + Sync>;

type WeakListener = Weak<dyn Fn(&Value) + Send + Sync>;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: Value,
}

#[derive(Default)]
pub struct SubscriberRegistry {
    listeners: Mutex<HashMap<String, Vec<WeakListener>>>,
}

impl std::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = self.listeners.lock();
        let mut types: Vec<_> = listeners.keys().collect();
        types.sort();
        f.debug_struct("SubscriberRegistry")
            .field("event_types", &types)
            .finish()
    }
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for `event_type`. Registering the same listener
    /// twice has no effect.
    pub fn subscribe(&self, event_type: &str, listener: &Listener) {
        let weak = Arc::downgrade(listener);
        let mut listeners = self.listeners.lock();
        let entry = listeners.entry(event_type.to_string()).or_default();
        if !entry.iter().any(|existing| Weak::ptr_eq(existing, &weak)) {
            entry.push(weak);
        }
    }

    /// Remove `listener` from `event_type`. Unknown pairs are ignored.
    pub fn unsubscribe(&self, event_type: &str, listener: &Listener) {
        let weak = Arc::downgrade(listener);
        let mut listeners = self.listeners.lock();
        if let Some(entry) = listeners.get_mut(event_type) {
            entry.retain(|existing| !Weak::ptr_eq(existing, &weak));
            if entry.is_empty() {
                listeners.remove(event_type);
            }
        }
    }

    /// Number of live listeners for `event_type`.
    pub fn listener_count(&self, event_type: &str) -> usize {
        self.listeners
            .lock()
            .get(event_type)
            .map(|entry| entry.iter().filter(|w| w.strong_count() > 0).count())
            .unwrap_or(0)
    }

    /// Decode a raw `{type, data}` message and deliver it.
    ///
    /// Undecodable messages are dropped with a warning. Returns the number of
    /// listeners invoked.
    pub fn dispatch(&self, raw: &str) -> usize {
        match serde_json::from_str::<Envelope>(raw) {
            Ok(envelope) => self.dispatch_event(&envelope.event_type, &envelope.data),
            Err(e) => {
                tracing::warn!("Dropping undecodable push message: {}", e);
                0
            }
        }
    }

    /// Deliver `data` to every live listener of `event_type`, in
    /// registration order.
    pub fn dispatch_event(&self, event_type: &str, data: &Value) -> usize {
        // Upgrade under the lock, call outside it so listeners may
        // re-enter the registry.
        let live: Vec<Listener> = {
            let mut listeners = self.listeners.lock();
            let Some(entry) = listeners.get_mut(event_type) else {
                return 0;
            };
            entry.retain(|w| w.strong_count() > 0);
            let live = entry.iter().filter_map(Weak::upgrade).collect();
            if entry.is_empty() {
                listeners.remove(event_type);
            }
            live
        };

        for listener in &live {
            listener(data);
        }
        live.len()
    }
}
