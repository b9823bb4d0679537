//! Push source backed by a `text/event-stream` endpoint.

use futures::StreamExt;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::parser::{LineBuffer, SseFrame, SseParser};
use crate::gateway::GatewayClient;
use crate::realtime::{Listener, PushSource, PushSubscription, SubscriberRegistry};
use crate::traits::{Headers, HttpClient, TransportError};

/// Path of the event stream relative to the gateway base URL.
pub const EVENTS_PATH: &str = "/events";

/// One shared SSE connection fanned out to per-key subscriptions.
///
/// Frames with an `event:` field are routed by that name. Frames without one
/// must carry a `{type, data}` JSON envelope. Once the stream ends the source
/// stops advertising keys and every open subscription finishes.
pub struct SsePushSource {
    registry: Arc<SubscriberRegistry>,
    keys: HashSet<String>,
    closed: CancellationToken,
}

impl std::fmt::Debug for SsePushSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SsePushSource")
            .field("keys", &self.keys)
            .field("closed", &self.closed.is_cancelled())
            .finish()
    }
}

impl SsePushSource {
    /// Open `GET {base}/events` on `client` and serve `keys` from it.
    ///
    /// Must be called inside a tokio runtime; the reader runs as a spawned
    /// task.
    pub fn connect<I, K>(client: &GatewayClient, keys: I) -> Arc<Self>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let source = Arc::new(Self {
            registry: Arc::new(SubscriberRegistry::new()),
            keys: keys.into_iter().map(Into::into).collect(),
            closed: CancellationToken::new(),
        });

        let mut headers = client.headers();
        headers.insert("Accept".to_string(), "text/event-stream".to_string());
        let url = client.url(EVENTS_PATH);
        tracing::info!(url = %url, keys = ?source.keys, "Opening event stream");

        tokio::spawn(read_events(
            client.http(),
            url,
            headers,
            Arc::clone(&source.registry),
            source.closed.clone(),
        ));
        source
    }

    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    /// Whether the underlying stream has ended.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Stop reading. Open subscriptions finish.
    pub fn close(&self) {
        self.closed.cancel();
    }
}

impl Drop for SsePushSource {
    fn drop(&mut self) {
        self.closed.cancel();
    }
}

impl PushSource for SsePushSource {
    fn supports(&self, key: &str) -> bool {
        !self.closed.is_cancelled() && self.keys.contains(key)
    }

    fn open(&self, key: &str) -> Option<PushSubscription> {
        if !self.supports(key) {
            return None;
        }
        let (tx, rx) = mpsc::unbounded_channel();
        let listener: Listener = Arc::new(move |data: &Value| {
            let _ = tx.send(data.clone());
        });
        self.registry.subscribe(key, &listener);
        Some(PushSubscription::new(rx, self.closed.clone(), Some(listener)))
    }
}

async fn read_events(
    http: Arc<dyn HttpClient>,
    url: String,
    headers: Headers,
    registry: Arc<SubscriberRegistry>,
    closed: CancellationToken,
) {
    let result = tokio::select! {
        _ = closed.cancelled() => return,
        result = pump(http.as_ref(), &url, &headers, &registry) => result,
    };
    match result {
        Ok(()) => tracing::warn!("Event stream ended"),
        Err(e) => tracing::warn!("Event stream failed: {}", e),
    }
    closed.cancel();
}

async fn pump(
    http: &dyn HttpClient,
    url: &str,
    headers: &Headers,
    registry: &SubscriberRegistry,
) -> Result<(), TransportError> {
    let mut stream = http.get_stream(url, headers).await?;
    let mut lines = LineBuffer::new();
    let mut parser = SseParser::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        for line in lines.push(&chunk) {
            if let Some(frame) = parser.feed_line(&line) {
                deliver(registry, frame);
            }
        }
    }
    Ok(())
}

fn deliver(registry: &SubscriberRegistry, frame: SseFrame) -> usize {
    match frame.event {
        Some(ref event) => {
            let data = serde_json::from_str(&frame.data)
                .unwrap_or_else(|_| Value::String(frame.data.clone()));
            registry.dispatch_event(event, &data)
        }
        None => registry.dispatch(&frame.data),
    }
}
