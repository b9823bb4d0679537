//! Shared stores keyed by resource name, plus the standard presets.

use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

use super::config::RealtimeConfig;
use super::store::{fetcher, Fetcher, Inner, LiveResource, RealtimeContext};
use super::summary::{ConnectionSummary, StatusSnapshot};
use super::transport::{PushSource, TransportSelector};
use super::visibility::VisibilityMonitor;
use crate::config::GatewayConfig;
use crate::gateway::GatewayClient;
use crate::models::{AccountSummary, MeshJob, NodeStatus};

pub const STATUS_KEY: &str = "status";
pub const JOBS_KEY: &str = "jobs";
pub const ACCOUNT_KEY: &str = "account";
pub const PEERS_KEY: &str = "peers";

struct Entry {
    store: Box<dyn Any + Send + Sync>,
    snapshot: Box<dyn Fn() -> Option<StatusSnapshot> + Send + Sync>,
}

/// Owns the gateway client and hands out one shared store per key.
///
/// The first subscriber to a key decides its fetcher and config; later
/// subscribers get the same store. A store lives until its last handle is
/// dropped.
pub struct RealtimeHub {
    client: Arc<GatewayClient>,
    context: RealtimeContext,
    enable_sse: bool,
    stores: Mutex<HashMap<String, Entry>>,
}

impl std::fmt::Debug for RealtimeHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeHub")
            .field("client", &self.client)
            .field("context", &self.context)
            .field("enable_sse", &self.enable_sse)
            .finish_non_exhaustive()
    }
}

impl RealtimeHub {
    /// A polling-only hub over `client`.
    pub fn new(client: Arc<GatewayClient>) -> Self {
        Self {
            client,
            context: RealtimeContext::default(),
            enable_sse: true,
            stores: Mutex::new(HashMap::new()),
        }
    }

    /// Build the client from `config` and honour its `enable_sse`.
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(Arc::new(GatewayClient::new(config))).with_enable_sse(config.enable_sse)
    }

    pub fn with_push_source(mut self, source: Arc<dyn PushSource>) -> Self {
        self.context.selector = TransportSelector::new(Some(source));
        self
    }

    pub fn with_visibility(mut self, visibility: VisibilityMonitor) -> Self {
        self.context.visibility = visibility;
        self
    }

    /// Whether presets try push first.
    pub fn with_enable_sse(mut self, enable: bool) -> Self {
        self.enable_sse = enable;
        self
    }

    pub fn client(&self) -> &Arc<GatewayClient> {
        &self.client
    }

    pub fn visibility(&self) -> &VisibilityMonitor {
        &self.context.visibility
    }

    pub fn context(&self) -> &RealtimeContext {
        &self.context
    }

    /// The shared store for `key`, started with `fetcher` if none is live.
    ///
    /// If a live store already holds `key` with another payload type it
    /// keeps the key, and the caller gets a private store the hub does not
    /// track or share.
    pub fn resource<T>(
        &self,
        key: &str,
        fetcher: Fetcher<T>,
        config: RealtimeConfig,
    ) -> LiveResource<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let mut stores = self.stores.lock();

        if let Some(entry) = stores.get(key) {
            match entry.store.downcast_ref::<Weak<Inner<T>>>() {
                Some(weak) => {
                    if let Some(existing) = LiveResource::upgrade(weak) {
                        return existing;
                    }
                }
                None if (entry.snapshot)().is_some() => {
                    tracing::warn!(
                        key,
                        "Resource key already holds a different payload type; starting an untracked store"
                    );
                    return LiveResource::spawn(key, fetcher, config, &self.context);
                }
                None => {}
            }
        }

        let resource = LiveResource::spawn(key, fetcher, config, &self.context);
        let weak = resource.downgrade();
        let snapshot_weak = weak.clone();
        let snapshot_key = key.to_string();
        stores.insert(
            key.to_string(),
            Entry {
                store: Box::new(weak),
                snapshot: Box::new(move || {
                    LiveResource::upgrade(&snapshot_weak)
                        .map(|r| StatusSnapshot::of(snapshot_key.clone(), &r.state()))
                }),
            },
        );
        tracing::debug!(key, "Created shared realtime store");
        resource
    }

    /// Keys with a live store. Dead entries are pruned.
    pub fn active_keys(&self) -> Vec<String> {
        let mut stores = self.stores.lock();
        stores.retain(|_, entry| (entry.snapshot)().is_some());
        let mut keys: Vec<String> = stores.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Aggregate status over every live store.
    pub fn summary(&self) -> ConnectionSummary {
        let snapshots: Vec<StatusSnapshot> = {
            let stores = self.stores.lock();
            let mut snapshots: Vec<_> = stores.values().filter_map(|e| (e.snapshot)()).collect();
            snapshots.sort_by(|a, b| a.key.cmp(&b.key));
            snapshots
        };
        ConnectionSummary::from_snapshots(&snapshots)
    }

    fn preset(&self, config: RealtimeConfig) -> RealtimeConfig {
        config.with_enable_sse(self.enable_sse)
    }

    /// `GET /status` every 5s.
    pub fn node_status(&self) -> LiveResource<NodeStatus> {
        let client = Arc::clone(&self.client);
        self.resource(
            STATUS_KEY,
            fetcher(move || {
                let client = Arc::clone(&client);
                async move { client.node_status().await }
            }),
            self.preset(RealtimeConfig::node_status()),
        )
    }

    /// `GET /mesh/jobs` every 3s.
    pub fn jobs(&self) -> LiveResource<Vec<MeshJob>> {
        let client = Arc::clone(&self.client);
        self.resource(
            JOBS_KEY,
            fetcher(move || {
                let client = Arc::clone(&client);
                async move { client.list_jobs().await }
            }),
            self.preset(RealtimeConfig::jobs()),
        )
    }

    /// The node's DID and mana every 10s. Falls back to
    /// [`AccountSummary::unknown`] when the node cannot answer.
    pub fn account(&self) -> LiveResource<AccountSummary> {
        let client = Arc::clone(&self.client);
        self.resource(
            ACCOUNT_KEY,
            fetcher(move || {
                let client = Arc::clone(&client);
                async move {
                    match client.account_summary().await {
                        Ok(summary) => Ok::<_, String>(summary),
                        Err(e) => {
                            tracing::warn!("Account info unavailable, using fallback: {}", e);
                            Ok(AccountSummary::unknown())
                        }
                    }
                }
            }),
            self.preset(RealtimeConfig::account()),
        )
    }

    /// `GET /network/peers` every 15s. Falls back to an empty list.
    pub fn peers(&self) -> LiveResource<Vec<String>> {
        let client = Arc::clone(&self.client);
        self.resource(
            PEERS_KEY,
            fetcher(move || {
                let client = Arc::clone(&client);
                async move {
                    match client.network_peers().await {
                        Ok(peers) => Ok::<_, String>(peers),
                        Err(e) => {
                            tracing::warn!("Network peers unavailable, using fallback: {}", e);
                            Ok(Vec::new())
                        }
                    }
                }
            }),
            self.preset(RealtimeConfig::peers()),
        )
    }
}
