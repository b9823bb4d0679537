//! Live resources over the gateway.
//!
//! A [`LiveResource`] owns one piece of remote state and keeps it fresh,
//! either by polling on an interval or by refetching whenever a push source
//! reports a change. Its scheduling lives in [`Machine`], a pure state
//! machine; the store task only turns the machine's effects into timers,
//! fetches and push subscriptions.
//!
//! [`RealtimeHub`] shares one store per key between any number of
//! subscribers and provides presets for node status, jobs, account and
//! peers.

mod config;
mod hub;
mod machine;
mod registry;
mod state;
mod store;
mod summary;
mod transport;
mod visibility;

pub use config::{RealtimeConfig, DEFAULT_POLLING_INTERVAL};
pub use hub::{RealtimeHub, ACCOUNT_KEY, JOBS_KEY, PEERS_KEY, STATUS_KEY};
pub use machine::{
    Applied, Effect, Event, FetchOrigin, FetchOutcome, FetchTicket, Machine, Step, Transport,
};
pub use registry::{Listener, SubscriberRegistry};
pub use state::{ConnectionState, Phase};
pub use store::{fetcher, FetchFuture, Fetcher, LiveResource, RealtimeContext};
pub use summary::{ConnectionSummary, OverallStatus, ResourceError, StatusSnapshot};
pub use transport::{PushSource, PushSubscription, TransportChoice, TransportSelector};
pub use visibility::{Visibility, VisibilityMonitor};
