//! icn-realtime - live data from an ICN node.
//!
//! - [`gateway`]: typed HTTP client for the node API with tolerant response
//!   decoding
//! - [`realtime`]: self-refreshing resources over polling or push
//! - [`sse`]: event-stream parsing and an SSE push source
//!
//! The HTTP transport sits behind [`traits::HttpClient`] so tests can swap
//! in [`adapters::MockHttpClient`].

pub mod adapters;
pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod realtime;
pub mod sse;
pub mod traits;

pub use config::GatewayConfig;
pub use error::{GatewayError, GatewayResult};
pub use gateway::GatewayClient;
pub use realtime::{LiveResource, RealtimeConfig, RealtimeHub};
