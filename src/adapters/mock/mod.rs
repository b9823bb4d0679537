//! Mock implementations for testing.
//!
//! - [`MockHttpClient`] - HTTP client with scripted responses

pub mod http;

pub use http::{MockHttpClient, MockResponse, RecordedRequest};
