//! Push-driven refresh: an SSE source feeding live resources, with fallback
//! to polling when the stream ends.

use bytes::Bytes;
use icn_realtime::adapters::{MockHttpClient, MockResponse};
use icn_realtime::config::GatewayConfig;
use icn_realtime::gateway::GatewayClient;
use icn_realtime::models::JobStatus;
use icn_realtime::realtime::{Listener, PushSource, RealtimeHub, SubscriberRegistry, JOBS_KEY};
use icn_realtime::sse::SsePushSource;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

fn client(mock: &MockHttpClient) -> Arc<GatewayClient> {
    Arc::new(GatewayClient::with_http_client(
        &GatewayConfig::new("http://node"),
        Arc::new(mock.clone()),
    ))
}

fn job_list(status: &str) -> MockResponse {
    MockResponse::json(200, json!([{"id": "job-1", "status": status}]))
}

#[tokio::test(start_paused = true)]
async fn test_push_message_triggers_refetch_then_falls_back_to_polling() {
    let mock = MockHttpClient::new();
    mock.set_response(
        "http://node/events",
        MockResponse::Delayed(
            Duration::from_secs(1),
            Box::new(MockResponse::Stream(vec![Bytes::from(
                "event: jobs\ndata: {\"id\":\"job-1\"}\n\n",
            )])),
        ),
    );
    mock.push_response("http://node/mesh/jobs", job_list("Pending"));
    mock.push_response("http://node/mesh/jobs", job_list("Running"));
    mock.push_response("http://node/mesh/jobs", job_list("Completed"));

    let client = client(&mock);
    let source = SsePushSource::connect(&client, [JOBS_KEY]);
    let hub = RealtimeHub::new(Arc::clone(&client)).with_push_source(source.clone());
    let started = Instant::now();

    let jobs = hub.jobs();
    let has = |status: JobStatus| {
        move |s: &icn_realtime::realtime::ConnectionState<Vec<icn_realtime::models::MeshJob>>| {
            s.data.as_ref().map_or(false, |j| j[0].status == status)
        }
    };

    jobs.wait_for(has(JobStatus::Pending)).await.unwrap();
    assert_eq!(started.elapsed(), Duration::ZERO);

    jobs.wait_for(has(JobStatus::Running)).await.unwrap();
    assert_eq!(started.elapsed(), Duration::from_secs(1));

    // Stream ended; polling takes over on the jobs interval.
    jobs.wait_for(has(JobStatus::Completed)).await.unwrap();
    assert_eq!(started.elapsed(), Duration::from_secs(4));
    assert!(source.is_closed());
    assert!(!source.supports(JOBS_KEY));
}

#[tokio::test(start_paused = true)]
async fn test_unserved_key_polls() {
    let mock = MockHttpClient::new();
    mock.set_response("http://node/events", MockResponse::Hang);
    mock.set_default_response(MockResponse::json(200, json!([])));

    let client = client(&mock);
    let source = SsePushSource::connect(&client, [JOBS_KEY]);
    let hub = RealtimeHub::new(Arc::clone(&client)).with_push_source(source);

    let peers = hub.peers();
    peers.wait_for(|s| s.data.is_some()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(15_100)).await;

    let peer_calls = mock
        .get_requests()
        .iter()
        .filter(|r| r.url == "http://node/network/peers")
        .count();
    assert_eq!(peer_calls, 2);
}

#[test]
fn test_registry_routes_by_type() {
    let registry = SubscriberRegistry::new();
    let seen: Arc<Mutex<Vec<(String, Value)>>> = Arc::new(Mutex::new(Vec::new()));

    let jobs_seen = Arc::clone(&seen);
    let jobs: Listener = Arc::new(move |v: &Value| {
        jobs_seen.lock().unwrap().push(("jobs".to_string(), v.clone()))
    });
    let peers_seen = Arc::clone(&seen);
    let peers: Listener = Arc::new(move |v: &Value| {
        peers_seen.lock().unwrap().push(("peers".to_string(), v.clone()))
    });
    registry.subscribe("jobs", &jobs);
    registry.subscribe("peers", &peers);

    assert_eq!(registry.dispatch(r#"{"type":"peers","data":["a"]}"#), 1);
    assert_eq!(registry.dispatch(r#"{"type":"status","data":{}}"#), 0);
    assert_eq!(registry.dispatch("{broken"), 0);
    registry.unsubscribe("peers", &peers);
    assert_eq!(registry.dispatch(r#"{"type":"peers","data":[]}"#), 0);
    assert_eq!(registry.dispatch(r#"{"type":"jobs","data":1}"#), 1);

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            ("peers".to_string(), json!(["a"])),
            ("jobs".to_string(), json!(1)),
        ]
    );
}
