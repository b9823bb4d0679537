//! Hub presets end to end over HTTP using wiremock.

use icn_realtime::config::GatewayConfig;
use icn_realtime::models::AccountSummary;
use icn_realtime::realtime::{fetcher, OverallStatus, RealtimeConfig, RealtimeHub};
use serde_json::json;
use std::time::Duration;
use tokio::time::timeout;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WAIT: Duration = Duration::from_secs(5);

async fn node() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "is_online": true, "peer_count": 4, "current_block_height": 120, "version": "0.2.0"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/keys"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"did": "did:key:node"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/account/did%3Akey%3Anode/mana"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"balance": 5000}})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/network/peers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["12D3KooA", "12D3KooB"])))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_presets_reach_connected() {
    let server = node().await;
    Mock::given(method("GET"))
        .and(path("/mesh/jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&server)
        .await;
    let hub = RealtimeHub::from_config(&GatewayConfig::new(server.uri()));

    let status = hub.node_status();
    let jobs = hub.jobs();
    let account = hub.account();
    let peers = hub.peers();

    let s = timeout(WAIT, status.wait_for(|s| s.is_connected)).await.unwrap().unwrap();
    assert_eq!(s.data.unwrap().current_block_height, 120);
    let j = timeout(WAIT, jobs.wait_for(|s| s.is_connected)).await.unwrap().unwrap();
    assert!(j.data.unwrap().is_empty());
    let a = timeout(WAIT, account.wait_for(|s| s.is_connected)).await.unwrap().unwrap();
    assert_eq!(
        a.data,
        Some(AccountSummary {
            did: "did:key:node".to_string(),
            mana: 5000
        })
    );
    let p = timeout(WAIT, peers.wait_for(|s| s.is_connected)).await.unwrap().unwrap();
    assert_eq!(p.data.unwrap().len(), 2);

    let summary = hub.summary();
    assert_eq!(summary.status, OverallStatus::Connected);
    assert_eq!(summary.connected, 4);
    assert!(summary.errors.is_empty());
    assert_eq!(hub.active_keys(), vec!["account", "jobs", "peers", "status"]);
}

#[tokio::test]
async fn test_failing_jobs_make_summary_partial() {
    let server = node().await;
    Mock::given(method("GET"))
        .and(path("/mesh/jobs"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(json!({"error": "executor offline", "correlation_id": "c-1"})),
        )
        .mount(&server)
        .await;
    let hub = RealtimeHub::from_config(&GatewayConfig::new(server.uri()));

    let status = hub.node_status();
    let jobs = hub.jobs();
    timeout(WAIT, status.wait_for(|s| s.is_connected)).await.unwrap().unwrap();
    let failed = timeout(WAIT, jobs.wait_for(|s| s.error.is_some())).await.unwrap().unwrap();
    assert_eq!(failed.error.as_deref(), Some("executor offline"));
    assert!(failed.data.is_none());

    let summary = hub.summary();
    assert_eq!(summary.status, OverallStatus::Degraded);
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].key, "jobs");
}

#[tokio::test]
async fn test_custom_resource_polls_on_its_interval() {
    let server = node().await;
    let hub = RealtimeHub::from_config(&GatewayConfig::new(server.uri()));
    let client = hub.client().clone();

    let health = hub.resource(
        "health",
        fetcher(move || {
            let client = client.clone();
            async move { client.node_status().await.map(|s| s.peer_count) }
        }),
        RealtimeConfig::new(Duration::from_millis(100)),
    );
    let first = timeout(WAIT, health.wait_for(|s| s.last_update.is_some())).await.unwrap().unwrap();
    let first_update = first.last_update;
    let second = timeout(WAIT, health.wait_for(|s| s.last_update != first_update))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second.data, Some(4));

    let hits = server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == "/status")
        .count();
    assert!(hits >= 2);
}
