//! The `icn-watch` loop: subscribe to the standard resources and log every
//! change until Ctrl-C.

use color_eyre::Result;
use tokio::sync::watch;

use super::args::WatchOptions;
use crate::config::GatewayConfig;
use crate::models::util::format_mana;
use crate::models::{AccountSummary, JobStatus, MeshJob, NodeStatus};
use crate::realtime::{ConnectionState, LiveResource, RealtimeHub};
use crate::sse::SsePushSource;

/// One-line description of node status.
pub fn describe_status(status: &NodeStatus) -> String {
    format!(
        "{} v{}, {} peers, height {}",
        if status.is_online { "online" } else { "offline" },
        status.version,
        status.peer_count,
        status.current_block_height
    )
}

/// Job counts grouped as running, pending and finished.
pub fn describe_jobs(jobs: &[MeshJob]) -> String {
    let running = jobs
        .iter()
        .filter(|j| matches!(j.status, JobStatus::Assigned | JobStatus::Running))
        .count();
    let finished = jobs.iter().filter(|j| j.status.is_terminal()).count();
    let pending = jobs.len() - running - finished;
    format!(
        "{} jobs ({} running, {} pending, {} finished)",
        jobs.len(),
        running,
        pending,
        finished
    )
}

pub fn describe_account(account: &AccountSummary) -> String {
    format!("{} with {} mana", account.did, format_mana(account.mana as f64))
}

pub fn describe_peers(peers: &[String]) -> String {
    format!("{} peers", peers.len())
}

fn log_state<T>(key: &str, state: &ConnectionState<T>, describe: impl Fn(&T) -> String) {
    let data = state.data.as_ref().map(describe);
    match (&state.error, data) {
        (Some(error), Some(data)) => {
            tracing::warn!(resource = key, phase = %state.phase, "{} (stale: {})", data, error)
        }
        (Some(error), None) => tracing::warn!(resource = key, phase = %state.phase, "{}", error),
        (None, Some(data)) => tracing::info!(resource = key, phase = %state.phase, "{}", data),
        (None, None) => tracing::debug!(resource = key, phase = %state.phase, "No data yet"),
    }
}

fn build_hub(options: &WatchOptions, config: &GatewayConfig) -> RealtimeHub {
    let hub = RealtimeHub::from_config(config);
    if options.push_keys.is_empty() || !config.enable_sse {
        return hub;
    }
    let source = SsePushSource::connect(hub.client(), options.push_keys.iter().cloned());
    hub.with_push_source(source)
}

/// Run the watcher until Ctrl-C, or once when `options.once` is set.
pub async fn run_watch(options: &WatchOptions) -> Result<()> {
    let config = options.apply(GatewayConfig::from_env());
    tracing::info!(
        base_url = %config.base_url,
        enable_sse = config.enable_sse,
        push_keys = ?options.push_keys,
        "Watching node"
    );

    let hub = build_hub(options, &config);
    let status = hub.node_status();
    let jobs = hub.jobs();
    let account = hub.account();
    let peers = hub.peers();

    if options.once {
        return print_once(&hub, &status, &jobs, &account, &peers).await;
    }

    let mut status_rx = status.subscribe();
    let mut jobs_rx = jobs.subscribe();
    let mut account_rx = account.subscribe();
    let mut peers_rx = peers.subscribe();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut last_overall = None;

    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(e) = result {
                    tracing::error!("Failed to listen for Ctrl-C: {}", e);
                }
                tracing::info!("Shutting down");
                break;
            }
            changed = status_rx.changed() => {
                if changed.is_err() { break; }
                log_latest(status.key(), &mut status_rx, |s| describe_status(s));
            }
            changed = jobs_rx.changed() => {
                if changed.is_err() { break; }
                log_latest(jobs.key(), &mut jobs_rx, |j| describe_jobs(j));
            }
            changed = account_rx.changed() => {
                if changed.is_err() { break; }
                log_latest(account.key(), &mut account_rx, describe_account);
            }
            changed = peers_rx.changed() => {
                if changed.is_err() { break; }
                log_latest(peers.key(), &mut peers_rx, |p| describe_peers(p));
            }
        }

        let summary = hub.summary();
        if last_overall != Some(summary.status) {
            tracing::info!(
                connected = summary.connected,
                total = summary.total,
                "Connection: {}",
                summary.status
            );
            last_overall = Some(summary.status);
        }
    }

    status.close();
    jobs.close();
    account.close();
    peers.close();
    Ok(())
}

fn log_latest<T>(
    key: &str,
    rx: &mut watch::Receiver<ConnectionState<T>>,
    describe: impl Fn(&T) -> String,
) {
    let state = rx.borrow_and_update();
    log_state(key, &*state, describe);
}

async fn print_once(
    hub: &RealtimeHub,
    status: &LiveResource<NodeStatus>,
    jobs: &LiveResource<Vec<MeshJob>>,
    account: &LiveResource<AccountSummary>,
    peers: &LiveResource<Vec<String>>,
) -> Result<()> {
    let status_state = status.wait_for(|s| !s.is_loading).await;
    let jobs_state = jobs.wait_for(|s| !s.is_loading).await;
    let account_state = account.wait_for(|s| !s.is_loading).await;
    let peers_state = peers.wait_for(|s| !s.is_loading).await;

    if let Some(s) = status_state {
        log_state(status.key(), &s, describe_status);
    }
    if let Some(s) = jobs_state {
        log_state(jobs.key(), &s, |j| describe_jobs(j));
    }
    if let Some(s) = account_state {
        log_state(account.key(), &s, describe_account);
    }
    if let Some(s) = peers_state {
        log_state(peers.key(), &s, |p| describe_peers(p));
    }

    let summary = hub.summary();
    for error in &summary.errors {
        tracing::warn!(resource = %error.key, "{}", error.message);
    }
    tracing::info!(connected = summary.connected, total = summary.total, "Connection: {}", summary.status);
    Ok(())
}
