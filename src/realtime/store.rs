//! Connection state store: one driver task per subscribed resource.
//!
//! [`LiveResource::spawn`] starts a driver that owns the [`Machine`], runs
//! fetches as separate tasks, and publishes snapshots through a
//! `tokio::sync::watch` channel. All state mutation happens on the driver
//! task. Handles are cheap to clone; when the last one is dropped (or
//! [`LiveResource::close`] is called) the liveness token is cancelled, the
//! driver cancels its timer and exits, and fetches still in flight finish
//! without effect.

use chrono::Utc;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Sleep;
use tokio_util::sync::CancellationToken;

use super::config::RealtimeConfig;
use super::machine::{Effect, Event, FetchTicket, Machine};
use super::state::ConnectionState;
use super::transport::{PushSubscription, TransportSelector};
use super::visibility::{Visibility, VisibilityMonitor};

/// Future returned by a [`Fetcher`]. Errors are already rendered to text.
pub type FetchFuture<T> = BoxFuture<'static, Result<T, String>>;

/// Zero-argument function producing one fetch of a resource.
pub type Fetcher<T> = Arc<dyn Fn() -> FetchFuture<T> + Send + Sync>;

/// Wrap an async closure as a [`Fetcher`].
///
/// ```
/// use icn_realtime::realtime::fetcher;
///
/// let f = fetcher(|| async { Ok::<_, std::io::Error>(42u32) });
/// # let _ = f;
/// ```
pub fn fetcher<T, E, F, Fut>(f: F) -> Fetcher<T>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    E: Display,
    T: Send + 'static,
{
    Arc::new(move || {
        let fut = f();
        async move { fut.await.map_err(|e| e.to_string()) }.boxed()
    })
}

/// Shared collaborators every store needs.
#[derive(Debug, Clone, Default)]
pub struct RealtimeContext {
    pub selector: TransportSelector,
    pub visibility: VisibilityMonitor,
}

enum Command<T> {
    Refetch(oneshot::Sender<()>),
    Reconnect,
    ReplaceFetcher(Fetcher<T>),
}

type Settled<T> = (FetchTicket, Result<T, String>);

pub(crate) struct Inner<T> {
    key: String,
    commands: mpsc::UnboundedSender<Command<T>>,
    state_rx: watch::Receiver<ConnectionState<T>>,
    liveness: CancellationToken,
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        self.liveness.cancel();
    }
}

/// Handle to a live, self-refreshing resource.
pub struct LiveResource<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for LiveResource<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for LiveResource<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveResource")
            .field("key", &self.inner.key)
            .field("closed", &self.inner.liveness.is_cancelled())
            .finish()
    }
}

impl<T> LiveResource<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Start refreshing `key` with `fetcher`.
    ///
    /// The first fetch is issued before this returns. Must be called from
    /// within a tokio runtime.
    pub fn spawn(
        key: impl Into<String>,
        fetcher: Fetcher<T>,
        config: RealtimeConfig,
        context: &RealtimeContext,
    ) -> Self {
        let key = key.into();
        let (state_tx, state_rx) = watch::channel(ConnectionState::connecting());
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (settle_tx, settle_rx) = mpsc::unbounded_channel();
        let mut visibility = context.visibility.subscribe();
        let visible = visibility.borrow_and_update().is_visible();
        let liveness = CancellationToken::new();

        let mut driver = Driver {
            key: key.clone(),
            config,
            machine: Machine::new(config.polling_interval, visible),
            fetcher,
            selector: context.selector.clone(),
            state_tx,
            settle_tx,
            settle_rx,
            commands: command_rx,
            visibility,
            visibility_open: true,
            timer: None,
            push: None,
            waiters: HashMap::new(),
            liveness: liveness.clone(),
        };
        driver.start();
        tokio::spawn(driver.run());

        Self {
            inner: Arc::new(Inner {
                key,
                commands: command_tx,
                state_rx,
                liveness,
            }),
        }
    }

    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// Current snapshot.
    pub fn state(&self) -> ConnectionState<T> {
        self.inner.state_rx.borrow().clone()
    }

    /// A receiver positioned at the current snapshot; `changed()` on it
    /// waits for the next update.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState<T>> {
        let mut rx = self.inner.state_rx.clone();
        rx.borrow_and_update();
        rx
    }

    /// Wait for the next published snapshot. `None` once the store is gone.
    pub async fn changed(&self) -> Option<ConnectionState<T>> {
        let mut rx = self.subscribe();
        rx.changed().await.ok()?;
        let state = rx.borrow().clone();
        Some(state)
    }

    /// Wait until the snapshot satisfies `predicate`, checking the current
    /// one first. `None` if the store stops first.
    pub async fn wait_for(
        &self,
        mut predicate: impl FnMut(&ConnectionState<T>) -> bool,
    ) -> Option<ConnectionState<T>> {
        let mut rx = self.inner.state_rx.clone();
        let state = rx.wait_for(|s| predicate(s)).await.ok()?;
        let snapshot = state.clone();
        Some(snapshot)
    }

    /// Fetch once now without disturbing the poll cadence. Resolves after
    /// the result has been published.
    pub async fn refetch(&self) {
        let (tx, rx) = oneshot::channel();
        if self.inner.commands.send(Command::Refetch(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    /// Cancel timer and push channel, reset retry state, re-select the
    /// transport and fetch immediately.
    pub fn reconnect(&self) {
        let _ = self.inner.commands.send(Command::Reconnect);
    }

    /// Swap the fetch function; the store re-initializes as on `reconnect`.
    pub fn replace_fetcher(&self, fetcher: Fetcher<T>) {
        let _ = self.inner.commands.send(Command::ReplaceFetcher(fetcher));
    }

    /// Token cancelled when the store is torn down.
    pub fn liveness(&self) -> CancellationToken {
        self.inner.liveness.clone()
    }

    /// Tear the store down for every handle.
    pub fn close(&self) {
        self.inner.liveness.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.liveness.is_cancelled()
    }

    pub(crate) fn downgrade(&self) -> Weak<Inner<T>> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(weak: &Weak<Inner<T>>) -> Option<Self> {
        weak.upgrade()
            .filter(|inner| !inner.liveness.is_cancelled())
            .map(|inner| Self { inner })
    }
}

/// Render a caught panic as a fetch error so the cycle still settles.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned());
    match detail {
        Some(detail) => format!("fetch panicked: {}", detail),
        None => "fetch panicked".to_string(),
    }
}

enum Wake<T> {
    Teardown,
    Command(Command<T>),
    Settled(Settled<T>),
    Visibility(Visibility),
    VisibilityClosed,
    Timer(u64),
    Push,
    PushClosed,
}

struct Driver<T> {
    key: String,
    config: RealtimeConfig,
    machine: Machine<T>,
    fetcher: Fetcher<T>,
    selector: TransportSelector,
    state_tx: watch::Sender<ConnectionState<T>>,
    settle_tx: mpsc::UnboundedSender<Settled<T>>,
    settle_rx: mpsc::UnboundedReceiver<Settled<T>>,
    commands: mpsc::UnboundedReceiver<Command<T>>,
    visibility: watch::Receiver<Visibility>,
    visibility_open: bool,
    timer: Option<(u64, Pin<Box<Sleep>>)>,
    push: Option<PushSubscription>,
    waiters: HashMap<u64, oneshot::Sender<()>>,
    liveness: CancellationToken,
}

async fn wait_timer(timer: &mut Option<(u64, Pin<Box<Sleep>>)>) -> u64 {
    match timer {
        Some((epoch, sleep)) => {
            sleep.as_mut().await;
            *epoch
        }
        None => std::future::pending().await,
    }
}

async fn wait_push(push: &mut Option<PushSubscription>) -> Option<serde_json::Value> {
    match push {
        Some(subscription) => subscription.recv().await,
        None => std::future::pending().await,
    }
}

impl<T> Driver<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn start(&mut self) {
        let transport = self.selector.select(&self.key, &self.config).transport();
        tracing::debug!(
            key = %self.key,
            ?transport,
            interval_ms = self.config.polling_interval.as_millis() as u64,
            "Starting realtime store"
        );
        self.apply(Event::Start { transport });
    }

    async fn run(mut self) {
        loop {
            let wake = tokio::select! {
                biased;
                _ = self.liveness.cancelled() => Wake::Teardown,
                command = self.commands.recv() => match command {
                    Some(command) => Wake::Command(command),
                    None => Wake::Teardown,
                },
                Some(settled) = self.settle_rx.recv() => Wake::Settled(settled),
                changed = self.visibility.changed(), if self.visibility_open => match changed {
                    Ok(()) => Wake::Visibility(*self.visibility.borrow_and_update()),
                    Err(_) => Wake::VisibilityClosed,
                },
                epoch = wait_timer(&mut self.timer) => Wake::Timer(epoch),
                message = wait_push(&mut self.push) => match message {
                    Some(_) => Wake::Push,
                    None => Wake::PushClosed,
                },
            };

            match wake {
                Wake::Teardown => {
                    self.apply(Event::Teardown);
                    tracing::debug!(key = %self.key, "Realtime store torn down");
                    return;
                }
                Wake::Command(Command::Refetch(done)) => {
                    let started = self.apply(Event::Refetch);
                    if let Some(ticket) = started.first() {
                        self.waiters.insert(ticket.seq, done);
                    }
                }
                Wake::Command(Command::Reconnect) => self.reconnect(),
                Wake::Command(Command::ReplaceFetcher(fetcher)) => {
                    self.fetcher = fetcher;
                    self.reconnect();
                }
                Wake::Settled((ticket, result)) => {
                    if let Err(ref e) = result {
                        tracing::debug!(key = %self.key, seq = ticket.seq, "Fetch failed: {}", e);
                    }
                    self.apply(Event::FetchSettled {
                        ticket,
                        outcome: result.into(),
                        at: Utc::now(),
                    });
                    if let Some(done) = self.waiters.remove(&ticket.seq) {
                        let _ = done.send(());
                    }
                }
                Wake::Visibility(visibility) => {
                    self.apply(Event::VisibilityChanged {
                        visible: visibility.is_visible(),
                    });
                }
                Wake::VisibilityClosed => self.visibility_open = false,
                Wake::Timer(epoch) => {
                    self.timer = None;
                    self.apply(Event::TimerFired { epoch });
                }
                Wake::Push => {
                    self.apply(Event::PushMessage);
                }
                Wake::PushClosed => {
                    tracing::warn!(key = %self.key, "Push channel closed, falling back to polling");
                    self.push = None;
                    self.apply(Event::PushClosed);
                }
            }
        }
    }

    fn reconnect(&mut self) {
        let transport = self.selector.select(&self.key, &self.config).transport();
        tracing::info!(key = %self.key, ?transport, "Reconnecting realtime store");
        self.apply(Event::Reconnect { transport });
    }

    /// Feed `event` to the machine, perform its effects, publish if needed.
    /// Returns the fetches that were started.
    fn apply(&mut self, event: Event<T>) -> Vec<FetchTicket> {
        let step = self.machine.handle(event);
        let mut started = Vec::new();
        for effect in step.effects {
            if let Effect::Fetch(ticket) = effect {
                started.push(ticket);
            }
            self.perform(effect);
        }
        if step.publish && !self.machine.is_torn_down() {
            self.state_tx.send_replace(self.machine.state().clone());
        }
        started
    }

    fn perform(&mut self, effect: Effect) {
        match effect {
            Effect::Fetch(ticket) => {
                let fetcher = Arc::clone(&self.fetcher);
                let fut = match std::panic::catch_unwind(AssertUnwindSafe(|| fetcher())) {
                    Ok(fut) => fut,
                    Err(payload) => {
                        let message = panic_message(payload.as_ref());
                        tracing::error!(key = %self.key, seq = ticket.seq, "{}", message);
                        futures::future::ready(Err(message)).boxed()
                    }
                };
                let tx = self.settle_tx.clone();
                let key = self.key.clone();
                tokio::spawn(async move {
                    let result = match AssertUnwindSafe(fut).catch_unwind().await {
                        Ok(result) => result,
                        Err(payload) => {
                            let message = panic_message(payload.as_ref());
                            tracing::error!(key = %key, seq = ticket.seq, "{}", message);
                            Err(message)
                        }
                    };
                    // The driver is gone after teardown; the result is dropped.
                    let _ = tx.send((ticket, result));
                });
            }
            Effect::ArmTimer { epoch, after } => {
                self.timer = Some((epoch, Box::pin(tokio::time::sleep(after))));
            }
            Effect::CancelTimer => self.timer = None,
            Effect::OpenPush => match self.selector.open(&self.key) {
                Some(subscription) => self.push = Some(subscription),
                None => {
                    tracing::debug!(key = %self.key, "Push source refused subscription");
                    self.apply(Event::PushClosed);
                }
            },
            Effect::ClosePush => self.push = None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counting(calls: &Arc<AtomicUsize>) -> Fetcher<usize> {
        let calls = Arc::clone(calls);
        fetcher(move || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Ok::<_, String>(n) }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_fetch_issued_at_spawn() {
        let calls = Arc::new(AtomicUsize::new(0));
        let res = LiveResource::spawn(
            "count",
            counting(&calls),
            RealtimeConfig::new(Duration::from_secs(5)),
            &RealtimeContext::default(),
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(res.state().is_loading);

        let state = res.wait_for(|s| s.data.is_some()).await.unwrap();
        assert_eq!(state.data, Some(1));
        assert!(state.is_connected);
        assert!(!state.is_loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_after_interval() {
        let calls = Arc::new(AtomicUsize::new(0));
        let res = LiveResource::spawn(
            "count",
            counting(&calls),
            RealtimeConfig::new(Duration::from_secs(5)),
            &RealtimeContext::default(),
        );
        res.wait_for(|s| s.data == Some(1)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(4_900)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let state = res.wait_for(|s| s.data == Some(2)).await.unwrap();
        assert!(state.is_connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refetch_resolves_after_publish() {
        let calls = Arc::new(AtomicUsize::new(0));
        let res = LiveResource::spawn(
            "count",
            counting(&calls),
            RealtimeConfig::new(Duration::from_secs(60)),
            &RealtimeContext::default(),
        );
        res.wait_for(|s| s.data.is_some()).await.unwrap();

        res.refetch().await;
        assert_eq!(res.state().data, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_stops_polling() {
        let calls = Arc::new(AtomicUsize::new(0));
        let res = LiveResource::spawn(
            "count",
            counting(&calls),
            RealtimeConfig::new(Duration::from_secs(1)),
            &RealtimeContext::default(),
        );
        res.wait_for(|s| s.data.is_some()).await.unwrap();
        let token = res.liveness();
        res.close();
        assert!(token.is_cancelled());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(res.changed().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_last_handle_tears_down() {
        let calls = Arc::new(AtomicUsize::new(0));
        let res = LiveResource::spawn(
            "count",
            counting(&calls),
            RealtimeConfig::new(Duration::from_secs(1)),
            &RealtimeContext::default(),
        );
        let token = res.liveness();
        let clone = res.clone();
        drop(res);
        assert!(!token.is_cancelled());
        drop(clone);
        assert!(token.is_cancelled());
    }
}
