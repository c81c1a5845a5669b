//! The bus itself: publish, subscribe, bounded history, websocket fan-out.
//!
//! Grounded on `toka-bus-core`'s `InMemoryBus` (broadcast-channel fan-out,
//! `BusError`, trait-object subscriber dispatch) and `toka-store-memory`'s
//! live-stream-plus-ring-buffer combination, generalized here to per-type
//! *and* per-user bounded history plus an explicit backpressure policy.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use tenant_types::UserId;

use crate::event::{Event, EventPayload};

/// Tunables for a [`Bus`] instance. Field names match the `bus.*`
/// configuration keys read by `tenant-runtime`.
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Maximum events buffered in the internal dispatch queue before new
    /// publishes start being dropped. Default 10,000.
    pub queue_high_water: usize,
    /// Max events retained in the per-event-type history ring. Default 1,000.
    pub history_per_type: usize,
    /// Max events retained in the per-user history ring. Default 500.
    pub history_per_user: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            queue_high_water: 10_000,
            history_per_type: 1_000,
            history_per_user: 500,
        }
    }
}

/// Outcome a [`WebsocketSink`] reports back to the bus after a send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    /// The send failed but the socket may still be usable later (e.g. a
    /// full OS buffer). The bus keeps the sink registered.
    #[error("websocket sink send failed transiently")]
    Transient,
    /// The socket is dead (closed, reset). The bus removes it immediately.
    #[error("websocket sink is no longer reachable")]
    Terminal,
}

/// A live outbound connection events are fanned out to.
///
/// Implementations wrap whatever transport the edge process uses (an actual
/// websocket, a test double, ...). `id` must be stable for the lifetime of
/// one registration so [`Bus::unregister_websocket`] can find it again.
pub trait WebsocketSink: Send + Sync {
    /// Stable id for this connection, unique among currently-registered sinks.
    fn id(&self) -> u64;
    /// Attempt to deliver `event`. Must not block.
    fn send(&self, event: &Event) -> Result<(), SinkError>;
}

/// A bus subscriber. Implementors should treat `handle` as fire-and-forget
/// work off the critical publish path — the bus already runs each
/// subscription on its own dedicated task.
#[async_trait::async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle one delivered event. An `Err` is logged; it does not unsubscribe
    /// the handler or affect other subscribers.
    async fn handle(&self, event: Event) -> anyhow::Result<()>;
}

use crate::ring::RingBuffer;

struct Subscription {
    id: u64,
    /// `None` subscribes to every kind; `Some(k)` filters to `Event::kind() == k`.
    kind_filter: Option<&'static str>,
    tx: mpsc::UnboundedSender<Event>,
}

struct Inner {
    config: BusConfig,
    shutting_down: AtomicBool,
    next_sub_id: AtomicU64,
    next_queue_len: AtomicU64,
    dropped: AtomicU64,
    subs: RwLock<Vec<Subscription>>,
    history_by_type: RwLock<HashMap<&'static str, RingBuffer<Event>>>,
    history_by_user: RwLock<HashMap<UserId, RingBuffer<Event>>>,
    sockets_by_user: RwLock<HashMap<UserId, HashMap<u64, Arc<dyn WebsocketSink>>>>,
    sockets_broadcast: RwLock<HashMap<u64, Arc<dyn WebsocketSink>>>,
}

/// Handle to the event bus. Cheaply cloneable; all clones share the same
/// underlying state.
#[derive(Clone)]
pub struct Bus {
    inner: Arc<Inner>,
    enqueue_tx: mpsc::Sender<Event>,
    dispatch_handle: Arc<JoinHandle<()>>,
}

/// Opaque subscription handle returned by [`Bus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

impl Bus {
    /// Construct a new bus and spawn its dispatch loop.
    ///
    /// The dispatch loop owns the receiving half of a bounded `tokio::mpsc`
    /// channel sized to `config.queue_high_water`; a full channel means
    /// `publish` drops the event rather than waiting (see module docs).
    pub fn new(config: BusConfig) -> Self {
        let (enqueue_tx, mut enqueue_rx) = mpsc::channel(config.queue_high_water.max(1));

        let inner = Arc::new(Inner {
            config,
            shutting_down: AtomicBool::new(false),
            next_sub_id: AtomicU64::new(1),
            next_queue_len: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            subs: RwLock::new(Vec::new()),
            history_by_type: RwLock::new(HashMap::new()),
            history_by_user: RwLock::new(HashMap::new()),
            sockets_by_user: RwLock::new(HashMap::new()),
            sockets_broadcast: RwLock::new(HashMap::new()),
        });

        let dispatch_inner = inner.clone();
        let dispatch_handle = tokio::spawn(async move {
            while let Some(event) = enqueue_rx.recv().await {
                dispatch_inner.next_queue_len.fetch_sub(1, Ordering::Relaxed);
                dispatch_one(&dispatch_inner, event).await;
            }
            debug!("bus dispatch loop exiting: enqueue channel closed");
        });

        Self {
            inner,
            enqueue_tx,
            dispatch_handle: Arc::new(dispatch_handle),
        }
    }

    /// Publish an event, scoring and delivering it asynchronously.
    ///
    /// Never blocks on subscriber behavior: once the event is handed to the
    /// internal queue (or dropped under backpressure) this returns. The
    /// returned [`Event`] is canonical — it carries the generated id and
    /// timestamp — but during shutdown it is never actually delivered; no
    /// separate "rejected" variant exists, callers should treat a publish
    /// issued after [`Bus::shutdown`] has started as a no-op.
    pub async fn publish(
        &self,
        payload: EventPayload,
        source: impl Into<String>,
        user_id: Option<UserId>,
    ) -> Event {
        self.publish_event(Event::new(payload, source, user_id)).await
    }

    /// Synchronous-context sibling of [`Bus::publish`] for callers that
    /// cannot await (e.g. a `Drop` impl or a non-async reducer).
    pub fn publish_sync(
        &self,
        payload: EventPayload,
        source: impl Into<String>,
        user_id: Option<UserId>,
    ) -> Event {
        let event = Event::new(payload, source, user_id);
        self.publish_event_sync(event.clone());
        event
    }

    /// Publish an already-constructed event (e.g. one the context loop has
    /// already attached an intensity score to via [`Event::with_intensity`]).
    pub async fn publish_event(&self, event: Event) {
        self.publish_event_sync(event)
    }

    /// Non-blocking enqueue shared by [`Bus::publish`] and
    /// [`Bus::publish_sync`]. Uses `try_send`, so a full queue results in a
    /// dropped event and a logged warning rather than backpressure on the
    /// caller.
    fn publish_event_sync(&self, event: Event) {
        if self.inner.shutting_down.load(Ordering::Acquire) {
            debug!(kind = event.kind(), "publish ignored: bus is shutting down");
            return;
        }
        match self.enqueue_tx.try_send(event) {
            Ok(()) => {
                self.inner.next_queue_len.fetch_add(1, Ordering::Relaxed);
            }
            Err(mpsc::error::TrySendError::Full(event)) => {
                self.inner.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    kind = event.kind(),
                    high_water = self.inner.config.queue_high_water,
                    "dropping event: bus queue at high-water mark"
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("publish failed: dispatch loop is gone");
            }
        }
    }

    /// Register a subscriber. Delivery to this subscriber is strict FIFO;
    /// there is no ordering guarantee *across* different subscriptions.
    ///
    /// `kind_filter` restricts delivery to events whose [`Event::kind`]
    /// equals the given string; `None` subscribes to everything.
    pub async fn subscribe(
        &self,
        kind_filter: Option<&'static str>,
        handler: Arc<dyn EventHandler>,
    ) -> SubscriptionId {
        let id = self.inner.next_sub_id.fetch_add(1, Ordering::Relaxed);
        let (tx, mut rx) = mpsc::unbounded_channel::<Event>();

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(err) = handler.handle(event).await {
                    warn!(error = %err, "subscriber handler returned an error");
                }
            }
        });

        self.inner.subs.write().await.push(Subscription {
            id,
            kind_filter,
            tx,
        });
        SubscriptionId(id)
    }

    /// Remove a subscription. The subscriber's worker task drains whatever
    /// is already queued for it, then exits on its own.
    pub async fn unsubscribe(&self, id: SubscriptionId) {
        let mut subs = self.inner.subs.write().await;
        subs.retain(|s| s.id != id.0);
    }

    /// Register a websocket sink. `user_id = None` registers it as a
    /// broadcast sink that receives every event regardless of subject.
    pub async fn register_websocket(&self, sink: Arc<dyn WebsocketSink>, user_id: Option<UserId>) {
        match user_id {
            Some(uid) => {
                self.inner
                    .sockets_by_user
                    .write()
                    .await
                    .entry(uid)
                    .or_default()
                    .insert(sink.id(), sink);
            }
            None => {
                self.inner
                    .sockets_broadcast
                    .write()
                    .await
                    .insert(sink.id(), sink);
            }
        }
    }

    /// Remove a previously-registered websocket sink.
    pub async fn unregister_websocket(&self, sink_id: u64, user_id: Option<UserId>) {
        match user_id {
            Some(uid) => {
                if let Some(set) = self.inner.sockets_by_user.write().await.get_mut(&uid) {
                    set.remove(&sink_id);
                }
            }
            None => {
                self.inner.sockets_broadcast.write().await.remove(&sink_id);
            }
        }
    }

    /// Read back recent history, newest first.
    ///
    /// When `user_id` is given, reads from that user's bounded ring
    /// (capacity `history_per_user`); otherwise reads from the per-type ring
    /// for `kind` (capacity `history_per_type`), which requires `kind`.
    pub async fn history(
        &self,
        kind: Option<&str>,
        user_id: Option<&UserId>,
        limit: usize,
    ) -> Vec<Event> {
        if let Some(uid) = user_id {
            let map = self.inner.history_by_user.read().await;
            return match map.get(uid) {
                Some(ring) => ring.iter_newest_first().take(limit).cloned().collect(),
                None => Vec::new(),
            };
        }
        if let Some(k) = kind {
            let map = self.inner.history_by_type.read().await;
            return match map.get(k) {
                Some(ring) => ring.iter_newest_first().take(limit).cloned().collect(),
                None => Vec::new(),
            };
        }
        Vec::new()
    }

    /// Number of events dropped so far due to backpressure.
    pub fn dropped_count(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    /// Begin shutdown: refuse new publishes immediately, then wait up to
    /// `deadline` for already-enqueued events to finish dispatching.
    pub async fn shutdown(self, deadline: Duration) {
        self.inner.shutting_down.store(true, Ordering::Release);
        drop(self.enqueue_tx);
        let handle = match Arc::try_unwrap(self.dispatch_handle) {
            Ok(handle) => handle,
            Err(_) => {
                warn!("shutdown called with outstanding Bus clones; dispatch loop left running");
                return;
            }
        };
        if tokio::time::timeout(deadline, handle).await.is_err() {
            warn!("bus shutdown deadline elapsed with dispatch work still pending");
        }
    }
}

async fn dispatch_one(inner: &Arc<Inner>, event: Event) {
    let kind = event.kind();

    {
        let mut by_type = inner.history_by_type.write().await;
        by_type
            .entry(kind)
            .or_insert_with(|| RingBuffer::new(inner.config.history_per_type))
            .push(event.clone());
    }
    if let Some(uid) = &event.user_id {
        let mut by_user = inner.history_by_user.write().await;
        by_user
            .entry(uid.clone())
            .or_insert_with(|| RingBuffer::new(inner.config.history_per_user))
            .push(event.clone());
    }

    {
        let subs = inner.subs.read().await;
        for sub in subs.iter() {
            if sub.kind_filter.is_some_and(|f| f != kind) {
                continue;
            }
            // An unbounded per-subscription channel: a slow subscriber can
            // never cause a dropped event at the bus level, only grow its
            // own backlog. It is free to unsubscribe if it falls too far behind.
            let _ = sub.tx.send(event.clone());
        }
    }

    fan_out_websockets(inner, &event).await;
}

async fn fan_out_websockets(inner: &Arc<Inner>, event: &Event) {
    let mut dead: Vec<u64> = Vec::new();

    if let Some(uid) = &event.user_id {
        let by_user = inner.sockets_by_user.read().await;
        if let Some(set) = by_user.get(uid) {
            for sink in set.values() {
                match sink.send(event) {
                    Ok(()) | Err(SinkError::Transient) => {}
                    Err(SinkError::Terminal) => dead.push(sink.id()),
                }
            }
        }
        drop(by_user);
        if !dead.is_empty() {
            if let Some(set) = inner.sockets_by_user.write().await.get_mut(uid) {
                for id in &dead {
                    set.remove(id);
                }
            }
            dead.clear();
        }
    }

    let broadcast = inner.sockets_broadcast.read().await;
    for sink in broadcast.values() {
        match sink.send(event) {
            Ok(()) | Err(SinkError::Transient) => {}
            Err(SinkError::Terminal) => dead.push(sink.id()),
        }
    }
    drop(broadcast);
    if !dead.is_empty() {
        let mut set = inner.sockets_broadcast.write().await;
        for id in &dead {
            set.remove(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    struct CountingHandler {
        count: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl EventHandler for CountingHandler {
        async fn handle(&self, _event: Event) -> anyhow::Result<()> {
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(30)).await;
    }

    #[tokio::test]
    async fn subscribe_then_publish_delivers_once() {
        let bus = Bus::new(BusConfig::default());
        let count = Arc::new(AtomicUsize::new(0));
        bus.subscribe(None, Arc::new(CountingHandler { count: count.clone() }))
            .await;

        bus.publish(
            EventPayload::UserDismissed { item: "x".into() },
            "test",
            None,
        )
        .await;
        settle().await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn kind_filter_excludes_other_kinds() {
        let bus = Bus::new(BusConfig::default());
        let count = Arc::new(AtomicUsize::new(0));
        bus.subscribe(
            Some("law_matched"),
            Arc::new(CountingHandler { count: count.clone() }),
        )
        .await;

        bus.publish(
            EventPayload::UserDismissed { item: "x".into() },
            "test",
            None,
        )
        .await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        bus.publish(
            EventPayload::LawMatched { law_id: "L1".into() },
            "test",
            None,
        )
        .await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let bus = Bus::new(BusConfig::default());
        let count = Arc::new(AtomicUsize::new(0));
        let sub = bus
            .subscribe(None, Arc::new(CountingHandler { count: count.clone() }))
            .await;
        bus.unsubscribe(sub).await;

        bus.publish(
            EventPayload::UserDismissed { item: "x".into() },
            "test",
            None,
        )
        .await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn history_is_bounded_and_newest_first() {
        let mut config = BusConfig::default();
        config.history_per_type = 3;
        let bus = Bus::new(config);

        for i in 0..5 {
            bus.publish(
                EventPayload::UserDismissed { item: format!("{i}") },
                "test",
                None,
            )
            .await;
        }
        settle().await;

        let history = bus.history(Some("user_dismissed"), None, 10).await;
        assert_eq!(history.len(), 3);
        let items: Vec<_> = history
            .iter()
            .map(|e| match &e.payload {
                EventPayload::UserDismissed { item } => item.clone(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(items, vec!["4", "3", "2"]);
    }

    #[tokio::test]
    async fn per_user_history_is_isolated() {
        let bus = Bus::new(BusConfig::default());
        let alice = UserId::new("alice").unwrap();
        let bob = UserId::new("bob").unwrap();

        bus.publish(
            EventPayload::UserDismissed { item: "a".into() },
            "test",
            Some(alice.clone()),
        )
        .await;
        bus.publish(
            EventPayload::UserDismissed { item: "b".into() },
            "test",
            Some(bob.clone()),
        )
        .await;
        settle().await;

        let alice_hist = bus.history(None, Some(&alice), 10).await;
        assert_eq!(alice_hist.len(), 1);
        assert_eq!(bus.history(None, Some(&bob), 10).await.len(), 1);
    }

    struct FlakySink {
        id: u64,
        fail_with: Option<SinkError>,
        received: Arc<AtomicUsize>,
    }

    impl WebsocketSink for FlakySink {
        fn id(&self) -> u64 {
            self.id
        }
        fn send(&self, _event: &Event) -> Result<(), SinkError> {
            match self.fail_with {
                None => {
                    self.received.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
                Some(err) => Err(err),
            }
        }
    }

    #[tokio::test]
    async fn terminal_sink_error_deregisters_socket() {
        let bus = Bus::new(BusConfig::default());
        let received = Arc::new(AtomicUsize::new(0));
        let sink = Arc::new(FlakySink {
            id: 1,
            fail_with: Some(SinkError::Terminal),
            received: received.clone(),
        });
        bus.register_websocket(sink, None).await;

        bus.publish(
            EventPayload::UserDismissed { item: "x".into() },
            "test",
            None,
        )
        .await;
        settle().await;

        let broadcast = bus.inner.sockets_broadcast.read().await;
        assert!(broadcast.is_empty());
    }

    #[tokio::test]
    async fn transient_sink_error_keeps_socket_registered() {
        let bus = Bus::new(BusConfig::default());
        let received = Arc::new(AtomicUsize::new(0));
        let sink = Arc::new(FlakySink {
            id: 7,
            fail_with: Some(SinkError::Transient),
            received: received.clone(),
        });
        bus.register_websocket(sink, None).await;

        bus.publish(
            EventPayload::UserDismissed { item: "x".into() },
            "test",
            None,
        )
        .await;
        settle().await;

        let broadcast = bus.inner.sockets_broadcast.read().await;
        assert_eq!(broadcast.len(), 1);
    }

    #[tokio::test]
    async fn backpressure_drops_beyond_high_water_mark() {
        let mut config = BusConfig::default();
        config.queue_high_water = 1;
        let bus = Bus::new(config);

        // No subscriber draining the dispatch loop artificially here; the
        // dispatch loop runs concurrently so this mainly documents intent.
        // Flood far beyond capacity and assert we never panic and the
        // dropped counter can only go up.
        for i in 0..50 {
            bus.publish_sync(
                EventPayload::UserDismissed { item: format!("{i}") },
                "test",
                None,
            );
        }
        settle().await;
        // Either all were drained fast enough or some were dropped; both are
        // correct, the property under test is "never panics, never blocks".
        let _ = bus.dropped_count();
    }
}
