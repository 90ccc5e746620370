//! Socket registry implementation
//!
//! The central registry that maps bin names to live viewers and fans broker
//! messages out to them.

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};

use bytes::Bytes;
use tokio::sync::{mpsc, Mutex, RwLock};

use crate::broker::Broker;

use super::config::RegistryConfig;
use super::connection::{ConnectionError, ConnectionId, ViewerConnection};
use super::entry::{BinEntry, BinStats, ViewerSlot};

/// Central registry for all live viewers
///
/// A bin is present if and only if it has at least one viewer. The broker
/// subscription for a bin follows that: subscribe when the first viewer
/// registers, unsubscribe when the last one leaves. Transitions of one bin
/// are serialized by that bin's gate; the map lock is never held across a
/// broker call, so a slow broker never stalls other bins.
pub struct SocketRegistry {
    /// Map of bin name to its viewers
    bins: RwLock<HashMap<String, BinEntry>>,

    /// Per-bin locks held across membership changes and broker calls
    gates: Mutex<HashMap<String, Arc<Mutex<()>>>>,

    /// Broker whose per-bin subscriptions this registry owns
    broker: Arc<dyn Broker>,

    /// Configuration
    config: RegistryConfig,
}

impl SocketRegistry {
    /// Create a new registry with default configuration
    pub fn new(broker: Arc<dyn Broker>) -> Self {
        Self::with_config(broker, RegistryConfig::default())
    }

    /// Create a new registry with custom configuration
    pub fn with_config(broker: Arc<dyn Broker>, config: RegistryConfig) -> Self {
        Self {
            bins: RwLock::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
            broker,
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register a viewer connection under a bin
    ///
    /// Registering a connection that is already present is a no-op. The
    /// first viewer of a bin subscribes the bin at the broker. A refused
    /// subscription is logged and retried by the next registration on the
    /// bin; the viewer stays registered either way.
    pub async fn register(self: &Arc<Self>, bin: &str, connection: Arc<dyn ViewerConnection>) {
        let gate = self.gate(bin).await;
        {
            let _transition = gate.lock().await;
            self.add_viewer(bin, connection).await;
        }
        drop(gate);
        self.release_gate(bin).await;
    }

    /// Unregister a viewer connection
    ///
    /// Unknown bins and connections are ignored. Removing the last viewer of
    /// a bin removes the bin and unsubscribes it at the broker.
    pub async fn unregister(&self, bin: &str, id: ConnectionId) {
        self.remove_viewer(bin, id, false).await;
    }

    /// Broadcast a payload to every viewer of a bin
    ///
    /// Membership is snapshotted and the lock released before any delivery.
    /// Each viewer has its own queue and writer task, so this never waits on
    /// a viewer. A viewer whose queue is full is evicted in the background.
    ///
    /// Returns the number of viewers the payload was queued for.
    pub async fn broadcast(self: &Arc<Self>, bin: &str, payload: Bytes) -> usize {
        let targets = {
            let bins = self.bins.read().await;
            match bins.get(bin) {
                Some(entry) => {
                    entry.messages_broadcast.fetch_add(1, Ordering::Relaxed);
                    entry.snapshot()
                }
                None => return 0,
            }
        };

        let mut queued = 0;
        for (connection, queue) in targets {
            match queue.try_send(payload.clone()) {
                Ok(()) => queued += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(
                        bin,
                        connection = connection.id(),
                        capacity = self.config.viewer_queue_capacity,
                        "Viewer queue full, disconnecting slow viewer"
                    );
                    let registry = Arc::clone(self);
                    let bin = bin.to_string();
                    tokio::spawn(async move {
                        registry.evict(&bin, connection).await;
                    });
                }
                // Writer already gone; its own exit path unregisters it
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }

        tracing::trace!(bin, queued, "Broadcast payload");

        queued
    }

    /// Check if a bin has at least one viewer
    pub async fn has_bin(&self, bin: &str) -> bool {
        self.bins.read().await.contains_key(bin)
    }

    /// Get bin statistics
    pub async fn bin_stats(&self, bin: &str) -> Option<BinStats> {
        self.bins.read().await.get(bin).map(BinEntry::stats)
    }

    /// Get total number of bins with viewers
    pub async fn bin_count(&self) -> usize {
        self.bins.read().await.len()
    }

    /// Get total number of registered viewers across all bins
    pub async fn connection_count(&self) -> usize {
        self.bins
            .read()
            .await
            .values()
            .map(BinEntry::viewer_count)
            .sum()
    }

    /// Close every viewer and drop every subscription
    ///
    /// Used at shutdown. The registry is empty afterwards.
    pub async fn drain(&self) {
        let drained: Vec<(String, BinEntry)> = self.bins.write().await.drain().collect();

        for (bin, entry) in drained {
            let subscribed = entry.subscribed;
            for (_, slot) in entry.viewers {
                slot.writer.abort();
                slot.connection.close().await;
            }

            if !subscribed {
                continue;
            }
            if let Err(e) = self.broker.unsubscribe(&bin).await {
                tracing::warn!(bin = %bin, error = %e, "Failed to unsubscribe bin during drain");
            }
        }

        tracing::info!("Socket registry drained");
    }

    /// Close a viewer and remove it from its bin
    async fn evict(&self, bin: &str, connection: Arc<dyn ViewerConnection>) {
        connection.close().await;
        self.remove_viewer(bin, connection.id(), true).await;
    }

    /// Get the transition gate for a bin, creating it if needed
    async fn gate(&self, bin: &str) -> Arc<Mutex<()>> {
        let mut gates = self.gates.lock().await;
        Arc::clone(gates.entry(bin.to_string()).or_default())
    }

    /// Forget a bin's gate once nobody holds or waits on it
    ///
    /// Gates are only cloned under the `gates` lock, so a count of one means
    /// the map holds the last reference.
    async fn release_gate(&self, bin: &str) {
        let mut gates = self.gates.lock().await;
        if gates.get(bin).is_some_and(|gate| Arc::strong_count(gate) == 1) {
            gates.remove(bin);
        }
    }

    /// Insert a viewer, subscribing the bin first if needed; caller holds the gate
    async fn add_viewer(self: &Arc<Self>, bin: &str, connection: Arc<dyn ViewerConnection>) {
        let id = connection.id();

        let subscribed = match self.bins.read().await.get(bin) {
            Some(entry) if entry.contains(id) => {
                tracing::debug!(bin, connection = id, "Viewer already registered");
                return;
            }
            Some(entry) => entry.subscribed,
            None => false,
        };

        let subscribed = subscribed || self.subscribe(bin, id).await;

        let mut bins = self.bins.write().await;
        let entry = bins.entry(bin.to_string()).or_insert_with(BinEntry::new);
        entry.subscribed = subscribed;

        let slot = self.spawn_viewer(bin, connection);
        entry.viewers.insert(id, slot);

        tracing::debug!(
            bin,
            connection = id,
            viewers = entry.viewer_count(),
            "Viewer registered"
        );
    }

    /// Subscribe a bin at the broker; returns whether it is now subscribed
    async fn subscribe(&self, bin: &str, id: ConnectionId) -> bool {
        match self.broker.subscribe(bin).await {
            Ok(()) => {
                tracing::info!(bin, connection = id, "Bin subscribed");
                true
            }
            Err(e) => {
                tracing::error!(bin, connection = id, error = %e, "Failed to subscribe bin");
                false
            }
        }
    }

    /// Remove a viewer under the bin's gate
    async fn remove_viewer(&self, bin: &str, id: ConnectionId, evicted: bool) {
        let gate = self.gate(bin).await;
        {
            let _transition = gate.lock().await;
            self.remove_viewer_locked(bin, id, evicted).await;
        }
        drop(gate);
        self.release_gate(bin).await;
    }

    async fn remove_viewer_locked(&self, bin: &str, id: ConnectionId, evicted: bool) {
        let subscribed = {
            let mut bins = self.bins.write().await;

            let Some(entry) = bins.get_mut(bin) else {
                return;
            };

            // Dropping the slot drops its queue, which ends the writer task
            if entry.viewers.remove(&id).is_none() {
                return;
            }
            if evicted {
                entry.viewers_evicted.fetch_add(1, Ordering::Relaxed);
            }

            if entry.viewer_count() > 0 {
                tracing::debug!(
                    bin,
                    connection = id,
                    viewers = entry.viewer_count(),
                    "Viewer unregistered"
                );
                return;
            }

            let subscribed = entry.subscribed;
            bins.remove(bin);
            subscribed
        };

        if subscribed {
            if let Err(e) = self.broker.unsubscribe(bin).await {
                tracing::warn!(bin, error = %e, "Failed to unsubscribe bin");
            }
        }

        tracing::info!(bin, connection = id, "Last viewer unregistered, bin unsubscribed");
    }

    /// Start the writer task for a new viewer
    fn spawn_viewer(
        self: &Arc<Self>,
        bin: &str,
        connection: Arc<dyn ViewerConnection>,
    ) -> ViewerSlot {
        let (queue, rx) = mpsc::channel(self.config.viewer_queue_capacity.max(1));
        let writer = tokio::spawn(run_writer(
            Arc::downgrade(self),
            bin.to_string(),
            Arc::clone(&connection),
            rx,
            self.config.write_timeout,
        ));

        ViewerSlot {
            connection,
            queue,
            writer,
        }
    }
}

/// Deliver queued payloads to one viewer until its queue closes or a write fails
async fn run_writer(
    registry: Weak<SocketRegistry>,
    bin: String,
    connection: Arc<dyn ViewerConnection>,
    mut rx: mpsc::Receiver<Bytes>,
    write_timeout: std::time::Duration,
) {
    while let Some(payload) = rx.recv().await {
        let error = match tokio::time::timeout(write_timeout, connection.write(payload)).await {
            Ok(Ok(())) => continue,
            Ok(Err(e)) => e,
            Err(_) => ConnectionError::Timeout(write_timeout),
        };

        match error {
            ConnectionError::Closed => {
                tracing::debug!(bin = %bin, connection = connection.id(), "Viewer went away");
            }
            ref e => {
                tracing::warn!(
                    bin = %bin,
                    connection = connection.id(),
                    error = %e,
                    "Write to viewer failed, disconnecting"
                );
            }
        }

        if let Some(registry) = registry.upgrade() {
            registry.evict(&bin, connection).await;
        } else {
            connection.close().await;
        }
        return;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicU64};
    use std::sync::Mutex as StdMutex;
    use std::time::{Duration, Instant};

    use async_trait::async_trait;
    use tokio::time::timeout;

    use super::*;
    use crate::broker::{BrokerError, BrokerMessage};
    use crate::registry::ChannelConnection;

    /// Broker double that counts subscription changes per channel
    #[derive(Default)]
    struct CountingBroker {
        subscribes: StdMutex<HashMap<String, u32>>,
        unsubscribes: StdMutex<HashMap<String, u32>>,
        refuse: AtomicBool,
        subscribe_delay_ms: AtomicU64,
    }

    impl CountingBroker {
        fn subscribes(&self, channel: &str) -> u32 {
            *self.subscribes.lock().unwrap().get(channel).unwrap_or(&0)
        }

        fn unsubscribes(&self, channel: &str) -> u32 {
            *self.unsubscribes.lock().unwrap().get(channel).unwrap_or(&0)
        }
    }

    #[async_trait]
    impl Broker for CountingBroker {
        async fn publish(&self, _channel: &str, _payload: Bytes) -> Result<(), BrokerError> {
            Ok(())
        }

        async fn subscribe(&self, channel: &str) -> Result<(), BrokerError> {
            let delay = self.subscribe_delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            if self.refuse.load(Ordering::SeqCst) {
                return Err(BrokerError::Subscription {
                    channel: channel.to_string(),
                    reason: "refused".into(),
                });
            }
            *self
                .subscribes
                .lock()
                .unwrap()
                .entry(channel.to_string())
                .or_default() += 1;
            Ok(())
        }

        async fn unsubscribe(&self, channel: &str) -> Result<(), BrokerError> {
            *self
                .unsubscribes
                .lock()
                .unwrap()
                .entry(channel.to_string())
                .or_default() += 1;
            Ok(())
        }

        async fn receive(&self) -> Result<BrokerMessage, BrokerError> {
            Err(BrokerError::Closed)
        }
    }

    /// Connection whose writes always fail
    struct BrokenConnection {
        id: ConnectionId,
    }

    #[async_trait]
    impl ViewerConnection for BrokenConnection {
        fn id(&self) -> ConnectionId {
            self.id
        }

        async fn write(&self, _payload: Bytes) -> Result<(), ConnectionError> {
            Err(ConnectionError::Io("broken pipe".into()))
        }

        async fn close(&self) {}
    }

    /// Connection whose writes never complete
    struct StalledConnection {
        id: ConnectionId,
    }

    #[async_trait]
    impl ViewerConnection for StalledConnection {
        fn id(&self) -> ConnectionId {
            self.id
        }

        async fn write(&self, _payload: Bytes) -> Result<(), ConnectionError> {
            std::future::pending().await
        }

        async fn close(&self) {}
    }

    fn registry_with(broker: Arc<CountingBroker>) -> Arc<SocketRegistry> {
        Arc::new(SocketRegistry::new(broker))
    }

    fn viewer(id: ConnectionId) -> (Arc<ChannelConnection>, mpsc::Receiver<Bytes>) {
        let (conn, rx) = ChannelConnection::new(id, 16);
        (Arc::new(conn), rx)
    }

    async fn recv(rx: &mut mpsc::Receiver<Bytes>) -> Option<Bytes> {
        timeout(Duration::from_secs(1), rx.recv()).await.ok().flatten()
    }

    async fn wait_until_gone(registry: &SocketRegistry, bin: &str) {
        timeout(Duration::from_secs(2), async {
            while registry.has_bin(bin).await {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("bin was never removed");
    }

    #[tokio::test]
    async fn test_broadcast_to_all_viewers() {
        let registry = registry_with(Arc::new(CountingBroker::default()));
        let (a, mut rx_a) = viewer(1);
        let (b, mut rx_b) = viewer(2);

        registry.register("abcde", a).await;
        registry.register("abcde", b).await;

        let queued = registry.broadcast("abcde", Bytes::from_static(b"X")).await;
        assert_eq!(queued, 2);
        assert_eq!(recv(&mut rx_a).await.unwrap(), "X");
        assert_eq!(recv(&mut rx_b).await.unwrap(), "X");

        registry.unregister("abcde", 1).await;

        registry.broadcast("abcde", Bytes::from_static(b"Y")).await;
        assert_eq!(recv(&mut rx_b).await.unwrap(), "Y");
        assert!(recv(&mut rx_a).await.is_none());

        assert_eq!(registry.broadcast("unknown", Bytes::from_static(b"Z")).await, 0);
    }

    #[tokio::test]
    async fn test_each_payload_delivered_once() {
        let registry = registry_with(Arc::new(CountingBroker::default()));
        let (a, mut rx_a) = viewer(1);

        registry.register("abcde", a.clone()).await;
        // Duplicate registration must not double deliveries
        registry.register("abcde", a).await;

        registry.broadcast("abcde", Bytes::from_static(b"X")).await;
        assert_eq!(recv(&mut rx_a).await.unwrap(), "X");
        assert!(timeout(Duration::from_millis(50), rx_a.recv()).await.is_err());
        assert_eq!(registry.connection_count().await, 1);
    }

    #[tokio::test]
    async fn test_subscription_reference_counting() {
        let broker = Arc::new(CountingBroker::default());
        let registry = registry_with(Arc::clone(&broker));
        let (a, _rx_a) = viewer(1);
        let (b, _rx_b) = viewer(2);
        let (c, _rx_c) = viewer(3);

        registry.register("abcde", a).await;
        assert_eq!(broker.subscribes("abcde"), 1);

        registry.register("abcde", b).await;
        registry.register("abcde", c).await;
        registry.unregister("abcde", 2).await;
        registry.unregister("abcde", 3).await;
        assert_eq!(broker.subscribes("abcde"), 1);
        assert_eq!(broker.unsubscribes("abcde"), 0);
        assert!(registry.has_bin("abcde").await);

        registry.unregister("abcde", 1).await;
        assert_eq!(broker.unsubscribes("abcde"), 1);
        assert!(!registry.has_bin("abcde").await);

        // Already gone: no second unsubscribe
        registry.unregister("abcde", 1).await;
        assert_eq!(broker.unsubscribes("abcde"), 1);
    }

    #[tokio::test]
    async fn test_remaining_viewer_keeps_receiving() {
        let broker = Arc::new(CountingBroker::default());
        let registry = registry_with(Arc::clone(&broker));
        let (a, _rx_a) = viewer(1);
        let (b, mut rx_b) = viewer(2);

        registry.register("abcde", a).await;
        registry.register("abcde", b).await;
        registry.unregister("abcde", 1).await;

        assert_eq!(broker.unsubscribes("abcde"), 0);
        registry.broadcast("abcde", Bytes::from_static(b"still here")).await;
        assert_eq!(recv(&mut rx_b).await.unwrap(), "still here");
    }

    #[tokio::test]
    async fn test_subscribe_refused_is_retried() {
        let broker = Arc::new(CountingBroker {
            refuse: AtomicBool::new(true),
            ..Default::default()
        });
        let registry = registry_with(Arc::clone(&broker));
        let (a, _rx_a) = viewer(1);
        let (b, _rx_b) = viewer(2);

        registry.register("abcde", a).await;

        assert!(registry.has_bin("abcde").await);
        assert_eq!(broker.subscribes("abcde"), 0);

        broker.refuse.store(false, Ordering::SeqCst);
        registry.register("abcde", b).await;
        assert_eq!(broker.subscribes("abcde"), 1);

        registry.unregister("abcde", 1).await;
        registry.unregister("abcde", 2).await;
        assert_eq!(broker.unsubscribes("abcde"), 1);
    }

    #[tokio::test]
    async fn test_never_subscribed_bin_not_unsubscribed() {
        let broker = Arc::new(CountingBroker {
            refuse: AtomicBool::new(true),
            ..Default::default()
        });
        let registry = registry_with(Arc::clone(&broker));
        let (a, _rx_a) = viewer(1);

        registry.register("abcde", a).await;
        registry.unregister("abcde", 1).await;

        assert!(!registry.has_bin("abcde").await);
        assert_eq!(broker.unsubscribes("abcde"), 0);
    }

    #[tokio::test]
    async fn test_failed_write_evicts_only_that_viewer() {
        let broker = Arc::new(CountingBroker::default());
        let registry = registry_with(Arc::clone(&broker));
        let (good, mut rx_good) = viewer(1);

        registry.register("abcde", good).await;
        registry.register("abcde", Arc::new(BrokenConnection { id: 2 })).await;

        registry.broadcast("abcde", Bytes::from_static(b"X")).await;
        assert_eq!(recv(&mut rx_good).await.unwrap(), "X");

        timeout(Duration::from_secs(2), async {
            while registry.connection_count().await > 1 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        let stats = registry.bin_stats("abcde").await.unwrap();
        assert_eq!(stats.viewer_count, 1);
        assert_eq!(stats.viewers_evicted, 1);
        assert_eq!(broker.unsubscribes("abcde"), 0);

        registry.broadcast("abcde", Bytes::from_static(b"Y")).await;
        assert_eq!(recv(&mut rx_good).await.unwrap(), "Y");
    }

    #[tokio::test]
    async fn test_last_viewer_failure_unsubscribes() {
        let broker = Arc::new(CountingBroker::default());
        let registry = registry_with(Arc::clone(&broker));

        registry.register("abcde", Arc::new(BrokenConnection { id: 9 })).await;
        registry.broadcast("abcde", Bytes::from_static(b"X")).await;

        wait_until_gone(&registry, "abcde").await;
        assert_eq!(broker.unsubscribes("abcde"), 1);
    }

    #[tokio::test]
    async fn test_stalled_viewer_does_not_block_others() {
        let broker = Arc::new(CountingBroker::default());
        let config = RegistryConfig::default()
            .viewer_queue_capacity(2)
            .write_timeout(Duration::from_secs(60));
        let registry = Arc::new(SocketRegistry::with_config(broker, config));
        let (good, mut rx_good) = viewer(1);

        registry.register("abcde", good).await;
        registry.register("abcde", Arc::new(StalledConnection { id: 2 })).await;

        for i in 0..8u8 {
            registry.broadcast("abcde", Bytes::from(vec![i])).await;
            assert_eq!(recv(&mut rx_good).await.unwrap(), Bytes::from(vec![i]));
        }

        timeout(Duration::from_secs(2), async {
            while registry.connection_count().await > 1 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert!(registry.has_bin("abcde").await);
    }

    #[tokio::test]
    async fn test_write_timeout_evicts() {
        let broker = Arc::new(CountingBroker::default());
        let config = RegistryConfig::default().write_timeout(Duration::from_millis(20));
        let registry = Arc::new(SocketRegistry::with_config(broker, config));

        registry.register("abcde", Arc::new(StalledConnection { id: 5 })).await;
        registry.broadcast("abcde", Bytes::from_static(b"X")).await;

        wait_until_gone(&registry, "abcde").await;
    }

    #[tokio::test]
    async fn test_bins_are_independent() {
        let broker = Arc::new(CountingBroker::default());
        let registry = registry_with(Arc::clone(&broker));
        let (a, mut rx_a) = viewer(1);
        let (b, mut rx_b) = viewer(2);

        registry.register("abcde", a).await;
        registry.register("fghij", b).await;
        assert_eq!(registry.bin_count().await, 2);

        registry.broadcast("fghij", Bytes::from_static(b"F")).await;
        assert_eq!(recv(&mut rx_b).await.unwrap(), "F");
        assert!(timeout(Duration::from_millis(50), rx_a.recv()).await.is_err());

        registry.unregister("fghij", 2).await;
        assert_eq!(broker.unsubscribes("fghij"), 1);
        assert_eq!(broker.unsubscribes("abcde"), 0);
    }

    #[tokio::test]
    async fn test_per_viewer_ordering() {
        let registry = registry_with(Arc::new(CountingBroker::default()));
        let (a, mut rx_a) = viewer(1);
        registry.register("abcde", a).await;

        for i in 0..10u8 {
            registry.broadcast("abcde", Bytes::from(vec![i])).await;
        }
        for i in 0..10u8 {
            assert_eq!(recv(&mut rx_a).await.unwrap(), Bytes::from(vec![i]));
        }
    }

    #[tokio::test]
    async fn test_slow_subscribe_does_not_stall_other_bins() {
        let broker = Arc::new(CountingBroker::default());
        let registry = registry_with(Arc::clone(&broker));
        let (a, mut rx_a) = viewer(1);
        let (b, _rx_b) = viewer(2);

        registry.register("abcde", a).await;
        broker.subscribe_delay_ms.store(500, Ordering::SeqCst);

        let background = Arc::clone(&registry);
        let pending = tokio::spawn(async move { background.register("slow", b).await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let started = Instant::now();
        assert!(registry.has_bin("abcde").await);
        registry.broadcast("abcde", Bytes::from_static(b"X")).await;
        assert_eq!(recv(&mut rx_a).await.unwrap(), "X");
        assert!(started.elapsed() < Duration::from_millis(200));

        pending.await.unwrap();
        assert!(registry.has_bin("slow").await);
        assert_eq!(broker.subscribes("slow"), 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_viewers_subscribe_once() {
        let broker = Arc::new(CountingBroker::default());
        broker.subscribe_delay_ms.store(50, Ordering::SeqCst);
        let registry = registry_with(Arc::clone(&broker));
        let (a, _rx_a) = viewer(1);
        let (b, _rx_b) = viewer(2);

        tokio::join!(registry.register("abcde", a), registry.register("abcde", b));

        assert_eq!(broker.subscribes("abcde"), 1);
        assert_eq!(registry.connection_count().await, 2);

        tokio::join!(registry.unregister("abcde", 1), registry.unregister("abcde", 2));

        assert_eq!(broker.unsubscribes("abcde"), 1);
        assert!(!registry.has_bin("abcde").await);
        assert!(registry.gates.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_repeated_eviction_counted_once() {
        let registry = registry_with(Arc::new(CountingBroker::default()));
        let (a, _rx_a) = viewer(1);
        let (b, _rx_b) = viewer(2);

        registry.register("abcde", a.clone()).await;
        registry.register("abcde", b).await;

        let conn: Arc<dyn ViewerConnection> = a;
        tokio::join!(
            registry.evict("abcde", Arc::clone(&conn)),
            registry.evict("abcde", Arc::clone(&conn))
        );

        let stats = registry.bin_stats("abcde").await.unwrap();
        assert_eq!(stats.viewer_count, 1);
        assert_eq!(stats.viewers_evicted, 1);
    }

    #[tokio::test]
    async fn test_drain() {
        let broker = Arc::new(CountingBroker::default());
        let registry = registry_with(Arc::clone(&broker));
        let (a, mut rx_a) = viewer(1);
        let (b, _rx_b) = viewer(2);

        registry.register("abcde", a.clone()).await;
        registry.register("fghij", b).await;

        registry.drain().await;

        assert_eq!(registry.bin_count().await, 0);
        assert_eq!(broker.unsubscribes("abcde"), 1);
        assert_eq!(broker.unsubscribes("fghij"), 1);
        assert!(a.is_closed());
        assert!(recv(&mut rx_a).await.is_none());
    }
}
