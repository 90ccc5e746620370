//! In-process broker
//!
//! Messages published on a subscribed channel are queued on a bounded mpsc
//! channel and handed out by [`MemoryBroker::receive`]. Publishing on a
//! channel with no subscription drops the message, like a real pub/sub
//! server would.

use std::collections::HashSet;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{mpsc, Mutex, RwLock};

use super::{Broker, BrokerError, BrokerMessage};

/// Default queue depth between publishers and the receiver
pub const DEFAULT_CAPACITY: usize = 1024;

/// In-process [`Broker`] implementation
pub struct MemoryBroker {
    subscriptions: RwLock<HashSet<String>>,
    tx: RwLock<Option<mpsc::Sender<BrokerMessage>>>,
    rx: Mutex<mpsc::Receiver<BrokerMessage>>,
}

impl MemoryBroker {
    /// Create a broker with the default queue depth
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a broker with a custom queue depth
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            subscriptions: RwLock::new(HashSet::new()),
            tx: RwLock::new(Some(tx)),
            rx: Mutex::new(rx),
        }
    }

    /// Check if a channel is currently subscribed
    pub async fn is_subscribed(&self, channel: &str) -> bool {
        self.subscriptions.read().await.contains(channel)
    }

    /// Number of subscribed channels
    pub async fn subscription_count(&self) -> usize {
        self.subscriptions.read().await.len()
    }

    /// Close the broker
    ///
    /// Queued messages are still delivered; after that `receive` returns
    /// [`BrokerError::Closed`].
    pub async fn close(&self) {
        self.tx.write().await.take();
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn publish(&self, channel: &str, payload: Bytes) -> Result<(), BrokerError> {
        if !self.is_subscribed(channel).await {
            tracing::trace!(channel, "Publish with no subscription, dropped");
            return Ok(());
        }

        let tx = self.tx.read().await.clone().ok_or(BrokerError::Closed)?;
        tx.send(BrokerMessage::new(channel, payload))
            .await
            .map_err(|_| BrokerError::Closed)
    }

    async fn subscribe(&self, channel: &str) -> Result<(), BrokerError> {
        if self.tx.read().await.is_none() {
            return Err(BrokerError::Closed);
        }
        self.subscriptions.write().await.insert(channel.to_string());
        Ok(())
    }

    async fn unsubscribe(&self, channel: &str) -> Result<(), BrokerError> {
        self.subscriptions.write().await.remove(channel);
        Ok(())
    }

    async fn receive(&self) -> Result<BrokerMessage, BrokerError> {
        self.rx.lock().await.recv().await.ok_or(BrokerError::Closed)
    }
}
