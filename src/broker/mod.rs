//! Publish/subscribe broker boundary
//!
//! The broker carries one message per bin name from the ingestion path to the
//! event distributor. Any transport with channel subscribe/unsubscribe and a
//! single receive stream over all subscribed channels fits behind [`Broker`].

pub mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use memory::MemoryBroker;

/// Error type for broker operations
#[derive(Debug, Clone, Error)]
pub enum BrokerError {
    /// The receive stream has ended
    #[error("broker connection closed")]
    Closed,

    /// Publish could not be delivered to the broker
    #[error("publish to {channel} failed: {reason}")]
    Publish {
        /// Target channel
        channel: String,
        /// Transport-specific reason
        reason: String,
    },

    /// Subscribe or unsubscribe was refused
    #[error("subscription change for {channel} failed: {reason}")]
    Subscription {
        /// Target channel
        channel: String,
        /// Transport-specific reason
        reason: String,
    },

    /// Any other transport failure
    #[error("broker transport error: {0}")]
    Transport(String),
}

/// A message received from a subscribed channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerMessage {
    /// Channel (bin name) the message was published on
    pub channel: String,
    /// Serialized record
    pub payload: Bytes,
}

impl BrokerMessage {
    /// Create a new message
    pub fn new(channel: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            channel: channel.into(),
            payload: payload.into(),
        }
    }
}

/// Publish/subscribe transport
#[async_trait]
pub trait Broker: Send + Sync {
    /// Publish `payload` on `channel`
    async fn publish(&self, channel: &str, payload: Bytes) -> Result<(), BrokerError>;

    /// Start receiving messages for `channel`
    async fn subscribe(&self, channel: &str) -> Result<(), BrokerError>;

    /// Stop receiving messages for `channel`
    async fn unsubscribe(&self, channel: &str) -> Result<(), BrokerError>;

    /// Wait for the next message on any subscribed channel
    ///
    /// An error ends the stream.
    async fn receive(&self) -> Result<BrokerMessage, BrokerError>;
}
