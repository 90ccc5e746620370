//! Broker-to-viewer event distribution
//!
//! A single loop reads the broker's message stream and hands each message to
//! the registry for the bin it was published on. Messages for one bin are
//! broadcast in the order the broker delivered them. The loop only ever waits
//! on the broker; viewer delivery happens on the viewers' own writer tasks.

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;

use crate::broker::{Broker, BrokerError};
use crate::registry::SocketRegistry;

/// Why the distribution loop stopped
#[derive(Debug, Clone, Error)]
pub enum DistributorError {
    /// Broker receive failed; the loop cannot continue
    #[error("broker receive failed: {0}")]
    Receive(#[source] BrokerError),
}

/// Counters for one run of the distribution loop
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistributorStats {
    /// Messages received from the broker
    pub received: u64,
    /// Messages for bins with at least one viewer
    pub routed: u64,
    /// Messages for bins with no viewers
    pub unknown_channel: u64,
}

/// Consumes broker messages and broadcasts them to viewers
pub struct EventDistributor {
    registry: Arc<SocketRegistry>,
    broker: Arc<dyn Broker>,
}

impl EventDistributor {
    /// Create a distributor over `broker` delivering through `registry`
    pub fn new(registry: Arc<SocketRegistry>, broker: Arc<dyn Broker>) -> Self {
        Self { registry, broker }
    }

    /// Run until the broker stream fails
    ///
    /// Always returns an error: a broker failure is fatal for distribution
    /// and the caller decides whether to restart or shut down.
    pub async fn run(&self) -> Result<DistributorStats, DistributorError> {
        let mut stats = DistributorStats::default();
        tracing::info!("Event distributor started");

        let error = self.pump(&mut stats).await;

        tracing::error!(
            error = %error,
            received = stats.received,
            routed = stats.routed,
            "Event distributor stopped"
        );
        Err(error)
    }

    /// Run until `shutdown` resolves or the broker stream fails
    ///
    /// Returns the loop counters on a clean shutdown.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<DistributorStats, DistributorError>
    where
        F: Future<Output = ()>,
    {
        let mut stats = DistributorStats::default();
        tracing::info!("Event distributor started");

        let result = tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            error = self.pump(&mut stats) => Err(error),
        };

        match result {
            Ok(()) => {
                tracing::info!(
                    received = stats.received,
                    routed = stats.routed,
                    "Event distributor stopped"
                );
                Ok(stats)
            }
            Err(error) => {
                tracing::error!(error = %error, "Event distributor stopped");
                Err(error)
            }
        }
    }

    /// Spawn the loop on the runtime
    ///
    /// Returns a handle that can be used to abort the task or collect the
    /// terminal error.
    pub fn spawn(
        self: Arc<Self>,
    ) -> tokio::task::JoinHandle<Result<DistributorStats, DistributorError>> {
        tokio::spawn(async move { self.run().await })
    }

    async fn pump(&self, stats: &mut DistributorStats) -> DistributorError {
        loop {
            let message = match self.broker.receive().await {
                Ok(message) => message,
                Err(e) => return DistributorError::Receive(e),
            };
            stats.received += 1;

            if !self.registry.has_bin(&message.channel).await {
                stats.unknown_channel += 1;
                tracing::debug!(bin = %message.channel, "Message for bin with no viewers, dropped");
                continue;
            }

            let queued = self
                .registry
                .broadcast(&message.channel, message.payload)
                .await;
            stats.routed += 1;

            tracing::debug!(bin = %message.channel, viewers = queued, "Message distributed");
        }
    }
}
