//! Bin entry and stats types
//!
//! This module defines the per-bin state stored in the registry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::connection::{ConnectionId, ViewerConnection};

/// A registered viewer: its connection, outbound queue and writer task
pub(super) struct ViewerSlot {
    /// Connection the writer task delivers to
    pub connection: Arc<dyn ViewerConnection>,

    /// Queue drained by the writer task
    pub queue: mpsc::Sender<Bytes>,

    /// Writer task; ends once `queue` is dropped
    pub writer: JoinHandle<()>,
}

/// Entry for a single bin in the registry
pub struct BinEntry {
    /// Registered viewers keyed by connection ID
    pub(super) viewers: HashMap<ConnectionId, ViewerSlot>,

    /// Whether the broker holds a subscription for this bin
    pub(super) subscribed: bool,

    /// Payloads broadcast to this bin
    pub messages_broadcast: AtomicU64,

    /// Viewers removed because they fell behind or failed a write
    pub viewers_evicted: AtomicU64,

    /// When the first viewer registered
    pub created_at: Instant,
}

impl BinEntry {
    /// Create an entry with no viewers
    pub(super) fn new() -> Self {
        Self {
            viewers: HashMap::new(),
            subscribed: false,
            messages_broadcast: AtomicU64::new(0),
            viewers_evicted: AtomicU64::new(0),
            created_at: Instant::now(),
        }
    }

    /// Get the number of viewers
    pub fn viewer_count(&self) -> usize {
        self.viewers.len()
    }

    /// Check if a connection is registered here
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.viewers.contains_key(&id)
    }

    /// Snapshot of every viewer's connection and queue
    pub(super) fn snapshot(&self) -> Vec<(Arc<dyn ViewerConnection>, mpsc::Sender<Bytes>)> {
        self.viewers
            .values()
            .map(|slot| (Arc::clone(&slot.connection), slot.queue.clone()))
            .collect()
    }

    /// Current statistics
    pub fn stats(&self) -> BinStats {
        BinStats {
            viewer_count: self.viewer_count(),
            messages_broadcast: self.messages_broadcast.load(Ordering::Relaxed),
            viewers_evicted: self.viewers_evicted.load(Ordering::Relaxed),
            age: self.created_at.elapsed(),
        }
    }
}

/// Statistics for a bin
#[derive(Debug, Clone)]
pub struct BinStats {
    /// Number of registered viewers
    pub viewer_count: usize,
    /// Payloads broadcast since the first viewer registered
    pub messages_broadcast: u64,
    /// Viewers dropped for being slow or broken
    pub viewers_evicted: u64,
    /// Time since the first viewer registered
    pub age: Duration,
}
