//! Viewer connections
//!
//! A viewer connection is owned by whatever accepted it (typically a
//! WebSocket handler). The registry only writes payloads to it and closes it
//! when a write fails.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

/// Opaque connection handle
pub type ConnectionId = u64;

/// Error type for viewer writes
#[derive(Debug, Clone, Error)]
pub enum ConnectionError {
    /// Connection is closed
    #[error("connection closed")]
    Closed,

    /// Write did not complete in time
    #[error("write timed out after {0:?}")]
    Timeout(Duration),

    /// Transport failure
    #[error("write failed: {0}")]
    Io(String),
}

/// Outbound side of a live viewer
#[async_trait]
pub trait ViewerConnection: Send + Sync {
    /// Stable identifier of this connection
    fn id(&self) -> ConnectionId;

    /// Deliver one payload
    async fn write(&self, payload: Bytes) -> Result<(), ConnectionError>;

    /// Close the connection; later calls are no-ops
    async fn close(&self);
}

type CloseCallback = Box<dyn FnOnce(ConnectionId) + Send>;

/// Viewer connection backed by an mpsc channel
///
/// The acceptor keeps the receiving half and pumps it into the real socket.
/// Dropping the receiver makes subsequent writes fail with
/// [`ConnectionError::Closed`].
pub struct ChannelConnection {
    id: ConnectionId,
    tx: Mutex<Option<mpsc::Sender<Bytes>>>,
    closed: AtomicBool,
    on_close: Mutex<Option<CloseCallback>>,
}

impl ChannelConnection {
    /// Create a connection and the receiver its payloads arrive on
    pub fn new(id: ConnectionId, capacity: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let conn = Self {
            id,
            tx: Mutex::new(Some(tx)),
            closed: AtomicBool::new(false),
            on_close: Mutex::new(None),
        };
        (conn, rx)
    }

    /// Install the close notification
    ///
    /// Invoked exactly once, from the first `close` call.
    pub async fn set_on_close<F>(&self, callback: F)
    where
        F: FnOnce(ConnectionId) + Send + 'static,
    {
        *self.on_close.lock().await = Some(Box::new(callback));
    }

    /// Check if the connection has been closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl ViewerConnection for ChannelConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    async fn write(&self, payload: Bytes) -> Result<(), ConnectionError> {
        let tx = self.tx.lock().await.clone().ok_or(ConnectionError::Closed)?;
        tx.send(payload).await.map_err(|_| ConnectionError::Closed)
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        self.tx.lock().await.take();
        tracing::debug!(connection = self.id, "Viewer connection closed");

        if let Some(callback) = self.on_close.lock().await.take() {
            callback(self.id);
        }
    }
}
