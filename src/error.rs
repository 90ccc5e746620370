//! Error types
//!
//! Each external boundary (store, broker, viewer connection) has its own error
//! enum. [`Error`] wraps them for callers that just want to bubble up.

use thiserror::Error;

pub use crate::broker::BrokerError;
pub use crate::config::ConfigError;
pub use crate::registry::ConnectionError;
pub use crate::store::StoreError;

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-level error
#[derive(Debug, Error)]
pub enum Error {
    /// Bin does not exist in the store
    #[error("bin not found: {0}")]
    BinNotFound(String),

    /// Store failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Broker failure
    #[error(transparent)]
    Broker(#[from] BrokerError),

    /// Configuration failure
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Event distribution stopped
    #[error(transparent)]
    Distributor(#[from] crate::distributor::DistributorError),

    /// Record could not be serialized
    #[error("record encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    /// Blocking geo scan task panicked or was cancelled
    #[error("geo scan task failed: {0}")]
    ScanTask(#[from] tokio::task::JoinError),
}
