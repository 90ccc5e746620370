//! Durable per-bin log boundary
//!
//! Each bin is an ordered set of serialized records scored by timestamp.
//! Expiry of whole bins belongs to the store.

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryStore;

/// Error type for store operations
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Store could not be reached or refused the command
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Command failed for a specific bin
    #[error("store command on {bin} failed: {reason}")]
    Command {
        /// Bin the command targeted
        bin: String,
        /// Store-specific reason
        reason: String,
    },
}

/// Ordered per-bin log
#[async_trait]
pub trait Store: Send + Sync {
    /// Append `value` to `bin` with `score`
    async fn append(&self, bin: &str, score: i64, value: String) -> Result<(), StoreError>;

    /// All values of `bin`, highest score first
    async fn read_descending(&self, bin: &str) -> Result<Vec<String>, StoreError>;

    /// Whether `bin` exists
    async fn exists(&self, bin: &str) -> Result<bool, StoreError>;
}
