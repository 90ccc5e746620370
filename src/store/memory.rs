//! In-process store
//!
//! Keeps each bin as a score-ordered list. Bins created through
//! [`MemoryStore::create_bin`] get a placeholder member with score 0 and
//! disappear once their time-to-live has passed.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Store, StoreError};

/// Value of the member that marks a freshly created bin
pub const PLACEHOLDER: &str = "";

#[derive(Debug)]
struct BinLog {
    /// (score, value), ascending by score, insertion order within a score
    members: Vec<(i64, String)>,
    expires_at: Option<Instant>,
}

impl BinLog {
    fn new(expires_at: Option<Instant>) -> Self {
        Self {
            members: Vec::new(),
            expires_at,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    fn insert(&mut self, score: i64, value: String) {
        let at = self.members.partition_point(|(s, _)| *s <= score);
        self.members.insert(at, (score, value));
    }
}

/// In-process [`Store`] implementation
#[derive(Debug, Default)]
pub struct MemoryStore {
    bins: RwLock<HashMap<String, BinLog>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bin that expires after `ttl`
    pub async fn create_bin(&self, bin: &str, ttl: Duration) {
        let mut log = BinLog::new(Some(Instant::now() + ttl));
        log.insert(0, PLACEHOLDER.to_string());
        self.bins.write().await.insert(bin.to_string(), log);

        tracing::debug!(bin, ttl_secs = ttl.as_secs(), "Bin created");
    }

    /// Drop expired bins
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut bins = self.bins.write().await;
        let before = bins.len();
        bins.retain(|_, log| !log.is_expired(now));
        before - bins.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn append(&self, bin: &str, score: i64, value: String) -> Result<(), StoreError> {
        let now = Instant::now();
        let mut bins = self.bins.write().await;
        let log = bins
            .entry(bin.to_string())
            .or_insert_with(|| BinLog::new(None));
        if log.is_expired(now) {
            *log = BinLog::new(None);
        }
        log.insert(score, value);
        Ok(())
    }

    async fn read_descending(&self, bin: &str) -> Result<Vec<String>, StoreError> {
        let now = Instant::now();
        let bins = self.bins.read().await;
        Ok(bins
            .get(bin)
            .filter(|log| !log.is_expired(now))
            .map(|log| log.members.iter().rev().map(|(_, v)| v.clone()).collect())
            .unwrap_or_default())
    }

    async fn exists(&self, bin: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        let bins = self.bins.read().await;
        Ok(bins.get(bin).is_some_and(|log| !log.is_expired(now)))
    }
}
