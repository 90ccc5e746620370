//! Registry configuration

use std::time::Duration;

/// Configuration for the socket registry
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Payloads queued per viewer before it counts as too slow and is dropped
    pub viewer_queue_capacity: usize,

    /// Longest a single write to a viewer may take
    pub write_timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            viewer_queue_capacity: 64,
            write_timeout: Duration::from_secs(10),
        }
    }
}

impl RegistryConfig {
    /// Set the per-viewer queue capacity
    pub fn viewer_queue_capacity(mut self, capacity: usize) -> Self {
        self.viewer_queue_capacity = capacity.max(1);
        self
    }

    /// Set the per-write timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }
}
