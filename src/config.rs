//! Service configuration
//!
//! Every setting has a default; a JSON file only needs the ones it changes:
//!
//! ```json
//! {
//!   "viewer_queue_capacity": 128,
//!   "write_timeout_ms": 5000,
//!   "scan_workers": 4,
//!   "broker_capacity": 1024,
//!   "bin_ttl_secs": 172800
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::geo::ScannerConfig;
use crate::registry::RegistryConfig;

/// Error type for configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read config file {path}: {source}")]
    Read {
        /// Path that was read
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// File is not valid configuration JSON
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// On-disk representation; every field optional
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    viewer_queue_capacity: Option<usize>,
    write_timeout_ms: Option<u64>,
    scan_workers: Option<usize>,
    scan_parallel_threshold: Option<usize>,
    broker_capacity: Option<usize>,
    bin_ttl_secs: Option<u64>,
}

/// Configuration for the whole service
#[derive(Debug, Clone)]
pub struct GeobinConfig {
    /// Viewer fan-out settings
    pub registry: RegistryConfig,

    /// Geo scanner settings
    pub scanner: ScannerConfig,

    /// Queue depth of the in-process broker
    pub broker_capacity: usize,

    /// How long a bin lives after creation
    pub bin_ttl: Duration,
}

impl Default for GeobinConfig {
    fn default() -> Self {
        Self {
            registry: RegistryConfig::default(),
            scanner: ScannerConfig::default(),
            broker_capacity: crate::broker::memory::DEFAULT_CAPACITY,
            bin_ttl: Duration::from_secs(48 * 60 * 60),
        }
    }
}

impl GeobinConfig {
    /// Load configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&data)
    }

    /// Load configuration from a JSON string
    pub fn from_json_str(data: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_json::from_str(data)?;
        let mut config = Self::default();

        if let Some(capacity) = file.viewer_queue_capacity {
            config.registry = config.registry.viewer_queue_capacity(capacity);
        }
        if let Some(ms) = file.write_timeout_ms {
            config.registry = config.registry.write_timeout(Duration::from_millis(ms));
        }
        if let Some(workers) = file.scan_workers {
            config.scanner = config.scanner.max_workers(workers);
        }
        if let Some(threshold) = file.scan_parallel_threshold {
            config.scanner = config.scanner.parallel_threshold(threshold);
        }
        if let Some(capacity) = file.broker_capacity {
            config = config.broker_capacity(capacity);
        }
        if let Some(secs) = file.bin_ttl_secs {
            config = config.bin_ttl(Duration::from_secs(secs));
        }

        Ok(config)
    }

    /// Set the registry configuration
    pub fn registry(mut self, registry: RegistryConfig) -> Self {
        self.registry = registry;
        self
    }

    /// Set the scanner configuration
    pub fn scanner(mut self, scanner: ScannerConfig) -> Self {
        self.scanner = scanner;
        self
    }

    /// Set the in-process broker queue depth
    pub fn broker_capacity(mut self, capacity: usize) -> Self {
        self.broker_capacity = capacity.max(1);
        self
    }

    /// Set the bin time-to-live
    pub fn bin_ttl(mut self, ttl: Duration) -> Self {
        self.bin_ttl = ttl;
        self
    }
}
