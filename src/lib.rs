//! Geobin core
//!
//! Captures HTTP requests into per-bin logs, detects geographic features in
//! their JSON bodies and streams every new record to the viewers watching the
//! bin in real time.
//!
//! ```text
//!  request ──► IngestionPipeline ──► Store (bin log, newest first)
//!                     │
//!                     └──► Broker ──► EventDistributor ──► SocketRegistry ──► viewers
//! ```
//!
//! The store and broker are trait boundaries; [`store::MemoryStore`] and
//! [`broker::MemoryBroker`] are in-process implementations.
//!
//! # Example
//!
//! ```no_run
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//!
//! use bytes::Bytes;
//! use geobin::broker::MemoryBroker;
//! use geobin::geo::GeoScanner;
//! use geobin::store::MemoryStore;
//! use geobin::{EventDistributor, IngestionPipeline, SocketRegistry};
//!
//! # async fn demo() -> geobin::Result<()> {
//! let broker = Arc::new(MemoryBroker::new());
//! let store = Arc::new(MemoryStore::new());
//! let registry = Arc::new(SocketRegistry::new(broker.clone()));
//!
//! let distributor = Arc::new(EventDistributor::new(registry.clone(), broker.clone()));
//! let _loop = distributor.spawn();
//!
//! let pipeline = IngestionPipeline::new(GeoScanner::new(), store, broker);
//! let body = Bytes::from_static(br#"{"lat": 45.5, "lng": -122.6}"#);
//! let report = pipeline.ingest_now("abcde", BTreeMap::new(), body).await?;
//! assert_eq!(report.record.geo.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod broker;
pub mod config;
pub mod distributor;
pub mod error;
pub mod geo;
pub mod pipeline;
pub mod record;
pub mod registry;
pub mod store;

pub use config::GeobinConfig;
pub use distributor::{DistributorError, DistributorStats, EventDistributor};
pub use error::{Error, Result};
pub use geo::{GeoFeature, GeoScanner};
pub use pipeline::{IngestReport, IngestionPipeline};
pub use record::Record;
pub use registry::{SocketRegistry, ViewerConnection};
