//! Request ingestion
//!
//! Turns a captured request into a [`Record`], stores it in the bin's log and
//! publishes it to the bin's channel. The store and the broker are independent
//! handoffs: one failing does not stop or undo the other.

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;

use crate::broker::{Broker, BrokerError};
use crate::error::{Error, Result};
use crate::geo::{GeoFeature, GeoScanner};
use crate::record::Record;
use crate::store::{memory::PLACEHOLDER, Store, StoreError};

/// Outcome of ingesting one request
#[derive(Debug)]
pub struct IngestReport {
    /// Record built from the request
    pub record: Record,

    /// Set if appending to the bin's log failed
    pub store_error: Option<StoreError>,

    /// Set if publishing to the bin's channel failed
    pub publish_error: Option<BrokerError>,
}

impl IngestReport {
    /// True when both the store and the broker accepted the record
    pub fn is_complete(&self) -> bool {
        self.store_error.is_none() && self.publish_error.is_none()
    }
}

/// Builds, stores and publishes records for captured requests
pub struct IngestionPipeline {
    scanner: Arc<GeoScanner>,
    store: Arc<dyn Store>,
    broker: Arc<dyn Broker>,
}

impl IngestionPipeline {
    /// Create a pipeline
    pub fn new(scanner: GeoScanner, store: Arc<dyn Store>, broker: Arc<dyn Broker>) -> Self {
        Self {
            scanner: Arc::new(scanner),
            store,
            broker,
        }
    }

    /// Ingest a request received now
    pub async fn ingest_now(
        &self,
        bin: &str,
        headers: BTreeMap<String, String>,
        body: Bytes,
    ) -> Result<IngestReport> {
        let timestamp = chrono::Utc::now().timestamp();
        self.ingest(bin, timestamp, headers, body).await
    }

    /// Ingest a request
    ///
    /// A body that is not JSON simply yields no geo features. Store and
    /// publish failures are reported in the returned [`IngestReport`];
    /// `Err` is reserved for the record itself not being buildable.
    pub async fn ingest(
        &self,
        bin: &str,
        timestamp: i64,
        headers: BTreeMap<String, String>,
        body: Bytes,
    ) -> Result<IngestReport> {
        let geo = self.detect_geo(bin, &body).await?;
        let record = Record::new(timestamp, headers, &body, geo);
        let encoded = record.to_json()?;

        let store_error = self
            .store
            .append(bin, timestamp, encoded.clone())
            .await
            .err();
        if let Some(ref e) = store_error {
            tracing::warn!(bin, error = %e, "Failed to append record to bin");
        }

        let publish_error = self
            .broker
            .publish(bin, Bytes::from(encoded))
            .await
            .err();
        if let Some(ref e) = publish_error {
            tracing::warn!(bin, error = %e, "Failed to publish record");
        }

        tracing::debug!(
            bin,
            timestamp,
            has_geo = record.has_geo(),
            features = record.geo.len(),
            stored = store_error.is_none(),
            published = publish_error.is_none(),
            "Request ingested"
        );

        Ok(IngestReport {
            record,
            store_error,
            publish_error,
        })
    }

    /// All records of a bin, newest first
    ///
    /// Members that fail to decode are skipped.
    pub async fn history(&self, bin: &str) -> Result<Vec<Record>> {
        if !self.store.exists(bin).await? {
            return Err(Error::BinNotFound(bin.to_string()));
        }

        let values = self.store.read_descending(bin).await?;
        let mut records = Vec::with_capacity(values.len());

        for value in values {
            if value == PLACEHOLDER {
                continue;
            }
            match Record::from_json(&value) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(bin, error = %e, "Skipping undecodable history entry");
                }
            }
        }

        Ok(records)
    }

    async fn detect_geo(&self, bin: &str, body: &Bytes) -> Result<Vec<GeoFeature>> {
        let document: Value = match serde_json::from_slice(body) {
            Ok(document) => document,
            Err(e) => {
                tracing::debug!(bin, error = %e, "Body is not JSON, skipping geo detection");
                return Ok(Vec::new());
            }
        };

        let scanner = Arc::clone(&self.scanner);
        let features = tokio::task::spawn_blocking(move || scanner.scan(&document)).await?;
        Ok(features)
    }
}
