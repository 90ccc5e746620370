//! Geo feature scanner
//!
//! Walks a parsed JSON document and collects every geographic feature it
//! contains. Each object is tried as typed GeoJSON first, then as loose
//! lat/lng fields; only objects matching neither are descended into.
//!
//! The walk is iterative over an explicit work stack, so document depth never
//! turns into call-stack depth. Wide documents are split at the root into
//! chunks walked on the scanner's rayon pool. The pool has `max_workers`
//! threads and is shared by every clone of the scanner, so concurrent scans
//! never run more traversal workers than that.

use std::sync::Arc;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde_json::Value;

use super::feature::{GeoFeature, RequestPath};
use super::geojson::{self, GeoJsonCheck};
use super::heuristic;

/// Scanner tuning
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Number of traversal worker threads (minimum 1)
    pub max_workers: usize,

    /// Root must have at least this many children before the walk is split
    pub parallel_threshold: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        let available = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            max_workers: available.clamp(1, 8),
            parallel_threshold: 64,
        }
    }
}

impl ScannerConfig {
    /// Set the number of traversal worker threads
    pub fn max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers.max(1);
        self
    }

    /// Set the root width needed before the walk is split across workers
    pub fn parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }
}

/// A node waiting to be visited
type Pending<'a> = (&'a Value, RequestPath);

/// Extracts geo features from arbitrary JSON documents
///
/// Cloning is cheap; clones share the worker pool.
#[derive(Debug, Clone)]
pub struct GeoScanner {
    config: ScannerConfig,
    pool: Option<Arc<ThreadPool>>,
}

impl Default for GeoScanner {
    fn default() -> Self {
        Self::with_config(ScannerConfig::default())
    }
}

impl GeoScanner {
    /// Create a scanner with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scanner with custom configuration
    ///
    /// With a single worker, or if the pool cannot be started, every scan
    /// runs on the calling thread.
    pub fn with_config(config: ScannerConfig) -> Self {
        let pool = if config.max_workers > 1 {
            match ThreadPoolBuilder::new()
                .num_threads(config.max_workers)
                .thread_name(|i| format!("geo-scan-{}", i))
                .build()
            {
                Ok(pool) => Some(Arc::new(pool)),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to start geo scan pool, scanning inline");
                    None
                }
            }
        } else {
            None
        };

        Self { config, pool }
    }

    /// Get the scanner configuration
    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Number of threads traversal can run on at once
    pub fn worker_threads(&self) -> usize {
        self.pool
            .as_ref()
            .map_or(1, |pool| pool.current_num_threads())
    }

    /// Collect every geo feature in `document`
    ///
    /// Order of the result is not meaningful; features are identified by
    /// their path.
    pub fn scan(&self, document: &Value) -> Vec<GeoFeature> {
        let mut found = Vec::new();
        let mut pending = Vec::new();

        // The root itself may be a feature, in which case nothing is pending
        visit(document, RequestPath::new(), &mut pending, &mut found);

        let pool = match &self.pool {
            Some(pool) if pending.len() >= self.config.parallel_threshold.max(2) => pool,
            _ => {
                walk(pending, &mut found);
                return found;
            }
        };

        // Stack order is reversed; restore key order before chunking
        pending.reverse();
        let workers = pool.current_num_threads().min(pending.len());
        let chunk_size = pending.len().div_ceil(workers);

        tracing::trace!(
            children = pending.len(),
            workers,
            "Splitting geo scan across workers"
        );

        let parts: Vec<Vec<GeoFeature>> = pool.install(|| {
            pending
                .par_chunks(chunk_size)
                .map(|chunk| {
                    let mut stack = chunk.to_vec();
                    stack.reverse();
                    let mut part = Vec::new();
                    walk(stack, &mut part);
                    part
                })
                .collect()
        });

        found.extend(parts.into_iter().flatten());
        found
    }
}

/// Drain the work stack depth-first
fn walk<'a>(mut stack: Vec<Pending<'a>>, found: &mut Vec<GeoFeature>) {
    while let Some((value, path)) = stack.pop() {
        visit(value, path, &mut stack, found);
    }
}

/// Examine one node: record it as a feature or queue its children
fn visit<'a>(
    value: &'a Value,
    path: RequestPath,
    stack: &mut Vec<Pending<'a>>,
    found: &mut Vec<GeoFeature>,
) {
    match value {
        Value::Object(object) => {
            if geojson::check(object) == GeoJsonCheck::Valid {
                tracing::trace!(?path, kind = ?object.get("type"), "Found GeoJSON");
                found.push(GeoFeature::from_geojson(object.clone(), path));
                return;
            }

            if let Some(point) = heuristic::detect(object) {
                tracing::trace!(
                    ?path,
                    lat = point.lat,
                    lng = point.lng,
                    "Found loose coordinates"
                );
                found.push(GeoFeature::point(point.lng, point.lat, point.radius, path));
                return;
            }

            // Pushed in reverse so children pop in key order
            for (key, child) in object.iter().rev() {
                if child.is_object() || child.is_array() {
                    let mut child_path = path.clone();
                    child_path.push(key.as_str().into());
                    stack.push((child, child_path));
                }
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate().rev() {
                if child.is_object() || child.is_array() {
                    let mut child_path = path.clone();
                    child_path.push(index.into());
                    stack.push((child, child_path));
                }
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {}
    }
}
