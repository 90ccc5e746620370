//! In-process bin with one live viewer
//!
//! Run with: cargo run --example simple_bin [CONFIG_JSON]
//!
//! Creates a bin, attaches a viewer, ingests a handful of request bodies and
//! prints what the viewer receives along with the bin's history.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use geobin::broker::MemoryBroker;
use geobin::registry::ChannelConnection;
use geobin::store::MemoryStore;
use geobin::{EventDistributor, GeobinConfig, GeoScanner, IngestionPipeline, Record, SocketRegistry};

const BIN: &str = "demo";

const SAMPLES: &[&str] = &[
    "hello world",
    r#"{"lat": 45.5231, "lng": -122.6765}"#,
    r#"{"device": {"id": 7, "location": {"latitude": 51.5, "longitude": -0.12, "acc": 30}}}"#,
    r#"{"type": "Feature", "geometry": {"type": "Point", "coordinates": [2.35, 48.85]}, "properties": {"name": "Paris"}}"#,
    r#"{"trail": [{"coords": [-73.98, 40.75]}, {"coords": [-73.97, 40.76]}]}"#,
];

fn print_usage() {
    eprintln!("Usage: simple_bin [CONFIG_JSON]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  CONFIG_JSON  Optional configuration file (defaults apply otherwise)");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("geobin=debug".parse()?)
                .add_directive("simple_bin=debug".parse()?),
        )
        .init();

    let config = match args.get(1) {
        Some(path) => GeobinConfig::from_json_file(path)?,
        None => GeobinConfig::default(),
    };

    let broker = Arc::new(MemoryBroker::with_capacity(config.broker_capacity));
    let store = Arc::new(MemoryStore::new());
    let registry = Arc::new(SocketRegistry::with_config(
        broker.clone(),
        config.registry.clone(),
    ));

    let distributor = Arc::new(EventDistributor::new(registry.clone(), broker.clone()));
    let distributor_task = Arc::clone(&distributor).spawn();

    let pipeline = IngestionPipeline::new(
        GeoScanner::with_config(config.scanner.clone()),
        store.clone(),
        broker.clone(),
    );

    store.create_bin(BIN, config.bin_ttl).await;
    println!("Created bin '{}' (ttl {:?})", BIN, config.bin_ttl);

    // Attach a viewer and print everything it receives
    let (viewer, mut viewer_rx) = ChannelConnection::new(1, 16);
    registry.register(BIN, Arc::new(viewer)).await;

    let printer = tokio::spawn(async move {
        while let Some(payload) = viewer_rx.recv().await {
            let text = String::from_utf8_lossy(&payload);
            match serde_json::from_str::<Record>(&text) {
                Ok(record) => println!(
                    "[viewer] record ts={} body={:?} geo={}",
                    record.timestamp,
                    record.body,
                    record.geo.len()
                ),
                Err(_) => println!("[viewer] raw payload: {}", text),
            }
        }
        println!("[viewer] disconnected");
    });

    for (i, body) in SAMPLES.iter().copied().enumerate() {
        let headers = Record::flatten_headers(vec![
            ("Content-Type", "application/json"),
            ("X-Sample", "geobin"),
        ]);
        let report = pipeline
            .ingest(BIN, i as i64 + 1, headers, Bytes::from_static(body.as_bytes()))
            .await?;

        for feature in &report.record.geo {
            println!(
                "[ingest] {} at {:?} radius={:?}",
                feature.kind().unwrap_or("?"),
                feature.path(),
                feature.radius()
            );
        }
        if !report.is_complete() {
            eprintln!("[ingest] partial delivery: {:?}", report);
        }
    }

    println!();
    println!("Waiting for live delivery (Ctrl+C to stop early)...");
    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(1)) => {}
        _ = tokio::signal::ctrl_c() => {
            println!("\nShutting down...");
        }
    }

    println!();
    println!("History (newest first):");
    for record in pipeline.history(BIN).await? {
        println!("  ts={} body={}", record.timestamp, record.body);
    }

    if let Some(stats) = registry.bin_stats(BIN).await {
        println!();
        println!(
            "Stats: viewers={} broadcast={} evicted={}",
            stats.viewer_count, stats.messages_broadcast, stats.viewers_evicted
        );
    }

    registry.drain().await;
    distributor_task.abort();
    let _ = printer.await;

    Ok(())
}
