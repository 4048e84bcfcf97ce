//! Fleetwatch - Server Inventory and Status Monitoring
//!
//! A Rust port of a Go-based internal server manager.

mod cache;
mod config;
mod db;
mod inventory;
mod monitor;
mod probe;
mod uptime;
mod web;

use cache::{CacheTransport, ListCache, MemoryTransport};
use config::ServerConfig;
use db::{SqliteEventLog, StatusEventLog, Store};
use inventory::InventoryService;
use monitor::Monitor;
use uptime::{StatusChangeRecorder, UptimeCalculator};
use web::Server;

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("fleetwatch=info".parse()?))
        .init();

    // Load configuration
    let cfg = ServerConfig::load();
    tracing::info!("Starting fleetwatch on port {}...", cfg.http_port);
    tracing::info!("Using database at {}", cfg.db_path);
    tracing::info!("Uptime day boundaries in {}", cfg.timezone);

    // Initialize the source of truth and the event log
    let store = Arc::new(Store::new(&cfg.db_path)?);
    let event_log: Arc<dyn StatusEventLog> = Arc::new(SqliteEventLog::new(&cfg.db_path)?);
    tracing::info!("Database initialized successfully");

    // Wire up the core components
    let transport: Arc<dyn CacheTransport> = Arc::new(MemoryTransport::new());
    let list_cache = Arc::new(ListCache::new(transport, cfg.cache_ttl));
    let recorder = Arc::new(StatusChangeRecorder::new(event_log.clone()));
    let calculator = UptimeCalculator::new(event_log.clone(), cfg.timezone);
    let service = Arc::new(InventoryService::new(
        store.clone(),
        list_cache.clone(),
        recorder.clone(),
        calculator,
        event_log,
    ));

    let servers = store.get_servers()?;
    tracing::info!("Monitoring {} servers", servers.len());

    // Start the health sweep
    let monitor = Monitor::new(
        store,
        list_cache,
        recorder,
        cfg.check_interval,
        cfg.probe_timeout,
    );
    monitor.start();

    // Start web server
    let server = Server::new(cfg, service);
    server.start().await?;

    Ok(())
}
