//! swcache server entry point.
//!
//! Loads configuration, opens the bucket store, installs and activates the
//! worker, then serves worker events as MCP tools on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use swcache_client::{FetchClient, FetchConfig, ServiceWorker, WorkerConfig};
use swcache_core::{AppConfig, CacheDb};
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        version = %config.cache_version,
        db = %config.db_path.display(),
        origin = %config.origin,
        "starting swcache on stdio transport"
    );

    let store = CacheDb::open(&config.db_path).await?;
    let network = FetchClient::new(FetchConfig::from_app(&config))?;
    let worker = Arc::new(ServiceWorker::new(WorkerConfig::from_app(&config)?, store, Arc::new(network)));

    let startup = worker.start().await;
    tracing::info!(
        cached = startup.precache.cached,
        failed = startup.precache.failed.len(),
        deleted = startup.activation.deleted.len(),
        "worker ready"
    );

    let handler = handler::SwCacheServer::new(Arc::clone(&worker));
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    let drained = worker.drain_background().await;
    tracing::info!(drained, "shut down");

    Ok(())
}
