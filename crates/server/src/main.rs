//! offcache server entry point.
//!
//! Boots the cache store, registers the worker for the configured version,
//! starts the janitor and serves the MCP tools on stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use offcache_client::{FetchClient, FetchConfig, Network};
use offcache_core::{AppConfig, CacheDb};
use offcache_worker::{Clients, Janitor, Registration, Worker, WorkerSettings};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

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
    tracing::info!(version = %config.version, origin = %config.origin, "Starting offcache on stdio transport");

    let store = CacheDb::open(&config.db_path).await?;
    let network: Arc<dyn Network> = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let settings = WorkerSettings::from_config(&config)?;
    let registration = Arc::new(Registration::new(settings.origin.clone(), network.clone()));

    let clients = Clients::new();
    let (host, mut outbound) = clients.connect().await;
    tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            tracing::info!(client = host, ?message, "outbound message");
        }
    });

    let worker = Arc::new(Worker::new(settings, store.clone(), network, clients));
    match registration.register(worker).await {
        Ok(report) => tracing::info!(
            version = %report.version,
            assets = report.assets,
            deleted = report.deleted.len(),
            claimed = report.claimed,
            "worker active"
        ),
        Err(e) => tracing::error!(error = %e, "worker registration failed; requests pass through"),
    }

    let shutdown = CancellationToken::new();
    let janitor = Arc::new(Janitor::from_config(store.clone(), &config).with_cancellation(shutdown.clone()));
    let janitor_task = janitor.clone().start();

    let handler = handler::ShimServer::new(registration, store, janitor);
    let server = serve_server(handler, stdio()).await?;
    server.waiting().await?;

    shutdown.cancel();
    janitor_task.await?;

    Ok(())
}
