//! folio-sw host entry point.
//!
//! Loads configuration, registers the worker and serves it as an MCP server
//! on stdio, then waits for outstanding background tasks once the client
//! disconnects. Logging goes to stderr to avoid interfering with the JSON-RPC
//! protocol on stdout.

use anyhow::Result;
use folio_core::AppConfig;
use folio_worker::{TracingSink, register};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let registration = register(&config, Arc::new(TracingSink)).await?;
    let origin = config.origin_url()?;

    tracing::info!(scope = %registration.scope, state = ?registration.worker.state(), "Starting folio-sw on stdio transport");

    let background = tools::Background::default();
    let handler = handler::FolioServer::new(registration.worker, background.clone(), origin, config.sync_tag.clone());
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    let settled = background.drain().await;
    tracing::info!(completed = settled.completed, failed = settled.failed, "background tasks drained, shutting down");

    Ok(())
}
