//! ifreg HTTP API Server
//!
//! This crate exposes the interface registry as JSON endpoints for the admin
//! console and the invocation gateway.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod server;

use server::{ServerConfig, start_server};
use tracing_subscriber::EnvFilter;

/// Initialize logging. `RUST_LOG` wins over `default_level` when set.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // A subscriber may already be installed by an embedding application.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Start the ifreg HTTP server with the default configuration
pub async fn start() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing("info");
    start_server(ServerConfig::default()).await
}

/// Start the ifreg HTTP server with a custom configuration
pub async fn start_with_config(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    init_tracing("info");
    start_server(config).await
}
