use axum::Router;
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::routes::create_api_router;
use ifreg_core::{InterfaceRegistry, RegistryConfig};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Registry configuration
    pub registry: RegistryConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            registry: RegistryConfig::default(),
        }
    }
}

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub registry: InterfaceRegistry,
}

impl AppState {
    pub fn new(registry: InterfaceRegistry) -> Self {
        Self { registry }
    }
}

/// Build the complete application: routes, state and middleware
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    create_api_router()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Start the HTTP server and serve until a shutdown signal arrives
pub async fn start_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let registry = InterfaceRegistry::open(config.registry.clone()).await?;
    info!("Initialized interface registry");

    let app = create_app(AppState::new(registry.clone()));

    let addr = format!("{}:{}", config.host, config.port).parse::<SocketAddr>()?;
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Pending call counts only reach a file-backed store on flush.
    if let Err(e) = registry.flush().await {
        error!("Failed to flush registry on shutdown: {}", e);
    }
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
