use anyhow::Context;
use clap::Parser;
use ifreg_core::RegistryConfig;
use ifreg_http::server::{ServerConfig, start_server};
use std::path::PathBuf;

/// ifreg HTTP API Server
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Host address to bind to
    #[arg(short = 'H', long, env = "IFREG_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, env = "IFREG_PORT", default_value_t = 3000)]
    port: u16,

    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(short, long, env = "IFREG_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Registry configuration file (JSON)
    #[arg(short, long, env = "IFREG_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    ifreg_http::init_tracing(&cli.log_level);

    let registry = match &cli.config {
        Some(path) => RegistryConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => RegistryConfig::default(),
    };

    let config = ServerConfig {
        host: cli.host,
        port: cli.port,
        registry,
    };

    start_server(config)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}
