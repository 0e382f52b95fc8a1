use ifreg_core::{RegistryConfig, StorageConfig};
use ifreg_http::server::{ServerConfig, start_server};
use std::net::{SocketAddr, TcpListener};
use std::time::Duration;
use tokio::time::timeout;

#[test]
fn test_server_config_default() {
    let config = ServerConfig::default();

    assert_eq!(config.host, "127.0.0.1");
    assert_eq!(config.port, 3000);
    assert_eq!(config.registry, RegistryConfig::default());
}

#[test]
fn test_server_config_custom() {
    let config = ServerConfig {
        host: "0.0.0.0".to_string(),
        port: 8080,
        registry: RegistryConfig {
            storage: StorageConfig::LocalFs {
                path: "/var/lib/ifreg".to_string(),
            },
            ..Default::default()
        },
    };

    assert_eq!(config.host, "0.0.0.0");
    assert_eq!(config.port, 8080);
    assert!(matches!(config.registry.storage, StorageConfig::LocalFs { .. }));
}

#[tokio::test]
async fn test_server_address_parsing() {
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 8081,
        ..Default::default()
    };

    let addr = format!("{}:{}", config.host, config.port)
        .parse::<SocketAddr>()
        .unwrap();

    assert_eq!(addr.ip().to_string(), "127.0.0.1");
    assert_eq!(addr.port(), 8081);
}

#[tokio::test]
async fn test_invalid_registry_config_fails_startup() {
    let config = ServerConfig {
        registry: RegistryConfig {
            max_page_size: 0,
            ..Default::default()
        },
        ..Default::default()
    };

    let result = timeout(Duration::from_secs(5), start_server(config)).await;
    assert!(matches!(result, Ok(Err(_))));
}

#[tokio::test]
#[ignore] // Binds a real port and serves until the timeout fires
async fn test_server_startup() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port,
        ..Default::default()
    };

    let result = timeout(Duration::from_millis(500), start_server(config)).await;
    assert!(result.is_err(), "Server should keep running until stopped");
}
