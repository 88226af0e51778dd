//! Startup orchestration.
//!
//! Fail fast: any error before the listener is bound is fatal. Config
//! errors after that only keep the running configuration in place.

use std::net::SocketAddr;
use std::path::Path;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::config::watcher::ConfigWatcher;
use crate::config::{load_config, ConfigError, ProxyConfig};
use crate::http::server::ServerError;
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::shutdown_on_signal;
use crate::net::tls::load_tls_config;
use crate::observability::{logging, metrics};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("server setup failed: {0}")]
    Server(#[from] ServerError),

    #[error("invalid listen address '{0}'")]
    Address(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Load configuration from `path`, or use defaults without one.
pub fn load_or_default(path: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => Ok(ProxyConfig::default()),
    }
}

/// Run the proxy until SIGINT/SIGTERM.
pub async fn serve(config_path: Option<&Path>) -> Result<(), StartupError> {
    let config = load_or_default(config_path)?;
    logging::init(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        geoserver = %config.geoserver.base_url,
        tls = config.listener.tls.is_some(),
        "geonode-proxy starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Dropping the watcher handle stops notifications, so it lives until return.
    let (config_updates, _watch_handle) = match config_path {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            match watcher.run() {
                Ok(handle) => (updates, Some(handle)),
                Err(e) => {
                    tracing::warn!(error = %e, "Config watcher unavailable, hot reload disabled");
                    (updates, None)
                }
            }
        }
        None => (mpsc::unbounded_channel().1, None),
    };

    let shutdown = Shutdown::new();
    tokio::spawn(shutdown_on_signal(shutdown.clone()));

    let server = HttpServer::new(config.clone())?;

    match &config.listener.tls {
        Some(tls) => {
            let addr: SocketAddr = config
                .listener
                .bind_address
                .parse()
                .map_err(|_| StartupError::Address(config.listener.bind_address.clone()))?;
            let rustls = load_tls_config(Path::new(&tls.cert_path), Path::new(&tls.key_path)).await?;
            server
                .run_tls(addr, rustls, config_updates, shutdown.subscribe())
                .await?;
        }
        None => {
            let listener = TcpListener::bind(&config.listener.bind_address).await?;
            server.run(listener, config_updates, shutdown.subscribe()).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_path() {
        let config = load_or_default(None).unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8000");
    }

    #[test]
    fn test_loads_file() {
        let path = std::env::temp_dir().join(format!("geonode-proxy-{}.toml", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[listener]\nbind_address = \"127.0.0.1:9000\"").unwrap();

        let config = load_or_default(Some(&path)).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let path = Path::new("/nonexistent/geonode-proxy.toml");
        assert!(matches!(load_or_default(Some(path)), Err(ConfigError::Io(_))));
    }
}
