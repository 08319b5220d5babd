//! HTTP inference server
//!
//! Serves predictions from an exported ONNX graph. A model that fails to load
//! does not stop the server; `/iris` answers 503 until restarted with a
//! usable model.

pub mod handlers;

use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::core::unified_error::{errors, ExportResult};
use crate::runtime::IrisOnnxModel;
pub use handlers::{HealthResponse, IrisResponse, ServerState};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            model_path: PathBuf::from(iris_ml::ONNX_MODEL_FILE),
        }
    }
}

/// Routes: `GET /iris` and `GET /health`
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/iris", get(handlers::predict_iris))
        .route("/health", get(handlers::health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub struct IrisServer {
    config: ServerConfig,
    state: Arc<ServerState>,
}

impl IrisServer {
    /// Load the model named in `config`; a load failure is logged, not returned
    pub fn new(config: ServerConfig, class_names: Vec<String>) -> Self {
        let model = match IrisOnnxModel::load(&config.model_path) {
            Ok(model) => Some(model),
            Err(e) => {
                error!("Failed to load ONNX model: {}", e);
                None
            }
        };

        Self {
            config,
            state: Arc::new(ServerState::new(model, class_names)),
        }
    }

    pub async fn start(&self) -> ExportResult<()> {
        let (listener, addr) = bind_listener(&self.config.host, self.config.port).await?;
        info!("Server is running on http://{}", addr);

        axum::serve(listener, router(self.state.clone()))
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| errors::io(addr.to_string(), e))?;

        info!("Server stopped");
        Ok(())
    }
}

/// Bind `host:port`; `host` may be a hostname, an IPv4 or an IPv6 address
pub async fn bind_listener(host: &str, port: u16) -> ExportResult<(TcpListener, SocketAddr)> {
    let listener = TcpListener::bind((host, port))
        .await
        .map_err(|e| errors::io(format!("{host}:{port}"), e))?;
    let addr = listener
        .local_addr()
        .map_err(|e| errors::io(format!("{host}:{port}"), e))?;
    Ok((listener, addr))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::ipv4("127.0.0.1")]
    #[case::hostname("localhost")]
    #[tokio::test]
    async fn test_bind_listener_accepts_host_forms(#[case] host: &str) {
        let (_listener, addr) = bind_listener(host, 0).await.unwrap();
        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn test_bind_listener_rejects_unresolvable_host() {
        assert!(bind_listener("not a host name", 0).await.is_err());
    }
}
