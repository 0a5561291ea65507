//! HTTP API server
//!
//! Serves the observation endpoints used by the measurement page and a
//! diagnostic resolve endpoint:
//!
//! | Method | Path | Result |
//! |--------|------|--------|
//! | POST | `/api/ping` | `PingOutcome` for the calling address |
//! | GET | `/api/ping/stats?top=N` | `PingStats` |
//! | GET | `/api/ping/last?limit=N` | latest `PingRow`s |
//! | POST | `/api/ping/clear` | `{"deleted": N}` |
//! | GET | `/api/resolve/:ip` | full `ResolutionResult` |
//! | GET | `/health` | `OK` |
//!
//! ```rust,ignore
//! use asnwatch::server::{start_server, ServerConfig, ServerState};
//!
//! let state = ServerState::new(ObserveLens::from_config(&config)?);
//! start_server(state, ServerConfig::from_config(&config)).await?;
//! ```

pub mod error;
pub mod handlers;

pub use error::{ApiError, ApiResult, ErrorCode};

use crate::config::AsnwatchConfig;
use crate::lens::observe::ObserveLens;
use crate::lens::whois::WhoisTransport;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub address: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &AsnwatchConfig) -> Self {
        Self {
            address: config.server_address.clone(),
            port: config.server_port,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// Shared server state
pub struct ServerState<T: WhoisTransport> {
    pub observe: Arc<ObserveLens<T>>,
}

impl<T: WhoisTransport> ServerState<T> {
    pub fn new(observe: ObserveLens<T>) -> Self {
        Self {
            observe: Arc::new(observe),
        }
    }
}

impl<T: WhoisTransport> Clone for ServerState<T> {
    fn clone(&self) -> Self {
        Self {
            observe: Arc::clone(&self.observe),
        }
    }
}

pub fn create_axum_router<T: WhoisTransport + 'static>(state: ServerState<T>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/ping", post(handlers::ping::<T>))
        .route("/api/ping/stats", get(handlers::ping_stats::<T>))
        .route("/api/ping/last", get(handlers::ping_last::<T>))
        .route("/api/ping/clear", post(handlers::ping_clear::<T>))
        .route("/api/resolve/:ip", get(handlers::resolve::<T>))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn start_server<T: WhoisTransport + 'static>(
    state: ServerState<T>,
    config: ServerConfig,
) -> anyhow::Result<()> {
    let app = create_axum_router(state);

    let bind_address = config.bind_address();
    tracing::info!("Starting API server on {}", bind_address);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
