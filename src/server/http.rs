//! HTTP Server
//!
//! Router assembly and serving loop for the change-feed API.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::config::ServerConfig;
use super::data_routes::data_routes;
use super::routes::{stream_routes, StreamState};
use crate::stream::{MemoryStore, SourceSpec, StreamRegistrar};

/// Sources streamed when a client does not ask for a specific set
fn default_source_specs() -> Vec<SourceSpec> {
    vec![
        SourceSpec::new("donations", "donations"),
        SourceSpec::new("contacts", "contacts"),
    ]
}

/// HTTP server for the change-feed API
pub struct HttpServer {
    config: ServerConfig,
    router: Router,
}

impl HttpServer {
    /// Create a server with a fresh store
    pub fn new(config: ServerConfig) -> Self {
        Self::with_store(config, Arc::new(MemoryStore::new()))
    }

    /// Create a server over an existing store
    pub fn with_store(config: ServerConfig, store: Arc<MemoryStore>) -> Self {
        let router = Self::build_router(&config, store);
        Self { config, router }
    }

    /// Build the combined router
    fn build_router(config: &ServerConfig, store: Arc<MemoryStore>) -> Router {
        let registrar = StreamRegistrar::with_heartbeat_interval(
            Arc::clone(&store) as Arc<dyn crate::stream::ChangeSource>,
            config.heartbeat_interval(),
        );
        let stream_state = Arc::new(StreamState::new(
            Arc::clone(&store),
            registrar,
            default_source_specs(),
        ));

        let cors = if config.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            use tower_http::cors::AllowOrigin;
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        Router::new()
            .route("/health", get(health_handler))
            .nest("/stream", stream_routes(stream_state))
            .nest("/api", data_routes(store))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Bind and serve until shutdown
    pub async fn start(self) -> io::Result<()> {
        let addr: SocketAddr = self
            .config
            .socket_addr()
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, format!("{e}")))?;

        tracing::info!(%addr, "starting livefeed server");
        tracing::info!("event stream: http://{}/stream/events", addr);
        tracing::info!("data API:     http://{}/api/{{collection}}", addr);

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, self.router).await?;

        Ok(())
    }
}

/// Health check
async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_builds_from_default_config() {
        let server = HttpServer::new(ServerConfig::default());
        assert_eq!(server.socket_addr(), "0.0.0.0:8090");
    }

    #[test]
    fn test_default_sources() {
        let specs = default_source_specs();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].label, "donations");
        assert_eq!(specs[1].label, "contacts");
    }
}
