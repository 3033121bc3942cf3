//! HTTP layer: configuration, routes, and the serving loop.

pub mod config;
pub mod data_routes;
pub mod http;
pub mod routes;

pub use config::{ConfigError, ServerConfig};
pub use http::HttpServer;
pub use routes::StreamState;
