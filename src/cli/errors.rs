//! CLI error types

use thiserror::Error;

use crate::server::ConfigError;
use crate::stream::StreamError;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// CLI errors
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Runtime or server I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Store operation failed while seeding
    #[error("Store error: {0}")]
    Store(#[from] StreamError),
}
