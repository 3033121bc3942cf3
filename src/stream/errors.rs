//! # Stream Errors
//!
//! Error types for the stream module.

use thiserror::Error;

/// Result type for stream operations
pub type StreamResult<T> = Result<T, StreamError>;

/// Stream errors
#[derive(Debug, Clone, Error)]
pub enum StreamError {
    // ==================
    // Connection Errors
    // ==================
    /// Transport already closed by the peer
    #[error("Transport closed")]
    TransportClosed,

    // ==================
    // Watch Errors
    // ==================
    /// The change source rejected a watch registration
    #[error("Watch failed for collection {collection}: {reason}")]
    WatchFailed { collection: String, reason: String },

    // ==================
    // Store Errors
    // ==================
    /// Collection not found
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    /// Document not found
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// Document is not a JSON object
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    // ==================
    // Internal Errors
    // ==================
    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
