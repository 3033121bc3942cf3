//! livefeed - a self-hostable real-time change-feed server
//!
//! Streams document-collection change notifications to browser clients
//! over long-lived HTTP connections, with multi-source fan-in onto one
//! connection, periodic heartbeats, and deterministic cleanup on
//! disconnect.

pub mod cli;
pub mod server;
pub mod stream;
