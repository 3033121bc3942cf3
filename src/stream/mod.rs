//! # Livefeed Stream Module
//!
//! Real-time change-feed fan-out over long-lived connections.
//!
//! ## Architecture
//!
//! - **Event**: self-contained frames written to clients
//! - **Source**: the `watch(collection, on_change)` seam and the
//!   in-process `MemoryStore`
//! - **Connection**: framing, heartbeat, and lifecycle of one client
//! - **Registrar**: binds N watches + 1 heartbeat to one connection and
//!   releases them atomically on disconnect
//!
//! Delivery is best effort: no replay of missed events, no ordering
//! across independent sources beyond arrival order. The `connected`
//! event is always the first frame on a connection.

pub mod connection;
pub mod errors;
pub mod event;
pub mod registrar;
pub mod source;

pub use connection::{frame_channel, EventStreamConnection, FrameReceiver, FrameSender, HEARTBEAT_INTERVAL};
pub use errors::{StreamError, StreamResult};
pub use event::StreamEvent;
pub use registrar::{SourceSpec, StreamRegistrar, StreamTicket};
pub use source::{ChangeCallback, ChangeSource, MemoryStore, WatchHandle};
