//! # Event Stream Connection
//!
//! Owns the wire-level framing and lifecycle of one long-lived client
//! connection.
//!
//! The transport is an unbounded channel of framed strings; the HTTP
//! layer turns the receiving end into the response body. A broken
//! transport is terminal for the connection: no retries, the client
//! reconnects with a brand-new connection and fresh watches.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::errors::{StreamError, StreamResult};
use super::event::StreamEvent;

/// Fixed heartbeat period. Heartbeats exist solely to keep idle
/// connections alive through intermediary proxies.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Sending half of a connection transport
pub type FrameSender = mpsc::UnboundedSender<String>;

/// Receiving half of a connection transport
pub type FrameReceiver = mpsc::UnboundedReceiver<String>;

/// Create a transport channel for one connection
pub fn frame_channel() -> (FrameSender, FrameReceiver) {
    mpsc::unbounded_channel()
}

/// One long-lived stream connection
pub struct EventStreamConnection {
    id: Uuid,
    frames: FrameSender,
    closed: AtomicBool,
    heartbeat: Mutex<Option<JoinHandle<()>>>,
}

impl EventStreamConnection {
    /// Open a connection over a transport and immediately emit the
    /// `connected` event.
    ///
    /// Fails only if the transport is already closed.
    pub fn open(frames: FrameSender) -> StreamResult<Arc<Self>> {
        if frames.is_closed() {
            return Err(StreamError::TransportClosed);
        }

        let connection = Arc::new(Self {
            id: Uuid::new_v4(),
            frames,
            closed: AtomicBool::new(false),
            heartbeat: Mutex::new(None),
        });
        connection.send(&StreamEvent::connected("stream established"));
        tracing::debug!(connection = %connection.id, "stream connection opened");
        Ok(connection)
    }

    /// Connection id
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Write one event as a single frame.
    ///
    /// Silently dropped if the connection is closed or the peer has
    /// gone away; the teardown path is already running in that case.
    pub fn send(&self, event: &StreamEvent) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        if self.frames.send(event.to_frame()).is_err() {
            tracing::trace!(connection = %self.id, "frame dropped, transport closed");
        }
    }

    /// Emit `heartbeat` events on a fixed period until close.
    ///
    /// The first tick fires one full interval after start, never
    /// immediately.
    pub fn start_heartbeat(self: &Arc<Self>, interval: Duration) {
        let connection = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            loop {
                ticker.tick().await;
                if connection.is_closed() {
                    break;
                }
                connection.send(&StreamEvent::heartbeat());
            }
        });

        let Ok(mut slot) = self.heartbeat.lock() else {
            handle.abort();
            return;
        };
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
    }

    /// Cancel the heartbeat task, if one is running
    pub fn stop_heartbeat(&self) {
        if let Ok(mut slot) = self.heartbeat.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }

    /// Whether the connection has been terminated
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Terminate the connection.
    ///
    /// Idempotent; safe to call multiple times or concurrently with an
    /// in-flight `send`.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.stop_heartbeat();
        tracing::debug!(connection = %self.id, "stream connection closed");
    }
}
