//! Stream HTTP Routes
//!
//! The long-lived event stream endpoint and its stats endpoint.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures_util::Stream;
use serde::{Deserialize, Serialize};

use crate::stream::{
    frame_channel, EventStreamConnection, FrameReceiver, MemoryStore, SourceSpec, StreamRegistrar,
    StreamTicket,
};

// ==================
// Shared State
// ==================

/// Stream state shared across handlers
pub struct StreamState {
    pub store: Arc<MemoryStore>,
    pub registrar: StreamRegistrar,
    pub connections: Arc<AtomicUsize>,
    pub default_sources: Vec<SourceSpec>,
}

impl StreamState {
    pub fn new(
        store: Arc<MemoryStore>,
        registrar: StreamRegistrar,
        default_sources: Vec<SourceSpec>,
    ) -> Self {
        Self {
            store,
            registrar,
            connections: Arc::new(AtomicUsize::new(0)),
            default_sources,
        }
    }
}

// ==================
// Request/Response Types
// ==================

#[derive(Debug, Deserialize)]
pub struct EventStreamParams {
    /// Comma-separated source labels; each label is also the watched
    /// collection name
    #[serde(default)]
    pub sources: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StreamStatsResponse {
    pub success: bool,
    pub active_connections: usize,
    pub active_watchers: usize,
    pub collections: Vec<String>,
}

/// Application-level error envelope
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

// ==================
// Response Body
// ==================

/// Response body for one stream; owns the disconnect handle.
///
/// The HTTP layer drops the body when the peer disconnects, which runs
/// the ticket's teardown exactly once.
struct StreamBody {
    frames: FrameReceiver,
    ticket: Option<StreamTicket>,
    connections: Arc<AtomicUsize>,
}

impl Stream for StreamBody {
    type Item = Result<String, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.frames.poll_recv(cx) {
            Poll::Ready(Some(frame)) => Poll::Ready(Some(Ok(frame))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for StreamBody {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            ticket.disconnect();
        }
        self.connections.fetch_sub(1, Ordering::SeqCst);
    }
}

// ==================
// Stream Routes
// ==================

/// Create stream routes
pub fn stream_routes(state: Arc<StreamState>) -> Router {
    Router::new()
        .route("/events", get(events_handler))
        .route("/stats", get(stats_handler))
        .with_state(state)
}

/// Open a long-lived event stream.
///
/// Responds with SSE framing: no caching, connection kept alive,
/// cross-origin access permitted. The `connected` frame is always
/// first.
async fn events_handler(
    State(state): State<Arc<StreamState>>,
    Query(params): Query<EventStreamParams>,
) -> Response {
    let specs = match params.sources {
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .map(|label| SourceSpec::new(label, label))
            .collect(),
        None => state.default_sources.clone(),
    };

    let (tx, rx) = frame_channel();
    let connection = match EventStreamConnection::open(tx) {
        Ok(connection) => connection,
        Err(err) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(err.to_string())),
            )
                .into_response();
        }
    };

    let ticket = match state.registrar.register(connection, &specs) {
        Ok(ticket) => ticket,
        Err(err) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(err.to_string())),
            )
                .into_response();
        }
    };

    state.connections.fetch_add(1, Ordering::SeqCst);
    let body = Body::from_stream(StreamBody {
        frames: rx,
        ticket: Some(ticket),
        connections: Arc::clone(&state.connections),
    });

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        ],
        body,
    )
        .into_response()
}

/// Stream statistics
async fn stats_handler(State(state): State<Arc<StreamState>>) -> Json<StreamStatsResponse> {
    Json(StreamStatsResponse {
        success: true,
        active_connections: state.connections.load(Ordering::SeqCst),
        active_watchers: state.store.watcher_count(),
        collections: state.store.collection_names(),
    })
}
