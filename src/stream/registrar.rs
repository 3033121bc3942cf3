//! # Stream Registrar
//!
//! Binds one or more change sources to one connection for the duration
//! of a single client stream.
//!
//! ## Invariant
//! For N source specs there are exactly N watches and one heartbeat
//! task per connection; all N+1 resources are released together on the
//! first disconnect signal, never individually leaked and never
//! double-released.

use std::sync::Arc;
use std::time::Duration;

use super::connection::{EventStreamConnection, HEARTBEAT_INTERVAL};
use super::errors::StreamResult;
use super::event::StreamEvent;
use super::source::{ChangeCallback, ChangeSource, WatchHandle};

/// One labeled source to multiplex onto a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    /// Label stamped into the `type` field of update events
    pub label: String,

    /// Collection to watch
    pub collection: String,
}

impl SourceSpec {
    /// Create a spec
    pub fn new(label: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            collection: collection.into(),
        }
    }
}

/// Wires change sources to stream connections
pub struct StreamRegistrar {
    source: Arc<dyn ChangeSource>,
    heartbeat_interval: Duration,
}

impl StreamRegistrar {
    /// Create a registrar with the fixed 30 second heartbeat
    pub fn new(source: Arc<dyn ChangeSource>) -> Self {
        Self::with_heartbeat_interval(source, HEARTBEAT_INTERVAL)
    }

    /// Create a registrar with a custom heartbeat interval
    pub fn with_heartbeat_interval(source: Arc<dyn ChangeSource>, interval: Duration) -> Self {
        Self {
            source,
            heartbeat_interval: interval,
        }
    }

    /// Bind the given sources to a connection and start its heartbeat.
    ///
    /// The `connected` event was already enqueued when the connection
    /// was opened, so it precedes every update regardless of how fast
    /// a source delivers its first snapshot.
    ///
    /// If the k-th watch fails, the k-1 watches already created are
    /// released before the error propagates; no partial subscriptions
    /// are left active.
    pub fn register(
        &self,
        connection: Arc<EventStreamConnection>,
        specs: &[SourceSpec],
    ) -> StreamResult<StreamTicket> {
        let mut handles = Vec::with_capacity(specs.len());

        for spec in specs {
            let sink = Arc::clone(&connection);
            let label = spec.label.clone();
            let callback: ChangeCallback = Arc::new(move |records| {
                sink.send(&StreamEvent::data_update(label.clone(), records));
            });

            match self.source.watch(&spec.collection, callback) {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    tracing::warn!(
                        collection = %spec.collection,
                        error = %err,
                        "watch failed, rolling back earlier watches"
                    );
                    for handle in handles {
                        handle.unsubscribe();
                    }
                    return Err(err);
                }
            }
        }

        connection.start_heartbeat(self.heartbeat_interval);
        tracing::info!(
            connection = %connection.id(),
            sources = specs.len(),
            "stream registered"
        );
        Ok(StreamTicket::new(connection, handles))
    }
}

/// Disconnect handle for one registered stream.
///
/// Teardown runs at most once, on explicit [`StreamTicket::disconnect`]
/// or on drop, in order: stop the heartbeat, release every watch, close
/// the connection.
pub struct StreamTicket {
    inner: Option<(Arc<EventStreamConnection>, Vec<WatchHandle>)>,
}

impl StreamTicket {
    fn new(connection: Arc<EventStreamConnection>, handles: Vec<WatchHandle>) -> Self {
        Self {
            inner: Some((connection, handles)),
        }
    }

    /// Tear the stream down now
    pub fn disconnect(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some((connection, handles)) = self.inner.take() {
            connection.stop_heartbeat();
            for handle in handles {
                handle.unsubscribe();
            }
            connection.close();
            tracing::info!(connection = %connection.id(), "stream torn down");
        }
    }
}

impl Drop for StreamTicket {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::connection::frame_channel;
    use crate::stream::errors::StreamError;
    use crate::stream::source::MemoryStore;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Source that fails every watch, counting release calls on the
    /// handles it never issued.
    struct FailingSource;

    impl ChangeSource for FailingSource {
        fn watch(&self, collection: &str, _on_change: ChangeCallback) -> StreamResult<WatchHandle> {
            Err(StreamError::WatchFailed {
                collection: collection.to_string(),
                reason: "source unavailable".to_string(),
            })
        }
    }

    /// Source that counts watches and releases
    struct CountingSource {
        watches: AtomicUsize,
        releases: Arc<AtomicUsize>,
    }

    impl CountingSource {
        fn new() -> Self {
            Self {
                watches: AtomicUsize::new(0),
                releases: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl ChangeSource for CountingSource {
        fn watch(&self, _collection: &str, _on_change: ChangeCallback) -> StreamResult<WatchHandle> {
            self.watches.fetch_add(1, Ordering::SeqCst);
            let releases = Arc::clone(&self.releases);
            Ok(WatchHandle::new(move || {
                releases.fetch_add(1, Ordering::SeqCst);
            }))
        }
    }

    #[tokio::test]
    async fn test_update_events_carry_label() {
        let store = Arc::new(MemoryStore::new());
        let registrar = StreamRegistrar::new(store.clone());

        let (tx, mut rx) = frame_channel();
        let connection = EventStreamConnection::open(tx).unwrap();
        let ticket = registrar
            .register(connection, &[SourceSpec::new("donations", "donations")])
            .unwrap();

        let _connected = rx.recv().await.unwrap();
        store.insert("donations", json!({"id": "a"})).unwrap();

        let frame = rx.recv().await.unwrap();
        assert!(frame.contains("\"type\":\"donations\""));

        ticket.disconnect();
    }

    #[tokio::test]
    async fn test_disconnect_releases_every_watch_once() {
        let source = Arc::new(CountingSource::new());
        let releases = Arc::clone(&source.releases);
        let registrar = StreamRegistrar::new(source);

        let (tx, _rx) = frame_channel();
        let connection = EventStreamConnection::open(tx).unwrap();
        let specs = vec![
            SourceSpec::new("donations", "donations"),
            SourceSpec::new("contacts", "contacts"),
            SourceSpec::new("volunteers", "volunteers"),
        ];
        let ticket = registrar.register(Arc::clone(&connection), &specs).unwrap();

        ticket.disconnect();
        assert_eq!(releases.load(Ordering::SeqCst), 3);
        assert!(connection.is_closed());
    }

    #[tokio::test]
    async fn test_drop_is_equivalent_to_disconnect() {
        let source = Arc::new(CountingSource::new());
        let releases = Arc::clone(&source.releases);
        let registrar = StreamRegistrar::new(source);

        let (tx, _rx) = frame_channel();
        let connection = EventStreamConnection::open(tx).unwrap();
        {
            let _ticket = registrar
                .register(Arc::clone(&connection), &[SourceSpec::new("donations", "donations")])
                .unwrap();
        }

        assert_eq!(releases.load(Ordering::SeqCst), 1);
        assert!(connection.is_closed());
    }

    #[tokio::test]
    async fn test_watch_failure_propagates() {
        let registrar = StreamRegistrar::new(Arc::new(FailingSource));

        let (tx, _rx) = frame_channel();
        let connection = EventStreamConnection::open(tx).unwrap();
        let result = registrar.register(connection, &[SourceSpec::new("donations", "donations")]);

        assert!(matches!(result, Err(StreamError::WatchFailed { .. })));
    }
}
