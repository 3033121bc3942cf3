//! # Change Sources
//!
//! The `ChangeSource` seam between the stream core and the document
//! store, plus the in-process `MemoryStore` implementation.
//!
//! A watch callback always receives the full current snapshot of the
//! collection; the core never inspects record shape.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use serde_json::{json, Value};
use uuid::Uuid;

use super::errors::{StreamError, StreamResult};

/// Callback invoked with the full collection snapshot on every change
pub type ChangeCallback = Arc<dyn Fn(Vec<Value>) + Send + Sync>;

/// A source of collection change notifications
pub trait ChangeSource: Send + Sync {
    /// Register interest in a collection.
    ///
    /// The callback fires with the full current snapshot whenever any
    /// document in the collection changes.
    fn watch(&self, collection: &str, on_change: ChangeCallback) -> StreamResult<WatchHandle>;
}

/// Handle for one active watch.
///
/// Exactly one release per handle over its lifetime; dropping a handle
/// without calling [`WatchHandle::unsubscribe`] leaks the watch.
pub struct WatchHandle {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl WatchHandle {
    /// Wrap a release closure
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Release the watch
    pub fn unsubscribe(mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchHandle")
            .field("released", &self.release.is_none())
            .finish()
    }
}

/// A registered watcher
struct Watcher {
    id: Uuid,
    callback: ChangeCallback,
}

type WatcherRegistry = Arc<RwLock<HashMap<String, Vec<Watcher>>>>;

/// In-process document store with change notification.
///
/// Collections are created implicitly on first insert or watch. Every
/// mutation notifies all watchers of the collection with the full
/// snapshot. The registry serializes concurrent watch/unwatch calls.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Value>>>,
    watchers: WatcherRegistry,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Full snapshot of a collection (empty if it does not exist)
    pub fn snapshot(&self, collection: &str) -> Vec<Value> {
        self.collections
            .read()
            .map(|c| c.get(collection).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Names of all collections
    pub fn collection_names(&self) -> Vec<String> {
        self.collections
            .read()
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Insert a document, assigning an `id` if absent
    pub fn insert(&self, collection: &str, document: Value) -> StreamResult<Value> {
        let Value::Object(mut fields) = document else {
            return Err(StreamError::InvalidDocument(
                "document must be a JSON object".to_string(),
            ));
        };
        fields
            .entry("id".to_string())
            .or_insert_with(|| json!(Uuid::new_v4().to_string()));
        let document = Value::Object(fields);

        {
            let mut collections = self
                .collections
                .write()
                .map_err(|_| StreamError::Internal("store lock poisoned".to_string()))?;
            collections
                .entry(collection.to_string())
                .or_default()
                .push(document.clone());
        }

        self.notify(collection);
        Ok(document)
    }

    /// Replace a document by id, preserving the id field
    pub fn update(&self, collection: &str, id: &str, document: Value) -> StreamResult<Value> {
        let Value::Object(mut fields) = document else {
            return Err(StreamError::InvalidDocument(
                "document must be a JSON object".to_string(),
            ));
        };
        fields.insert("id".to_string(), json!(id));
        let document = Value::Object(fields);

        {
            let mut collections = self
                .collections
                .write()
                .map_err(|_| StreamError::Internal("store lock poisoned".to_string()))?;
            let records = collections
                .get_mut(collection)
                .ok_or_else(|| StreamError::CollectionNotFound(collection.to_string()))?;
            let slot = records
                .iter_mut()
                .find(|r| r.get("id").and_then(Value::as_str) == Some(id))
                .ok_or_else(|| StreamError::DocumentNotFound(id.to_string()))?;
            *slot = document.clone();
        }

        self.notify(collection);
        Ok(document)
    }

    /// Delete a document by id
    pub fn delete(&self, collection: &str, id: &str) -> StreamResult<()> {
        {
            let mut collections = self
                .collections
                .write()
                .map_err(|_| StreamError::Internal("store lock poisoned".to_string()))?;
            let records = collections
                .get_mut(collection)
                .ok_or_else(|| StreamError::CollectionNotFound(collection.to_string()))?;
            let before = records.len();
            records.retain(|r| r.get("id").and_then(Value::as_str) != Some(id));
            if records.len() == before {
                return Err(StreamError::DocumentNotFound(id.to_string()));
            }
        }

        self.notify(collection);
        Ok(())
    }

    /// Total active watchers across all collections
    pub fn watcher_count(&self) -> usize {
        self.watchers
            .read()
            .map(|w| w.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    /// Invoke every watcher of a collection with the full snapshot.
    ///
    /// Callbacks run outside the registry lock.
    fn notify(&self, collection: &str) {
        let callbacks: Vec<ChangeCallback> = match self.watchers.read() {
            Ok(watchers) => watchers
                .get(collection)
                .map(|list| list.iter().map(|w| Arc::clone(&w.callback)).collect())
                .unwrap_or_default(),
            Err(_) => return,
        };

        if callbacks.is_empty() {
            return;
        }

        let snapshot = self.snapshot(collection);
        for callback in callbacks {
            callback(snapshot.clone());
        }
    }
}

impl ChangeSource for MemoryStore {
    fn watch(&self, collection: &str, on_change: ChangeCallback) -> StreamResult<WatchHandle> {
        let id = Uuid::new_v4();
        {
            let mut watchers = self
                .watchers
                .write()
                .map_err(|_| StreamError::Internal("watcher registry poisoned".to_string()))?;
            watchers
                .entry(collection.to_string())
                .or_default()
                .push(Watcher {
                    id,
                    callback: on_change,
                });
        }
        tracing::debug!(collection, watcher = %id, "watch registered");

        let registry = Arc::clone(&self.watchers);
        let collection = collection.to_string();
        Ok(WatchHandle::new(move || {
            if let Ok(mut watchers) = registry.write() {
                if let Some(list) = watchers.get_mut(&collection) {
                    list.retain(|w| w.id != id);
                }
            }
        }))
    }
}
