//! # Stream Events
//!
//! Event types written to open stream connections.
//!
//! Every event is one self-contained frame; no frame depends on the
//! content of an earlier frame.

use chrono::Utc;
use serde_json::{json, Value};

/// An event delivered to a stream client.
///
/// The wire form is a JSON object `{ type, message?, data?, timestamp? }`.
/// Data updates use their source label as the `type` value, so a new
/// source is added by tagging events with a new label, not by inventing
/// a new field convention.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// First event on every connection
    Connected { message: String },

    /// Periodic liveness signal; content has no meaning beyond liveness
    Heartbeat { timestamp: String },

    /// Full current snapshot of one watched collection (never a diff)
    DataUpdate { label: String, records: Vec<Value> },
}

impl StreamEvent {
    /// Create a `connected` event
    pub fn connected(message: impl Into<String>) -> Self {
        StreamEvent::Connected {
            message: message.into(),
        }
    }

    /// Create a `heartbeat` event stamped with the current time
    pub fn heartbeat() -> Self {
        StreamEvent::Heartbeat {
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    /// Create a data-update event tagged with a source label
    pub fn data_update(label: impl Into<String>, records: Vec<Value>) -> Self {
        StreamEvent::DataUpdate {
            label: label.into(),
            records,
        }
    }

    /// Serialize to the wire object
    pub fn to_wire_format(&self) -> Value {
        match self {
            StreamEvent::Connected { message } => json!({
                "type": "connected",
                "message": message,
            }),
            StreamEvent::Heartbeat { timestamp } => json!({
                "type": "heartbeat",
                "timestamp": timestamp,
            }),
            StreamEvent::DataUpdate { label, records } => json!({
                "type": label,
                "data": records,
            }),
        }
    }

    /// Serialize to one SSE text frame: `data: <JSON>\n\n`
    pub fn to_frame(&self) -> String {
        format!("data: {}\n\n", self.to_wire_format())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connected_wire_format() {
        let event = StreamEvent::connected("stream established");
        let wire = event.to_wire_format();
        assert_eq!(wire["type"], "connected");
        assert_eq!(wire["message"], "stream established");
    }

    #[test]
    fn test_heartbeat_wire_format() {
        let event = StreamEvent::heartbeat();
        let wire = event.to_wire_format();
        assert_eq!(wire["type"], "heartbeat");
        assert!(wire["timestamp"].is_string());
    }

    #[test]
    fn test_data_update_passes_records_through() {
        let records = vec![json!({"id": "a", "amount": 25}), json!({"id": "b"})];
        let event = StreamEvent::data_update("donations", records.clone());
        let wire = event.to_wire_format();
        assert_eq!(wire["type"], "donations");
        assert_eq!(wire["data"], json!(records));
    }

    #[test]
    fn test_frame_format() {
        let event = StreamEvent::connected("hi");
        let frame = event.to_frame();
        assert!(frame.starts_with("data: {"));
        assert!(frame.ends_with("\n\n"));

        // The frame body must parse back as standalone JSON
        let body = frame.trim_start_matches("data: ").trim_end();
        let parsed: Value = serde_json::from_str(body).unwrap();
        assert_eq!(parsed["type"], "connected");
    }
}
