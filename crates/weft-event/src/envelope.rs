//! The `{type, data, id}` wire message.
//!
//! Every message on a coordinator ↔ worker channel is an [`Envelope`].
//! Requests and responses share the shape; a response is recognised by
//! its `id` matching a pending call, not by position in the stream.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use weft_types::CorrelationId;

/// Well-known envelope kinds.
pub mod kind {
    /// Reply to a pending call; `data` is the payload.
    pub const RESPONSE: &str = "response";
    /// Worker finished initialisation.
    pub const READY: &str = "ready";
    /// Coordinator → worker: run one opaque job.
    pub const JOB: &str = "job";
    /// Worker → coordinator: invoke a method on a coordinator object.
    pub const CALL_MASTER: &str = "callMaster";
    /// Coordinator → worker: shut down.
    pub const END: &str = "end";
}

/// A single message on a cross-process channel.
///
/// Serializes as `{"type": ..., "data": ..., "id": ...}`. The optional
/// `transfer` list carries transferable-buffer hints and is omitted
/// from the wire form when empty.
///
/// # Example
///
/// ```
/// use weft_event::{kind, Envelope};
/// use serde_json::json;
///
/// let req = Envelope::new(kind::JOB, json!({"entry": "/app/index.js"}));
/// let resp = req.respond(json!("ok"));
/// assert_eq!(resp.id, req.id);
/// assert!(resp.is_response());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message kind (see [`kind`]).
    #[serde(rename = "type")]
    pub kind: String,
    /// Opaque payload.
    #[serde(default)]
    pub data: Value,
    /// Correlation identifier.
    pub id: CorrelationId,
    /// Transferable-buffer hints.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transfer: Vec<String>,
}

impl Envelope {
    /// Creates an envelope with a fresh correlation id.
    #[must_use]
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        Self::with_id(kind, data, CorrelationId::new())
    }

    /// Creates an envelope with an explicit correlation id.
    #[must_use]
    pub fn with_id(kind: impl Into<String>, data: Value, id: CorrelationId) -> Self {
        Self {
            kind: kind.into(),
            data,
            id,
            transfer: Vec::new(),
        }
    }

    /// Attaches transferable-buffer hints.
    #[must_use]
    pub fn with_transfer(mut self, transfer: Vec<String>) -> Self {
        self.transfer = transfer;
        self
    }

    /// Builds the response envelope for this request.
    #[must_use]
    pub fn respond(&self, data: Value) -> Self {
        Self::with_id(kind::RESPONSE, data, self.id)
    }

    /// Returns `true` if this is a response envelope.
    #[must_use]
    pub fn is_response(&self) -> bool {
        self.kind == kind::RESPONSE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_shape_uses_type_key() {
        let env = Envelope::new(kind::JOB, json!({"n": 1}));
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(value["type"], "job");
        assert_eq!(value["data"], json!({"n": 1}));
        assert_eq!(value["id"], json!(env.id.to_string()));
        assert!(value.get("transfer").is_none());
    }

    #[test]
    fn transfer_hints_serialized_when_present() {
        let env = Envelope::new(kind::JOB, Value::Null).with_transfer(vec!["buf0".into()]);
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(value["transfer"], json!(["buf0"]));
    }

    #[test]
    fn decode_from_foreign_message() {
        let id = CorrelationId::new();
        let raw = json!({"type": "response", "data": [1, 2], "id": id.to_string()});
        let env: Envelope = serde_json::from_value(raw).unwrap();
        assert!(env.is_response());
        assert_eq!(env.id, id);
        assert_eq!(env.data, json!([1, 2]));
    }

    #[test]
    fn missing_data_defaults_to_null() {
        let id = CorrelationId::new();
        let raw = json!({"type": "ready", "id": id.to_string()});
        let env: Envelope = serde_json::from_value(raw).unwrap();
        assert_eq!(env.data, Value::Null);
    }

    #[test]
    fn respond_keeps_id() {
        let req = Envelope::new(kind::CALL_MASTER, Value::Null);
        let resp = req.respond(json!(true));
        assert_eq!(resp.id, req.id);
        assert_eq!(resp.kind, kind::RESPONSE);
    }
}
