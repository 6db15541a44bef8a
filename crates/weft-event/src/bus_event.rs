//! Bus events and worker → coordinator method calls.

use crate::error::EventError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Location string naming the process-wide bus as a call target.
pub const BUS_LOCATION: &str = "weft::bus";

/// Method name used to re-publish a forwarded bus event.
pub const EMIT_METHOD: &str = "emit";

/// A named event with an ordered argument list.
///
/// Bus events are transient: they are never persisted and never
/// replayed to late subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusEvent {
    /// Event name.
    pub name: String,
    /// Ordered arguments.
    pub args: Vec<Value>,
}

impl BusEvent {
    /// Creates a bus event.
    #[must_use]
    pub fn new(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

/// A worker's request to invoke `method` on the coordinator object at
/// `location`.
///
/// `await_response == false` marks a fire-and-forget call: the
/// coordinator does not send a response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterCall {
    /// Target object on the coordinator.
    pub location: String,
    /// Method to invoke.
    pub method: String,
    /// Positional arguments.
    pub args: Vec<Value>,
    /// Whether the worker waits for a response.
    #[serde(default)]
    pub await_response: bool,
}

impl MasterCall {
    /// Builds the fire-and-forget call that re-publishes `event` on the
    /// coordinator's bus. Arguments are `[name, ...args]`.
    #[must_use]
    pub fn emit(event: &BusEvent) -> Self {
        let mut args = Vec::with_capacity(event.args.len() + 1);
        args.push(Value::String(event.name.clone()));
        args.extend(event.args.iter().cloned());
        Self {
            location: BUS_LOCATION.to_string(),
            method: EMIT_METHOD.to_string(),
            args,
            await_response: false,
        }
    }

    /// Returns `true` if this call targets the bus `emit` method.
    #[must_use]
    pub fn is_bus_emit(&self) -> bool {
        self.location == BUS_LOCATION && self.method == EMIT_METHOD
    }

    /// Reconstructs the bus event carried by an `emit` call.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::InvalidCall`] if the first argument is not
    /// an event name.
    pub fn to_bus_event(&self) -> Result<BusEvent, EventError> {
        let Some((first, rest)) = self.args.split_first() else {
            return Err(EventError::invalid_call("emit without event name"));
        };
        let Value::String(name) = first else {
            return Err(EventError::invalid_call("event name must be a string"));
        };
        Ok(BusEvent::new(name.clone(), rest.to_vec()))
    }

    /// Decodes a call from an envelope payload.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::Decode`] if the payload is not a call.
    pub fn from_value(value: Value) -> Result<Self, EventError> {
        serde_json::from_value(value).map_err(EventError::Decode)
    }

    /// Encodes the call as an envelope payload.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "location": self.location,
            "method": self.method,
            "args": self.args,
            "awaitResponse": self.await_response,
        })
    }
}
