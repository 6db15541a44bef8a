//! Worker-side bus that forwards every publish to the coordinator.

use super::Bus;
use crate::rpc::Correlator;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;
use weft_event::{kind, BusEvent, MasterCall};

/// Bus installed inside workers.
///
/// Each publish becomes one fire-and-forget `callMaster` message naming
/// the coordinator bus's `emit` method with `[event, ...args]`. Nothing
/// is delivered locally and nothing is awaited.
#[derive(Clone)]
pub struct ForwardingBus {
    correlator: Arc<Correlator>,
}

impl ForwardingBus {
    /// Creates a bus forwarding through `correlator`.
    #[must_use]
    pub fn new(correlator: Arc<Correlator>) -> Self {
        Self { correlator }
    }
}

impl Bus for ForwardingBus {
    fn publish(&self, event: &str, args: Vec<Value>) -> bool {
        let call = MasterCall::emit(&BusEvent::new(event, args));
        if let Err(e) = self.correlator.post(kind::CALL_MASTER, call.to_value()) {
            // Coordinator gone; the event is dropped like any at-most-once delivery.
            warn!(event, error = %e, "failed to forward bus event");
        }
        true
    }
}
