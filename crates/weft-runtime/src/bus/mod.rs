//! Process-spanning event bus.
//!
//! Code that publishes events does not know whether it runs on the
//! coordinator or inside a worker. It holds an `Arc<dyn Bus>` chosen once
//! at setup time:
//!
//! ```text
//!  Coordinator                          Worker
//! ┌──────────────────┐                 ┌──────────────────┐
//! │ LocalBus         │                 │ ForwardingBus    │
//! │  publish(e, a..) │ ◄── callMaster ─│  publish(e, a..) │
//! │  → subscribers   │   emit [e, a..] │  → true          │
//! └──────────────────┘                 └──────────────────┘
//! ```
//!
//! - [`LocalBus`] fans out synchronously to subscribers in subscription
//!   order and reports whether any existed.
//! - [`ForwardingBus`] never fans out locally. It posts a fire-and-forget
//!   `emit` call to the coordinator and returns `true` immediately.

mod forwarding;
mod local;

pub use forwarding::ForwardingBus;
pub use local::{LocalBus, Subscriber, SubscriptionId};

use serde_json::Value;

/// Publish side of the event bus.
pub trait Bus: Send + Sync {
    /// Publishes `event` with ordered `args`.
    ///
    /// Returns whether the event was delivered to (or handed off toward)
    /// at least one subscriber. Publishing with no subscribers is not an
    /// error.
    fn publish(&self, event: &str, args: Vec<Value>) -> bool;
}
