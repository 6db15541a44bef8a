//! Event and wire types for weft.
//!
//! This crate holds everything that crosses the coordinator ↔ worker
//! boundary, plus the small fan-out primitive used by watch mode.
//!
//! # Message Flow
//!
//! ```text
//!  Coordinator                                   Worker
//! ┌────────────────┐   Envelope{job, data, id}  ┌────────────────┐
//! │  WorkerPool    │ ─────────────────────────► │  worker loop   │
//! │  (Correlator)  │ ◄───────────────────────── │  (Correlator)  │
//! └────────────────┘   Envelope{response, id}   └────────────────┘
//!         ▲                                             │
//!         │    Envelope{callMaster, MasterCall, id}     │
//!         └─────────────────────────────────────────────┘
//!              MasterCall{location: bus, method: "emit",
//!                         args: [event, ...args]}
//! ```
//!
//! # Crate Structure
//!
//! - [`Envelope`] - the `{type, data, id}` wire message
//! - [`BusEvent`] - a named event with ordered arguments
//! - [`MasterCall`] - a worker → coordinator method call
//! - [`EventTarget`], [`CustomEvent`] - named-event fan-out for watch mode
//! - [`EventError`] - decoding failures
//!
//! # Example
//!
//! ```
//! use weft_event::{BusEvent, MasterCall, BUS_LOCATION};
//! use serde_json::json;
//!
//! let event = BusEvent::new("foo", vec![json!(1), json!(2)]);
//! let call = MasterCall::emit(&event);
//! assert_eq!(call.location, BUS_LOCATION);
//! assert_eq!(call.method, "emit");
//! assert_eq!(call.args, vec![json!("foo"), json!(1), json!(2)]);
//! ```

mod bus_event;
mod envelope;
mod error;
mod target;

pub use bus_event::{BusEvent, MasterCall, BUS_LOCATION, EMIT_METHOD};
pub use envelope::{kind, Envelope};
pub use error::EventError;
pub use target::{CustomEvent, EventTarget, Listener};

pub use weft_types::CorrelationId;
