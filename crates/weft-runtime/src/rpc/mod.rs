//! Request/response correlation over an ordered message channel.
//!
//! # Protocol
//!
//! ```text
//!  caller                 Correlator                    peer
//!    │  send(kind, data)      │                           │
//!    │ ─────────────────────► │ pending[id] = oneshot     │
//!    │                        │ ── {kind, data, id} ────► │
//!    │                        │                           │
//!    │                        │ ◄── {response, data, id} ─│
//!    │ ◄───── data ────────── │ route(): pending.remove   │
//! ```
//!
//! Matching is by `id` only: concurrent calls complete in response
//! arrival order, each with its own payload. There is no timeout at this
//! layer.

mod correlator;
mod error;

pub use correlator::Correlator;
pub use error::RpcError;
