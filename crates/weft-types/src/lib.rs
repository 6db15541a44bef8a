//! Core types for weft.
//!
//! This crate provides the identifier types and the error-code
//! convention shared by every layer of the weft build coordinator.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Wire Layer                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  weft-types   : IDs, ErrorCode  ◄── HERE                    │
//! │  weft-event   : Envelope, BusEvent, EventTarget             │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Runtime Layer                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  weft-runtime : bus, rpc, pool, orchestrator, config        │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Frontend Layer                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  weft-cli     : `weft` binary                               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Identifier Design
//!
//! - [`CorrelationId`]: 128-bit random value, hex-encoded on the wire.
//!   Pairs one RPC request with its response.
//! - [`WorkerId`]: position of a worker inside one pool generation.
//! - [`BuildId`]: per-session fingerprint distinguishing cache generations.
//!
//! # Example
//!
//! ```
//! use weft_types::{BuildId, CorrelationId, WorkerId};
//!
//! let call = CorrelationId::new();
//! assert_eq!(call.to_string().len(), 32);
//!
//! let worker = WorkerId::new(3);
//! assert_eq!(worker.to_string(), "worker:3");
//!
//! let a = BuildId::generate(&["/app/index.js".to_string()]);
//! let b = BuildId::generate(&["/app/index.js".to_string()]);
//! assert_ne!(a, b);
//! ```

mod error;
mod id;

pub use error::{assert_error_code, assert_error_codes, ErrorCode};
pub use id::{BuildId, CorrelationId, ParseIdError, WorkerId};
