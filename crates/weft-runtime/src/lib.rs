//! Weft Runtime - coordination core of the weft bundler.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  weft-types : CorrelationId, WorkerId, BuildId, ErrorCode   │
//! │  weft-event : Envelope, BusEvent, EventTarget               │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Runtime Layer (THIS CRATE)                │
//! ├─────────────────────────────────────────────────────────────┤
//! │  bus/          : LocalBus, ForwardingBus                    │
//! │  rpc/          : Correlator                                 │
//! │  pool/         : WorkerPool, PoolManager                    │
//! │  orchestrator/ : Orchestrator, BuildEngine, diagnostics     │
//! │  engine/       : ReferenceEngine, TransformWorker           │
//! │  fs/, config/  : FileSystem, WeftConfig                     │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │  weft-cli : `weft bundle`, `weft config`                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! ## [`bus`] - Event Bus
//!
//! - [`LocalBus`](bus::LocalBus): synchronous fan-out on the coordinator
//! - [`ForwardingBus`](bus::ForwardingBus): worker side, posts `emit` to
//!   the coordinator
//!
//! ## [`rpc`] - Correlation
//!
//! - [`Correlator`](rpc::Correlator): matches responses to requests by id
//!
//! ## [`pool`] - Worker Pool
//!
//! - [`WorkerPool`](pool::WorkerPool): fixed-size pool of worker tasks
//! - [`PoolManager`](pool::PoolManager): process-wide pool, restarted on
//!   size change
//!
//! ## [`orchestrator`] - Build Orchestration
//!
//! - [`Orchestrator`](orchestrator::Orchestrator): `bundle` and `watch`
//! - [`translate_diagnostics`](orchestrator::translate_diagnostics):
//!   engine diagnostics to editor diagnostics
//!
//! ## [`config`] - Configuration
//!
//! Configuration priority: CLI > Environment > Project > Global > Default

pub mod bus;
pub mod config;
pub mod engine;
pub mod fs;
pub mod orchestrator;
pub mod paths;
pub mod pool;
pub mod rpc;

pub use bus::{Bus, ForwardingBus, LocalBus};
pub use config::{ConfigLoader, WeftConfig};
pub use fs::{FileSystem, FsError, MemoryFs, OsFs};
pub use orchestrator::{
    Asset, BuildOptions, BuildOutput, Orchestrator, OrchestratorConfig, OrchestratorError,
    WatchHandle,
};
pub use pool::{PoolManager, WorkerPool};
pub use rpc::Correlator;
