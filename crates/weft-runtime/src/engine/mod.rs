//! Reference build engine.
//!
//! The orchestrator treats the engine as opaque. This module provides one
//! so that the CLI and the integration tests can exercise the whole
//! coordination path: option resolution, pool dispatch, worker bus
//! forwarding, the reporter channel and watch-mode rebuilds.
//!
//! Workers must run [`TransformWorker`]:
//!
//! ```ignore
//! let pools = Arc::new(PoolManager::new(Arc::new(TransformWorker), bus));
//! let orchestrator = Orchestrator::new(pools, fs, Arc::new(ReferenceEngineFactory));
//! ```

mod reference;
mod transform;

pub use reference::{EngineConfig, ReferenceEngine, ReferenceEngineFactory, WATCH_DEBOUNCE};
pub use transform::{
    transform, TransformJob, TransformOutput, TransformWorker, TRANSFORMED_EVENT,
    TRANSFORM_ORIGIN,
};
