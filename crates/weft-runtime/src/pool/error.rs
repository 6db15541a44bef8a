//! Worker pool errors.
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`PoolError::NotStarted`] | `POOL_NOT_STARTED` | Yes |
//! | [`PoolError::Ended`] | `POOL_ENDED` | Yes |
//! | [`PoolError::Rpc`] | `POOL_RPC` | No |
//! | [`PoolError::JobFailed`] | `POOL_JOB_FAILED` | No |
//! | [`PoolError::InvalidReply`] | `POOL_INVALID_REPLY` | No |
//!
//! `NotStarted` and `Ended` are recoverable by calling
//! `PoolManager::ensure_started` again.

use crate::rpc::RpcError;
use thiserror::Error;
use weft_types::{ErrorCode, WorkerId};

/// Worker pool failure.
#[derive(Debug, Clone, Error)]
pub enum PoolError {
    /// No pool has been started.
    #[error("worker pool not started")]
    NotStarted,

    /// The pool was torn down; in-flight work is abandoned.
    #[error("worker pool ended")]
    Ended,

    /// Transport failure talking to a worker.
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// The job handler reported an error.
    #[error("job failed on {worker}: {message}")]
    JobFailed { worker: WorkerId, message: String },

    /// A worker replied with something that is not a job outcome.
    #[error("invalid reply from worker: {0}")]
    InvalidReply(String),
}

impl ErrorCode for PoolError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotStarted => "POOL_NOT_STARTED",
            Self::Ended => "POOL_ENDED",
            Self::Rpc(_) => "POOL_RPC",
            Self::JobFailed { .. } => "POOL_JOB_FAILED",
            Self::InvalidReply(_) => "POOL_INVALID_REPLY",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::NotStarted | Self::Ended)
    }
}
