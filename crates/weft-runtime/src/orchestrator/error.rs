//! Orchestrator errors.
//!
//! `bundle` folds every one of these into a `Failure` result; `watch`
//! returns them from setup.
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`OrchestratorError::Options`] | `ORCH_OPTIONS` | No |
//! | [`OrchestratorError::Sync`] | `ORCH_SYNC` | delegated |
//! | [`OrchestratorError::Install`] | `ORCH_INSTALL` | delegated |
//! | [`OrchestratorError::Engine`] | `ORCH_ENGINE` | delegated |
//! | [`OrchestratorError::Fs`] | `ORCH_FS` | delegated |
//! | [`OrchestratorError::NoResult`] | `ORCH_NO_RESULT` | Yes |

use super::diagnostics::Diagnostic;
use super::engine::EngineError;
use super::installer::InstallError;
use super::options::OptionsError;
use super::sync::SyncError;
use crate::fs::FsError;
use thiserror::Error;
use weft_types::ErrorCode;

/// Orchestrator failure.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Option resolution rejected the request.
    #[error(transparent)]
    Options(#[from] OptionsError),

    /// Asset synchronization failed.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Dependency installation failed.
    #[error(transparent)]
    Install(#[from] InstallError),

    /// The engine failed outside the structured result path.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Reading build output failed.
    #[error(transparent)]
    Fs(#[from] FsError),

    /// Neither a structured result nor an error arrived in time.
    #[error("no build result within {timeout_ms}ms")]
    NoResult { timeout_ms: u64 },
}

impl OrchestratorError {
    /// Diagnostics carried by an engine error.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Self::Engine(e) => e.diagnostics(),
            _ => &[],
        }
    }
}

impl ErrorCode for OrchestratorError {
    fn code(&self) -> &'static str {
        match self {
            Self::Options(_) => "ORCH_OPTIONS",
            Self::Sync(_) => "ORCH_SYNC",
            Self::Install(_) => "ORCH_INSTALL",
            Self::Engine(_) => "ORCH_ENGINE",
            Self::Fs(_) => "ORCH_FS",
            Self::NoResult { .. } => "ORCH_NO_RESULT",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::Options(_) => false,
            Self::Sync(e) => e.is_recoverable(),
            Self::Install(e) => e.is_recoverable(),
            Self::Engine(e) => e.is_recoverable(),
            Self::Fs(e) => e.is_recoverable(),
            Self::NoResult { .. } => true,
        }
    }
}
