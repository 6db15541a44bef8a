//! Build engine seam.
//!
//! The orchestrator never resolves, transforms or bundles anything
//! itself. It constructs an engine per session through an
//! [`EngineFactory`], calls [`BuildEngine::run`] or
//! [`BuildEngine::watch`], and listens on the session's reporter for the
//! structured result.

use super::diagnostics::Diagnostic;
use super::graphs::GraphSink;
use super::options::ResolvedOptions;
use super::reporter::Reporter;
use crate::fs::{FileSystem, FsError};
use crate::pool::{PoolError, WorkerPool};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use weft_types::ErrorCode;

/// Everything an engine is constructed with.
#[derive(Clone)]
pub struct EngineContext {
    /// Resolved session options.
    pub options: ResolvedOptions,
    /// Worker pool for transform jobs.
    pub pool: Arc<WorkerPool>,
    /// Filesystem sources are read from.
    pub input_fs: Arc<dyn FileSystem>,
    /// Filesystem bundles are written to.
    pub output_fs: Arc<dyn FileSystem>,
    /// Session-owned structured result channel.
    pub reporter: Reporter,
    /// Graph dump sink, present when graph rendering was requested.
    pub graphs: Option<GraphSink>,
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("options", &self.options)
            .field("workers", &self.pool.max_concurrent_workers())
            .field("graphs", &self.graphs.is_some())
            .finish_non_exhaustive()
    }
}

/// Engine failure.
///
/// | Variant | Code | Recoverable |
/// |---------|------|-------------|
/// | [`EngineError::Build`] | `ENGINE_BUILD` | No |
/// | [`EngineError::Config`] | `ENGINE_CONFIG` | No |
/// | [`EngineError::WatchUnsupported`] | `ENGINE_WATCH_UNSUPPORTED` | No |
/// | [`EngineError::Pool`] | `ENGINE_POOL` | delegated |
/// | [`EngineError::Fs`] | `ENGINE_FS` | delegated |
#[derive(Debug, Error)]
pub enum EngineError {
    /// The build failed. May carry diagnostics.
    #[error("{message}")]
    Build {
        message: String,
        diagnostics: Vec<Diagnostic>,
    },

    /// Engine configuration is invalid.
    #[error("invalid engine configuration: {0}")]
    Config(String),

    /// The engine cannot watch its filesystem.
    #[error("watch mode is not supported by this engine")]
    WatchUnsupported,

    /// Worker pool failure.
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// Filesystem failure.
    #[error(transparent)]
    Fs(#[from] FsError),
}

impl EngineError {
    /// Creates a build error without diagnostics.
    pub fn build(message: impl Into<String>) -> Self {
        Self::Build {
            message: message.into(),
            diagnostics: Vec::new(),
        }
    }

    /// Diagnostics carried by the error.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Self::Build { diagnostics, .. } => diagnostics,
            _ => &[],
        }
    }
}

impl ErrorCode for EngineError {
    fn code(&self) -> &'static str {
        match self {
            Self::Build { .. } => "ENGINE_BUILD",
            Self::Config(_) => "ENGINE_CONFIG",
            Self::WatchUnsupported => "ENGINE_WATCH_UNSUPPORTED",
            Self::Pool(_) => "ENGINE_POOL",
            Self::Fs(_) => "ENGINE_FS",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::Pool(e) => e.is_recoverable(),
            Self::Fs(e) => e.is_recoverable(),
            _ => false,
        }
    }
}

/// A running watch.
#[async_trait]
pub trait WatchSubscription: Send + Sync {
    /// Stops watching. A build already running is not aborted.
    async fn unsubscribe(&mut self) -> Result<(), EngineError>;
}

/// The external build engine.
#[async_trait]
pub trait BuildEngine: Send + Sync {
    /// Builds once.
    ///
    /// The structured result is reported through the session reporter;
    /// the returned error is only a fallback.
    async fn run(&self) -> Result<(), EngineError>;

    /// Starts rebuilding on every change, reporting each build through
    /// the session reporter.
    async fn watch(&self) -> Result<Box<dyn WatchSubscription>, EngineError>;
}

/// Constructs one engine per orchestrator session.
pub trait EngineFactory: Send + Sync {
    /// Creates an engine bound to `ctx`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] if the engine cannot be set up.
    fn create(&self, ctx: EngineContext) -> Result<Arc<dyn BuildEngine>, EngineError>;
}

impl<F> EngineFactory for F
where
    F: Fn(EngineContext) -> Result<Arc<dyn BuildEngine>, EngineError> + Send + Sync,
{
    fn create(&self, ctx: EngineContext) -> Result<Arc<dyn BuildEngine>, EngineError> {
        self(ctx)
    }
}
