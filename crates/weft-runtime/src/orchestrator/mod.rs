//! Build orchestration.
//!
//! An [`Orchestrator`] drives one-shot builds ([`Orchestrator::bundle`])
//! and continuous builds ([`Orchestrator::watch`]) through an external
//! [`BuildEngine`].
//!
//! # Session Lifecycle
//!
//! ```text
//!  setup ──► listen ──► sync ──► install ──► engine.run()
//!    │          │                                 │
//!    │          │ first buildSuccess/buildFailure │ Err(e) captured
//!    │          ▼                                 ▼
//!    │      structured ─────── race(timeout) ─────┘
//!    │                              │
//!    ▼                              ▼
//!  pool, cache dir,        Success / Failure
//!  build id, baseline
//! ```
//!
//! Every session owns its [`Reporter`]; nothing is shared between
//! concurrent orchestrators except the worker pool.
//!
//! # Result Precedence
//!
//! A structured result always wins. The error returned by `run()` is
//! only used when no structured result arrives within the configured
//! result timeout, and is reported after that timeout elapses.

mod diagnostics;
mod engine;
mod error;
mod graphs;
mod installer;
mod options;
mod reporter;
mod result;
mod sync;

pub use diagnostics::{
    nth_index, translate_diagnostics, CodeFrame, CodeHighlight, Diagnostic, Position,
};
pub use engine::{BuildEngine, EngineContext, EngineError, EngineFactory, WatchSubscription};
pub use error::OrchestratorError;
pub use graphs::GraphSink;
pub use installer::{
    classify_progress, DependencyInstaller, InstallError, InstallPhase, ManifestLinker,
    NoopInstaller, OutputSink, Progress,
};
pub use options::{
    generate_manifest, resolve_options, resolve_project_root, BuildOptions, Mode, OptionsError,
    ResolvedOptions, TargetOptions,
};
pub use reporter::{
    channel as reporter_channel, BundleInfo, Reporter, ReporterMessage, ReporterStream,
};
pub use result::{
    Bundle, BuildOutput, DiagnosticMap, EditorDiagnostic, Graph, RawError, Severity,
};
pub use sync::{sync_assets, Asset, SyncError, SyncReport, ALWAYS_KEEP, MANIFEST_PATH};

use crate::fs::FileSystem;
use crate::paths;
use crate::pool::PoolManager;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};
use weft_event::{CustomEvent, EventTarget, Listener};
use weft_types::ErrorCode;

/// Default wait for a structured result after `run()` returns.
pub const DEFAULT_RESULT_TIMEOUT: Duration = Duration::from_millis(100);

/// Content of the baseline engine configuration written on setup.
pub const BASELINE_CONFIG_CONTENT: &str = r#"{
  "extends": "@weft/config-default",
  "transform": ["js", "mjs", "cjs", "jsx", "ts", "tsx"]
}
"#;

/// Fan-out event name for watch-mode results.
pub const BUILD_EVENT: &str = "build";

/// Progress callback.
pub type ProgressSink<'a> = &'a (dyn Fn(Progress) + Send + Sync);

/// Orchestrator settings that are not per-call options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Wait for a structured result after `run()` returns.
    pub result_timeout: Duration,
    /// Worker count when the call does not name one.
    pub workers: Option<usize>,
    /// Cache directory when the call does not name one.
    pub cache_dir: Option<String>,
    /// Mode when the call does not name one.
    pub mode: Option<Mode>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            result_timeout: DEFAULT_RESULT_TIMEOUT,
            workers: None,
            cache_dir: None,
            mode: None,
        }
    }
}

/// Drives builds against one working filesystem.
pub struct Orchestrator {
    pools: Arc<PoolManager>,
    fs: Arc<dyn FileSystem>,
    engines: Arc<dyn EngineFactory>,
    installer: Arc<dyn DependencyInstaller>,
    config: OrchestratorConfig,
}

/// Per-session state produced by setup.
struct Session {
    options: ResolvedOptions,
    engine: Arc<dyn BuildEngine>,
    stream: ReporterStream,
    results: ResultMapper,
    manifest: String,
}

impl Orchestrator {
    /// Creates an orchestrator with no dependency installer and default
    /// settings.
    #[must_use]
    pub fn new(
        pools: Arc<PoolManager>,
        fs: Arc<dyn FileSystem>,
        engines: Arc<dyn EngineFactory>,
    ) -> Self {
        Self {
            pools,
            fs,
            engines,
            installer: Arc::new(NoopInstaller),
            config: OrchestratorConfig::default(),
        }
    }

    /// Sets the dependency installer.
    #[must_use]
    pub fn with_installer(mut self, installer: Arc<dyn DependencyInstaller>) -> Self {
        self.installer = installer;
        self
    }

    /// Sets the orchestrator settings.
    #[must_use]
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Current settings.
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// The working filesystem.
    #[must_use]
    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// Builds `assets` once.
    ///
    /// Never fails: every error is folded into [`BuildOutput::Failure`].
    pub async fn bundle(
        &self,
        assets: &[Asset],
        options: &BuildOptions,
        on_progress: ProgressSink<'_>,
    ) -> BuildOutput {
        let started = Instant::now();
        let options = self.effective_options(options);

        let output = match self.try_bundle(assets, &options, on_progress).await {
            Ok(output) => output,
            Err(e) => {
                warn!(code = e.code(), error = %e, "build failed");
                failure_from_error(self.fs.as_ref(), &e).await
            }
        };

        debug!(
            elapsed_ms = elapsed_ms(started),
            success = output.is_success(),
            "bundle finished"
        );
        output
    }

    /// Starts a continuous build of `assets`.
    ///
    /// `on_build` runs once per build, in order, with the translated
    /// result. Failures are delivered through it as well; the watch stays
    /// alive.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] if setup, synchronization,
    /// installation or starting the engine's watch fails.
    pub async fn watch<F>(
        &self,
        assets: &[Asset],
        options: &BuildOptions,
        on_build: F,
        on_progress: ProgressSink<'_>,
    ) -> Result<WatchHandle, OrchestratorError>
    where
        F: Fn(BuildOutput) + Send + Sync + 'static,
    {
        let options = self.effective_options(options);
        let Session {
            options: resolved,
            engine,
            mut stream,
            results,
            manifest,
        } = self.setup(assets, &options).await?;

        let target = Arc::new(EventTarget::<WatchedBuild>::new());
        let (deliver_tx, mut deliver_rx) = mpsc::unbounded_channel();
        let listener: Listener<WatchedBuild> =
            Arc::new(move |event: &CustomEvent<WatchedBuild>| {
                let _ = deliver_tx.send(event.detail().clone());
            });
        target.add_listener(BUILD_EVENT, Arc::clone(&listener));

        let view_sourcemaps = options.view_sourcemaps;
        let pump = {
            let target = Arc::clone(&target);
            tokio::spawn(async move {
                // An engine reports a build's sourcemap before its result.
                let mut sourcemap = None;
                while let Some(message) = stream.recv().await {
                    match message {
                        ReporterMessage::Sourcemap { data } => sourcemap = Some(data),
                        message if message.is_build_result() => {
                            let build = WatchedBuild {
                                message,
                                sourcemap: sourcemap.take().filter(|_| view_sourcemaps),
                            };
                            target.dispatch(&CustomEvent::new(BUILD_EVENT, build));
                        }
                        other => trace!(message = ?other, "reporter message ignored"),
                    }
                }
            })
        };

        let delivery = {
            let fs = Arc::clone(&self.fs);
            tokio::spawn(async move {
                while let Some(build) = deliver_rx.recv().await {
                    let WatchedBuild { message, sourcemap } = build;
                    let output = match results.map(message, sourcemap).await {
                        Ok(output) => output,
                        Err(e) => failure_from_error(fs.as_ref(), &e).await,
                    };
                    on_build(output);
                }
            })
        };
        let tasks = vec![TaskGuard(pump), TaskGuard(delivery)];

        self.prepare(&resolved, &manifest, assets, on_progress).await?;
        let subscription = engine.watch().await?;
        info!(build_id = %resolved.build_id, "watching");

        Ok(WatchHandle {
            subscription: tokio::sync::Mutex::new(Some(subscription)),
            target,
            listener,
            fs: Arc::clone(&self.fs),
            manifest,
            keep: vec![resolved.cache_dir],
            _engine: engine,
            _tasks: tasks,
        })
    }

    async fn try_bundle(
        &self,
        assets: &[Asset],
        options: &BuildOptions,
        on_progress: ProgressSink<'_>,
    ) -> Result<BuildOutput, OrchestratorError> {
        let Session {
            options: resolved,
            engine,
            mut stream,
            results,
            manifest,
        } = self.setup(assets, options).await?;

        let (result_tx, result_rx) = oneshot::channel();
        let (sourcemap_tx, sourcemap_rx) = oneshot::channel();
        let _listener = TaskGuard(tokio::spawn(async move {
            let mut result_tx = Some(result_tx);
            let mut sourcemap_tx = Some(sourcemap_tx);
            while let Some(message) = stream.recv().await {
                match message {
                    ReporterMessage::Sourcemap { data } => {
                        if let Some(tx) = sourcemap_tx.take() {
                            let _ = tx.send(data);
                        }
                    }
                    message if message.is_build_result() => {
                        if let Some(tx) = result_tx.take() {
                            let _ = tx.send(message);
                        }
                    }
                    other => trace!(message = ?other, "reporter message ignored"),
                }
            }
        }));

        self.prepare(&resolved, &manifest, assets, on_progress).await?;

        let run_error = engine.run().await.err();
        if let Some(e) = &run_error {
            debug!(error = %e, "engine run failed, waiting for structured result");
        }

        let deadline = Instant::now() + self.config.result_timeout;
        match tokio::time::timeout_at(deadline, recv_or_pending(result_rx)).await {
            Ok(message) => {
                let sourcemaps = if options.view_sourcemaps {
                    tokio::time::timeout_at(deadline, recv_or_pending(sourcemap_rx))
                        .await
                        .ok()
                } else {
                    None
                };
                results.map(message, sourcemaps).await
            }
            Err(_) => match run_error {
                Some(e) => Err(e.into()),
                None => Err(OrchestratorError::NoResult {
                    timeout_ms: u64::try_from(self.config.result_timeout.as_millis())
                        .unwrap_or(u64::MAX),
                }),
            },
        }
    }

    fn effective_options(&self, options: &BuildOptions) -> BuildOptions {
        let mut options = options.clone();
        options.mode = options.mode.or(self.config.mode);
        options.workers = options.workers.or(self.config.workers);
        if options.cache_dir.is_none() {
            options.cache_dir.clone_from(&self.config.cache_dir);
        }
        options
    }

    async fn setup(
        &self,
        assets: &[Asset],
        options: &BuildOptions,
    ) -> Result<Session, OrchestratorError> {
        let entries: Vec<String> = assets
            .iter()
            .filter(|a| a.is_entry)
            .map(Asset::path)
            .collect();
        let project_root = resolve_project_root(self.fs.as_ref(), &entries).await;
        let resolved = resolve_options(options, entries, &project_root)?;

        let pool = self.pools.ensure_started(options.workers).await;
        self.write_baseline().await?;

        let graphs = options.render_graphs.then(GraphSink::new);
        let (reporter, stream) = reporter::channel();
        let engine = self.engines.create(EngineContext {
            options: resolved.clone(),
            pool,
            input_fs: Arc::clone(&self.fs),
            output_fs: Arc::clone(&self.fs),
            reporter,
            graphs: graphs.clone(),
        })?;

        info!(
            build_id = %resolved.build_id,
            mode = %resolved.mode,
            entries = resolved.entries.len(),
            cache_dir = %resolved.cache_dir,
            "session started"
        );

        Ok(Session {
            options: resolved,
            engine,
            stream,
            results: ResultMapper {
                fs: Arc::clone(&self.fs),
                graphs,
            },
            manifest: generate_manifest(options),
        })
    }

    async fn write_baseline(&self) -> Result<(), OrchestratorError> {
        for (path, content) in [
            (paths::BASELINE_CONFIG, BASELINE_CONFIG_CONTENT),
            (paths::EMPTY_MODULE, ""),
        ] {
            if !self.fs.exists(path).await {
                self.fs.write(path, content).await?;
            }
        }
        Ok(())
    }

    async fn prepare(
        &self,
        resolved: &ResolvedOptions,
        manifest: &str,
        assets: &[Asset],
        on_progress: ProgressSink<'_>,
    ) -> Result<(), OrchestratorError> {
        sync_assets(
            self.fs.as_ref(),
            assets,
            manifest,
            std::slice::from_ref(&resolved.cache_dir),
        )
        .await?;

        let forward = |line: &str| {
            if let Some(phase) = classify_progress(line) {
                on_progress(Progress::Installing(phase));
            }
        };
        self.installer
            .install(self.fs.as_ref(), paths::APP_DIR, &forward)
            .await?;

        on_progress(Progress::Bundling);
        Ok(())
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Handle returned by [`Orchestrator::watch`].
///
/// Dropping it stops result delivery; call [`WatchHandle::unsubscribe`]
/// to also stop the engine's watcher.
pub struct WatchHandle {
    subscription: tokio::sync::Mutex<Option<Box<dyn WatchSubscription>>>,
    target: Arc<EventTarget<WatchedBuild>>,
    listener: Listener<WatchedBuild>,
    fs: Arc<dyn FileSystem>,
    manifest: String,
    keep: Vec<String>,
    _engine: Arc<dyn BuildEngine>,
    _tasks: Vec<TaskGuard>,
}

impl WatchHandle {
    /// Stops the engine's watcher and future result delivery. A build
    /// already running is not aborted. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Engine`] if the engine fails to stop.
    pub async fn unsubscribe(&self) -> Result<(), OrchestratorError> {
        let Some(mut subscription) = self.subscription.lock().await.take() else {
            return Ok(());
        };
        self.target.remove_listener(BUILD_EVENT, &self.listener);
        subscription.unsubscribe().await?;
        info!("watch stopped");
        Ok(())
    }

    /// Returns `true` until [`WatchHandle::unsubscribe`] ran.
    pub async fn is_active(&self) -> bool {
        self.subscription.lock().await.is_some()
    }

    /// Re-synchronizes a new asset set without restarting the watcher.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Sync`] if synchronization fails.
    pub async fn write_assets(&self, assets: &[Asset]) -> Result<SyncReport, OrchestratorError> {
        Ok(sync_assets(self.fs.as_ref(), assets, &self.manifest, &self.keep).await?)
    }
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle").finish_non_exhaustive()
    }
}

/// One watch-mode build result with the sourcemap reported for it.
#[derive(Debug, Clone)]
struct WatchedBuild {
    message: ReporterMessage,
    sourcemap: Option<Value>,
}

/// Maps structured results into caller-facing output.
#[derive(Clone)]
struct ResultMapper {
    fs: Arc<dyn FileSystem>,
    graphs: Option<GraphSink>,
}

impl ResultMapper {
    async fn map(
        &self,
        message: ReporterMessage,
        sourcemaps: Option<Value>,
    ) -> Result<BuildOutput, OrchestratorError> {
        match message {
            ReporterMessage::BuildSuccess {
                bundles,
                build_time,
            } => {
                let mut out = Vec::with_capacity(bundles.len());
                for info in bundles {
                    let path = paths::resolve(paths::APP_DIR, &info.file_path);
                    let mut content = self.fs.read_to_string(&path).await?;
                    if content.ends_with('\n') {
                        content.pop();
                    }
                    out.push(Bundle {
                        name: paths::to_asset_path(&path),
                        content,
                        size: info.size,
                        time: info.time,
                    });
                }
                out.sort_by(|a, b| a.name.cmp(&b.name));

                Ok(BuildOutput::Success {
                    bundles: out,
                    build_time,
                    graphs: self.graphs.as_ref().map(GraphSink::take),
                    sourcemaps,
                })
            }
            ReporterMessage::BuildFailure { message } => Ok(BuildOutput::Failure {
                diagnostics: translate_diagnostics(self.fs.as_ref(), &message).await,
                error: None,
            }),
            other => {
                Err(EngineError::build(format!("unexpected reporter message: {other:?}")).into())
            }
        }
    }
}

/// Converts an error raised outside the structured path into a failure,
/// keeping the innermost error's code and message.
async fn failure_from_error(fs: &dyn FileSystem, err: &OrchestratorError) -> BuildOutput {
    let raw = match err {
        OrchestratorError::Options(e) => RawError::from_error(e),
        OrchestratorError::Sync(e) => RawError::from_error(e),
        OrchestratorError::Install(e) => RawError::from_error(e),
        OrchestratorError::Engine(e) => RawError::from_error(e),
        OrchestratorError::Fs(e) => RawError::from_error(e),
        OrchestratorError::NoResult { .. } => RawError::from_error(err),
    };
    BuildOutput::Failure {
        diagnostics: translate_diagnostics(fs, err.diagnostics()).await,
        error: Some(raw),
    }
}

/// Waits for `rx`; a dropped sender never resolves.
async fn recv_or_pending<T>(rx: oneshot::Receiver<T>) -> T {
    match rx.await {
        Ok(value) => value,
        Err(_) => std::future::pending().await,
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Aborts the task when dropped.
struct TaskGuard(JoinHandle<()>);

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}
