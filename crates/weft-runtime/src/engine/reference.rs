//! A small build engine that drives the whole coordination path.
//!
//! One bundle per entry: the entry source is transformed on the worker
//! pool (for configured extensions) and written under the target's
//! dist directory with a trailing newline. Entries sharing a file name
//! keep their directory below the app root inside dist. Results go out through the
//! session reporter; the `run()` error path is reserved for failures
//! outside the build itself (pool, filesystem, configuration).

use super::transform::{TransformJob, TransformOutput};
use crate::fs::{FsChange, FsError};
use crate::orchestrator::{
    BuildEngine, BundleInfo, Diagnostic, EngineContext, EngineError, EngineFactory,
    ReporterMessage, WatchSubscription,
};
use crate::paths;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Quiet period after a change before rebuilding.
pub const WATCH_DEBOUNCE: Duration = Duration::from_millis(20);

/// Engine configuration read from the baseline config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Config this one extends. Informational.
    pub extends: Option<String>,
    /// File extensions sent through the transform worker.
    pub transform: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            extends: None,
            transform: ["js", "mjs", "cjs", "jsx", "ts", "tsx"]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

/// Creates a [`ReferenceEngine`] per session.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceEngineFactory;

impl EngineFactory for ReferenceEngineFactory {
    fn create(&self, ctx: EngineContext) -> Result<Arc<dyn BuildEngine>, EngineError> {
        Ok(Arc::new(ReferenceEngine::new(ctx)))
    }
}

/// The reference engine.
#[derive(Debug, Clone)]
pub struct ReferenceEngine {
    ctx: Arc<EngineContext>,
}

enum Built {
    Bundles(Vec<BundleInfo>),
    Failed(Vec<Diagnostic>),
}

impl ReferenceEngine {
    /// Creates an engine bound to `ctx`.
    #[must_use]
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx: Arc::new(ctx) }
    }

    async fn load_config(&self) -> Result<EngineConfig, EngineError> {
        let path = &self.ctx.options.default_config;
        match self.ctx.input_fs.read_to_string(path).await {
            Ok(text) => serde_json::from_str(&text)
                .map_err(|e| EngineError::Config(format!("{path}: {e}"))),
            Err(FsError::NotFound(_)) => Ok(EngineConfig::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Builds once and reports the structured result.
    async fn build(&self) -> Result<(), EngineError> {
        let started = Instant::now();
        let config = self.load_config().await?;

        match self.build_bundles(&config).await? {
            Built::Bundles(bundles) => {
                let build_time = millis(started.elapsed());
                info!(bundles = bundles.len(), build_time, "build succeeded");
                self.ctx.reporter.stdout(ReporterMessage::BuildSuccess {
                    bundles,
                    build_time,
                });
            }
            Built::Failed(diagnostics) => {
                info!(diagnostics = diagnostics.len(), "build failed");
                self.ctx
                    .reporter
                    .stderr(ReporterMessage::BuildFailure {
                        message: diagnostics,
                    });
            }
        }
        Ok(())
    }

    async fn build_bundles(&self, config: &EngineConfig) -> Result<Built, EngineError> {
        let options = &self.ctx.options;
        if options.entries.is_empty() {
            return Ok(Built::Failed(vec![Diagnostic::new("No entries found")
                .with_origin("weft")]));
        }

        let mut diagnostics = Vec::new();
        let mut jobs = JoinSet::new();
        for (index, entry) in options.entries.iter().enumerate() {
            let source = match self.ctx.input_fs.read_to_string(entry).await {
                Ok(source) => source,
                Err(FsError::NotFound(_)) => {
                    diagnostics.push(
                        Diagnostic::new(format!("Entry {entry} does not exist"))
                            .with_origin("weft")
                            .with_file_path(entry.clone()),
                    );
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let transform = config
                .transform
                .iter()
                .any(|ext| extension(entry) == Some(ext.as_str()));
            let job = TransformJob {
                path: entry.clone(),
                source,
                minify: options.default_target.should_optimize,
            };
            let pool = Arc::clone(&self.ctx.pool);
            jobs.spawn(async move {
                let started = Instant::now();
                let output = if transform {
                    let request = serde_json::to_value(&job)
                        .map_err(|e| EngineError::build(format!("bad transform job: {e}")))?;
                    let reply = pool.run_job(request).await?;
                    serde_json::from_value::<TransformOutput>(reply)
                        .map_err(|e| EngineError::build(format!("bad transform reply: {e}")))?
                } else {
                    TransformOutput {
                        code: Some(job.source),
                        diagnostics: Vec::new(),
                    }
                };
                Ok::<_, EngineError>((index, job.path, output, millis(started.elapsed())))
            });
        }

        let mut outputs = Vec::new();
        while let Some(joined) = jobs.join_next().await {
            let (index, entry, output, time) =
                joined.map_err(|e| EngineError::build(format!("transform task failed: {e}")))??;
            diagnostics.extend(output.diagnostics);
            if let Some(code) = output.code {
                outputs.push((index, entry, code, time));
            }
        }
        if !diagnostics.is_empty() {
            return Ok(Built::Failed(diagnostics));
        }
        outputs.sort_by_key(|(index, ..)| *index);

        let target = &options.default_target;
        self.ctx.output_fs.mkdirp(&target.dist_dir).await?;
        let mut name_counts: HashMap<String, usize> = HashMap::new();
        for (_, entry, ..) in &outputs {
            *name_counts
                .entry(paths::file_name(entry).to_string())
                .or_default() += 1;
        }

        let mut bundles = Vec::with_capacity(outputs.len());
        let mut edges = Vec::with_capacity(outputs.len());
        for (_, entry, code, time) in outputs {
            let file_name = paths::file_name(&entry);
            let dir = if name_counts.get(file_name).copied().unwrap_or(0) > 1 {
                let dir = paths::join(&target.dist_dir, &app_relative_dir(&entry));
                self.ctx.output_fs.mkdirp(&dir).await?;
                dir
            } else {
                target.dist_dir.clone()
            };
            let name = bundle_name(file_name, &code, options.should_content_hash);
            let file_path = paths::join(&dir, &name);
            let content = format!("{code}\n");
            self.ctx.output_fs.write(&file_path, &content).await?;
            debug!(entry = %entry, bundle = %file_path, "bundle written");

            edges.push(format!("  \"{entry}\" -> \"{file_path}\";"));
            bundles.push(BundleInfo {
                file_path,
                size: content.len() as u64,
                time,
            });
        }

        if let Some(graphs) = &self.ctx.graphs {
            graphs.dump(
                "bundle_graph",
                format!("digraph bundle_graph {{\n{}\n}}", edges.join("\n")),
            );
        }
        if target.source_maps {
            self.ctx.reporter.sourcemap(json!({
                "bundles": bundles.iter().map(|b| json!({
                    "name": paths::to_asset_path(&b.file_path),
                    "size": b.size,
                })).collect::<Vec<_>>(),
            }));
        }

        Ok(Built::Bundles(bundles))
    }

    /// Builds and turns any error into a reported failure.
    async fn rebuild(&self) {
        if let Err(e) = self.build().await {
            warn!(error = %e, "rebuild failed");
            let mut diagnostics = e.diagnostics().to_vec();
            if diagnostics.is_empty() {
                diagnostics.push(Diagnostic::new(e.to_string()).with_origin("weft"));
            }
            self.ctx.reporter.stderr(ReporterMessage::BuildFailure {
                message: diagnostics,
            });
        }
    }

    fn is_source_change(&self, path: &str) -> bool {
        let options = &self.ctx.options;
        paths::is_ancestor_or_self(paths::APP_DIR, path)
            && !paths::is_ancestor_or_self(&options.default_target.dist_dir, path)
            && !paths::is_ancestor_or_self(&options.cache_dir, path)
    }

    async fn watch_loop(
        self,
        mut changes: broadcast::Receiver<FsChange>,
        mut stop: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                _ = stop.changed() => break,
                change = changes.recv() => match change {
                    Ok(change) if self.is_source_change(&change.path) => {
                        debug!(path = %change.path, kind = ?change.kind, "source changed");
                    }
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "change notifications lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }

            tokio::time::sleep(WATCH_DEBOUNCE).await;
            while changes.try_recv().is_ok() {}
            if *stop.borrow() {
                break;
            }
            self.rebuild().await;
        }
        debug!("watch loop stopped");
    }
}

#[async_trait]
impl BuildEngine for ReferenceEngine {
    async fn run(&self) -> Result<(), EngineError> {
        self.build().await
    }

    async fn watch(&self) -> Result<Box<dyn WatchSubscription>, EngineError> {
        let changes = self
            .ctx
            .input_fs
            .subscribe()
            .ok_or(EngineError::WatchUnsupported)?;

        self.rebuild().await;

        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(self.clone().watch_loop(changes, stop_rx));
        Ok(Box::new(ReferenceWatch {
            stop: stop_tx,
            task: Some(task),
        }))
    }
}

struct ReferenceWatch {
    stop: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

#[async_trait]
impl WatchSubscription for ReferenceWatch {
    async fn unsubscribe(&mut self) -> Result<(), EngineError> {
        let _ = self.stop.send(true);
        if let Some(task) = self.task.take() {
            // Lets a running rebuild finish.
            let _ = task.await;
        }
        Ok(())
    }
}

/// Directory of `entry` relative to the app root; empty at the root.
fn app_relative_dir(entry: &str) -> String {
    let parent = paths::parent(entry).unwrap_or_default();
    parent
        .strip_prefix(paths::APP_DIR)
        .unwrap_or(&parent)
        .trim_start_matches('/')
        .to_string()
}

fn extension(path: &str) -> Option<&str> {
    let name = paths::file_name(path);
    name.rsplit_once('.').map(|(_, ext)| ext)
}

fn bundle_name(file_name: &str, code: &str, content_hash: bool) -> String {
    if !content_hash {
        return file_name.to_string();
    }
    let hash = format!("{:016x}", fnv1a(code.as_bytes()));
    let short = &hash[..8];
    match file_name.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}.{short}.{ext}"),
        None => format!("{file_name}.{short}"),
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(0x0100_0000_01b3)
    })
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
