//! Weft CLI - bundle a project directory through the weft orchestrator.
//!
//! # Configuration
//!
//! Configuration is loaded from multiple sources with priority:
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`WEFT_*`)
//! 3. Project config (`.weft/config.toml` in the project directory)
//! 4. Global config (`~/.weft/config.toml`)
//! 5. Default values (lowest priority)
//!
//! # Environment Variables
//!
//! - `WEFT_DEBUG`: Enable debug mode (`true`/`false`)
//! - `WEFT_WORKERS`: Worker pool size
//! - `WEFT_RESULT_TIMEOUT_MS`: Wait for a structured result, in ms
//! - `WEFT_CACHE_DIR`: Cache directory inside the working root
//! - `WEFT_MODE`: `development` or `production`
//! - `WEFT_LOG`: Default log filter

mod source;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use weft_runtime::config::{default_config_path, ConfigLoader, ConfigResolver, WeftConfig};
use weft_runtime::engine::{ReferenceEngineFactory, TransformWorker};
use weft_runtime::fs::{FileSystem, OsFs};
use weft_runtime::orchestrator::{
    BuildOptions, BuildOutput, ManifestLinker, Mode, Orchestrator, Progress,
};
use weft_runtime::pool::PoolManager;
use weft_runtime::LocalBus;

/// Weft - a bundler coordination core
#[derive(Parser, Debug)]
#[command(name = "weft")]
#[command(version, about, long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Global config file (defaults to ~/.weft/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Bundle a project directory once
    Bundle(BundleArgs),

    /// Print the effective configuration
    Config {
        /// Project directory whose `.weft/config.toml` is layered in
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Print the global config path instead
        #[arg(long)]
        path: bool,
    },
}

#[derive(clap::Args, Debug)]
struct BundleArgs {
    /// Project directory
    #[arg(default_value = ".")]
    dir: PathBuf,

    /// Entry file, relative to the project directory (repeatable)
    #[arg(short, long = "entry", value_name = "PATH")]
    entries: Vec<String>,

    /// Build mode (development, production)
    #[arg(short, long)]
    mode: Option<Mode>,

    /// Worker pool size
    #[arg(short, long)]
    workers: Option<usize>,

    /// Minify bundles
    #[arg(long)]
    minify: bool,

    /// Add a content hash to bundle names
    #[arg(long)]
    content_hash: bool,

    /// Emit source maps; the visualization payload appears in `--json` output
    #[arg(long)]
    source_maps: bool,

    /// Include graph dumps in the result
    #[arg(long)]
    graphs: bool,

    /// Working tree (defaults to <dir>/.weft/work)
    #[arg(long, value_name = "DIR")]
    work_dir: Option<PathBuf>,

    /// Where bundles are written (defaults to <dir>/dist)
    #[arg(short, long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

/// CLI arguments as the highest-priority config layer.
struct CliOverrides {
    debug: bool,
    mode: Option<Mode>,
    workers: Option<usize>,
}

impl ConfigResolver for CliOverrides {
    fn apply(&self, config: &mut WeftConfig) {
        if self.debug {
            config.debug = true;
        }
        if self.mode.is_some() {
            config.build.mode = self.mode;
        }
        if self.workers.is_some() {
            config.build.workers = self.workers;
        }
    }
}

fn load_config(args: &Args, project: &Path, overrides: &CliOverrides) -> Result<WeftConfig> {
    let mut loader = ConfigLoader::new().with_project_root(project);
    if let Some(path) = &args.config {
        loader = loader.with_global_config(path);
    }
    let mut config = loader
        .load()
        .map_err(|e| anyhow::anyhow!("Config error: {e}"))?;
    overrides.apply(&mut config);
    Ok(config)
}

fn init_tracing(args: &Args, config: &WeftConfig) {
    let filter = if args.debug || config.debug {
        EnvFilter::new("debug")
    } else if args.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level))
    };

    // stdout carries results; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    match &args.command {
        Command::Config { dir, path } => {
            if *path {
                let path = args.config.clone().unwrap_or_else(default_config_path);
                println!("{}", path.display());
                return Ok(());
            }
            let overrides = CliOverrides {
                debug: args.debug,
                mode: None,
                workers: None,
            };
            let config = load_config(&args, dir, &overrides)?;
            print!("{}", config.to_toml()?);
            Ok(())
        }
        Command::Bundle(bundle) => {
            let overrides = CliOverrides {
                debug: args.debug,
                mode: bundle.mode,
                workers: bundle.workers,
            };
            let config = load_config(&args, &bundle.dir, &overrides)?;
            init_tracing(&args, &config);
            run_bundle(bundle, &config).await
        }
    }
}

async fn run_bundle(args: &BundleArgs, config: &WeftConfig) -> Result<()> {
    let dir = args
        .dir
        .canonicalize()
        .with_context(|| format!("project directory {}", args.dir.display()))?;
    let work_dir = args
        .work_dir
        .clone()
        .unwrap_or_else(|| dir.join(".weft").join("work"));
    let out_dir = args.out_dir.clone().unwrap_or_else(|| dir.join("dist"));
    info!(project = %dir.display(), work_dir = %work_dir.display(), "Project root");

    let assets = source::collect_assets(&dir, &args.entries)?;
    debug!(assets = assets.len(), "collected sources");

    std::fs::create_dir_all(&work_dir)
        .with_context(|| format!("creating {}", work_dir.display()))?;
    let fs: Arc<dyn FileSystem> = Arc::new(OsFs::new(&work_dir));
    let bus = Arc::new(LocalBus::new());
    let pools = Arc::new(PoolManager::new(Arc::new(TransformWorker), bus));
    let orchestrator = Orchestrator::new(Arc::clone(&pools), fs, Arc::new(ReferenceEngineFactory))
        .with_installer(Arc::new(ManifestLinker))
        .with_config(config.build.orchestrator_config());

    let options = BuildOptions {
        minify: args.minify.then_some(true),
        content_hash: args.content_hash.then_some(true),
        source_maps: args.source_maps.then_some(true),
        view_sourcemaps: args.source_maps,
        render_graphs: args.graphs,
        ..BuildOptions::default()
    };
    let on_progress = |progress: Progress| info!(?progress, "progress");

    let output = orchestrator.bundle(&assets, &options, &on_progress).await;
    pools.end().await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    }

    match &output {
        BuildOutput::Success {
            bundles,
            build_time,
            ..
        } => {
            for bundle in bundles {
                let path = source::output_path(&out_dir, &bundle.name);
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("creating {}", parent.display()))?;
                }
                std::fs::write(&path, format!("{}\n", bundle.content))
                    .with_context(|| format!("writing {}", path.display()))?;
                if !args.json {
                    println!("{}  {} B  {} ms", path.display(), bundle.size, bundle.time);
                }
            }
            if !args.json {
                println!("Built in {build_time} ms");
            }
            Ok(())
        }
        BuildOutput::Failure { diagnostics, error } => {
            if !args.json {
                for (path, list) in diagnostics {
                    for d in list {
                        eprintln!("{path}:{}-{}: {} [{}]", d.from, d.to, d.message, d.source);
                    }
                }
                if let Some(error) = error {
                    eprintln!("error[{}]: {}", error.code, error.message);
                }
            }
            bail!("build failed")
        }
    }
}
