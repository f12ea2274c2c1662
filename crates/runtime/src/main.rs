#![deny(clippy::all, clippy::pedantic)]

use std::path::PathBuf;
use std::sync::mpsc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use compute::{Coprocessor, MockCoprocessor};
use render::{RenderConfig, Scale};
use runtime::{parse_scene, snapshot, Checkpoint, ConfigWatcher, Harness, HarnessConfig};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Backend {
    /// Runs each kernel inline on status polls.
    Mock,
    /// Runs kernels on a worker thread.
    Threaded,
}

#[derive(Debug, Parser)]
#[command(name = "marcher", about = "Fixed-point SDF ray marcher", version)]
struct Cli {
    /// Number of frames to run
    #[arg(long, default_value_t = 100)]
    frames: u64,
    /// Starting scene, by name or index
    #[arg(long, default_value = "morph")]
    scene: String,
    /// Output scale: 1, 2 or 4
    #[arg(long, default_value = "1")]
    scale: Scale,
    #[arg(long, value_enum, default_value_t = Backend::Threaded)]
    backend: Backend,
    /// JSON render config
    #[arg(long)]
    config: Option<PathBuf>,
    /// Switch to the next scene every N frames
    #[arg(long)]
    cycle_every: Option<u64>,
    /// Write the last frame to this PNG
    #[arg(long)]
    dump: Option<PathBuf>,
    /// Reload --config when it changes
    #[arg(long, requires = "config")]
    watch: bool,
    /// Animation time per frame
    #[arg(long, default_value_t = 0.025)]
    time_step: f32,
    #[arg(long, default_value_t = 8)]
    max_consecutive_faults: u32,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.backend {
        Backend::Mock => run(MockCoprocessor::new(), &cli),
        Backend::Threaded => run(threaded()?, &cli),
    }
}

#[cfg(feature = "threaded")]
fn threaded() -> Result<compute::ThreadedCoprocessor> {
    compute::ThreadedCoprocessor::new().context("starting co-processor thread")
}

#[cfg(not(feature = "threaded"))]
fn threaded() -> Result<MockCoprocessor> {
    tracing::warn!("built without the threaded backend; using the mock");
    Ok(MockCoprocessor::new())
}

fn run<C: Coprocessor>(coprocessor: C, cli: &Cli) -> Result<()> {
    let render_config = match &cli.config {
        Some(path) => RenderConfig::from_path(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => RenderConfig::default(),
    };
    let scene = parse_scene(&cli.scene)?;
    let harness_config = HarnessConfig {
        frames: cli.frames,
        time_step: cli.time_step,
        cycle_every: cli.cycle_every,
        max_consecutive_faults: cli.max_consecutive_faults,
    };

    let mut harness = Harness::new(
        coprocessor,
        render_config,
        harness_config,
        Checkpoint::new(scene, cli.scale),
    )?;

    let _watcher = match (&cli.config, cli.watch) {
        (Some(path), true) => {
            let (tx, rx) = mpsc::channel();
            let watcher = ConfigWatcher::start(path, tx)?;
            harness = harness.with_reloads(rx);
            Some(watcher)
        }
        _ => None,
    };

    let summary = harness.run()?;
    tracing::info!(
        drawn = summary.frames_drawn,
        dropped = summary.frames_dropped,
        hits = summary.hits,
        misses = summary.misses,
        "done"
    );
    if let Some(stats) = &summary.last_stats {
        tracing::info!("last frame: {} at {} in {:?}", stats.scene, stats.scale, stats.elapsed);
    }

    if let Some(path) = &cli.dump {
        snapshot::save_png(harness.framebuffer(), path)?;
    }
    Ok(())
}
