//! VGA Scanout Simulator
//!
//! Runs the scanout pipeline on the host: a software engine stands in for the
//! RGB panel peripheral while a demo producer animates the logical frame.

mod capture;
mod config;
mod engine;
mod producer;
mod timing;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vga_scanout_hw::{HeapPool, MemoryPool};

use config::Config;
use engine::{EngineOptions, SoftEngine};
use timing::VideoMode;

#[derive(Parser)]
#[command(name = "vgasimd")]
#[command(about = "Host-side VGA scanout simulator")]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(default_value = "config/default.toml")]
    config: String,

    /// Frames to scan out before exiting (0 = until signalled)
    #[arg(short, long)]
    frames: Option<u64>,

    /// Save the given frame number as PNG to the capture path
    #[arg(long)]
    capture: Option<u64>,

    /// Run as fast as possible instead of at the mode's refresh rate
    #[arg(long)]
    unpaced: bool,

    /// Write the effective configuration to this path and exit
    #[arg(long)]
    save_config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse()?))
        .init();

    // Load configuration
    let mut config = Config::load(&cli.config).context("Failed to load configuration")?;
    info!("Loaded configuration from: {}", cli.config);

    if let Some(frames) = cli.frames {
        config.engine.frames = frames;
    }
    if let Some(frame) = cli.capture {
        config.engine.capture_frame = Some(frame);
    }
    if cli.unpaced {
        config.engine.realtime = false;
    }

    if let Some(path) = &cli.save_config {
        config.save(path)?;
        info!("Saved effective configuration to: {}", path);
        return Ok(());
    }

    // Resolve geometry and timing
    let geometry = config.display.geometry()?;
    let frame_period = if config.engine.realtime {
        let mode = VideoMode::lookup(geometry.screen_width(), geometry.screen_height())?;
        info!("Video mode {}", mode);
        Some(mode.frame_period())
    } else {
        None
    };

    // Allocate frame buffers
    let region = config.memory.region()?;
    let pool = match config.memory.limit {
        Some(limit) => HeapPool::with_limit(region, limit),
        None => HeapPool::new(region),
    };
    let (producer, scanout) = vga_scanout_hw::init(geometry, &pool, config.display.initial_fill)
        .context("Failed to set up frame buffers")?;
    info!("{} bytes of {} memory in use", pool.used(), pool.region());

    let options = EngineOptions {
        bounce_lines: config.bounce_lines(&geometry),
        frames: config.engine.frames,
        frame_period,
        capture_frame: config.engine.capture_frame,
        stats_interval: config.engine.stats_interval,
    };
    let mut engine = SoftEngine::new(scanout, options).context("Invalid engine configuration")?;

    let stop = Arc::new(AtomicBool::new(false));

    // Start producer
    let pattern = config.producer.pattern()?;
    let fill = config.producer.fill;
    let producer_stop = stop.clone();
    let producer_handle = std::thread::Builder::new()
        .name("producer".to_string())
        .spawn(move || producer::run(producer, pattern, fill, producer_stop))
        .context("Failed to spawn producer thread")?;

    // Start scanout engine
    let (done_tx, mut done_rx) = tokio::sync::oneshot::channel();
    let engine_stop = stop.clone();
    std::thread::Builder::new()
        .name("scanout".to_string())
        .spawn(move || {
            let result = engine.run(&engine_stop);
            // Dropping the scanout handle releases a producer still waiting
            drop(engine);
            let _ = done_tx.send(result);
        })
        .context("Failed to spawn scanout thread")?;

    // Setup Unix signal handlers
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;

    let finished = tokio::select! {
        result = &mut done_rx => Some(result),
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down");
            None
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down");
            None
        }
    };
    stop.store(true, Ordering::Relaxed);

    let result = match finished {
        Some(result) => result,
        None => done_rx.await,
    };
    let report = result.context("Scanout thread exited without a report")??;

    let presented = tokio::task::spawn_blocking(move || producer_handle.join())
        .await?
        .map_err(|_| anyhow::anyhow!("Producer thread panicked"))??;

    info!(
        "Scanned out {} frames: {} swaps, {} repeats, {} late; producer presented {}",
        report.frames, report.swaps, report.repeats, report.late_frames, presented
    );

    match (report.capture, config.engine.capture_frame) {
        (Some(pixels), _) => {
            capture::save_png(&config.engine.capture_path, &geometry, &pixels)?;
            info!("Capture saved to: {}", config.engine.capture_path);
        }
        (None, Some(frame)) => {
            warn!("Frame {} was never reached, nothing captured", frame);
        }
        (None, None) => {}
    }

    Ok(())
}
