//! Software scanout engine.
//!
//! Plays the role of the RGB panel peripheral: walks each physical frame in
//! bounce-buffer sized chunks, asks the handler to fill them, and raises the
//! boundary hook once the chunk holding the boundary line has been filled.

use anyhow::{ensure, Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use vga_scanout_hw::{boundary_in_last_chunk, frame_chunks, ScanoutHandler};

/// Summary of an engine run.
#[derive(Debug, Default)]
pub struct EngineReport {
    /// Physical frames scanned out.
    pub frames: u64,
    /// Boundaries that swapped in a new frame.
    pub swaps: u64,
    /// Boundaries that repeated the previous frame.
    pub repeats: u64,
    /// Frames that overran their deadline.
    pub late_frames: u64,
    /// Physical bytes of the captured frame, if one was requested.
    pub capture: Option<Vec<u8>>,
}

/// Engine settings.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Lines per chunk request.
    pub bounce_lines: usize,
    /// Stop after this many frames (0 = until stopped).
    pub frames: u64,
    /// Target frame period; `None` runs unpaced.
    pub frame_period: Option<Duration>,
    /// Frame number to copy aside.
    pub capture_frame: Option<u64>,
    /// Log statistics every this many frames (0 = never).
    pub stats_interval: u64,
}

/// Software scanout engine driving one registered handler.
pub struct SoftEngine<H: ScanoutHandler> {
    handler: H,
    options: EngineOptions,
    bounce: Vec<u8>,
}

impl<H: ScanoutHandler> SoftEngine<H> {
    /// Registers `handler` and allocates the bounce buffer.
    ///
    /// Fails unless the chunk holding the boundary line is the last chunk of
    /// the frame. A swap from an earlier chunk tears the frame.
    pub fn new(handler: H, options: EngineOptions) -> Result<Self> {
        let lines = options.bounce_lines.max(1);
        let geometry = handler.geometry();
        ensure!(
            boundary_in_last_chunk(geometry, lines),
            "Chunks of {} lines put the boundary ({} lines from the bottom of {}) before the last chunk",
            lines,
            geometry.boundary_lines(),
            geometry.screen_height()
        );
        let bounce = vec![0u8; lines * handler.geometry().screen_width()];
        debug!(
            "Bounce buffer: {} lines, {} bytes",
            lines,
            bounce.len()
        );
        Ok(Self {
            handler,
            options: EngineOptions {
                bounce_lines: lines,
                ..options
            },
            bounce,
        })
    }

    /// Scans out frames until the frame limit is reached or `stop` is set.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<EngineReport> {
        let geometry = *self.handler.geometry();
        let mut report = EngineReport::default();
        let mut deadline = Instant::now();

        info!(
            "Scanout engine running: {} lines per chunk, {}",
            self.options.bounce_lines,
            match self.options.frame_period {
                Some(period) => format!("{:?} per frame", period),
                None => "unpaced".to_string(),
            }
        );

        while !stop.load(Ordering::Relaxed)
            && (self.options.frames == 0 || report.frames < self.options.frames)
        {
            let capturing = self.options.capture_frame == Some(report.frames);
            let mut captured = Vec::new();
            if capturing {
                captured.reserve_exact(geometry.frame_pixels());
            }

            for request in frame_chunks(&geometry, self.options.bounce_lines) {
                let out = &mut self.bounce[..request.byte_length];
                let swapped = self
                    .handler
                    .on_chunk_with_boundary(request, out)
                    .with_context(|| format!("Chunk at pixel {} failed", request.start_pixel))?;

                if capturing {
                    captured.extend_from_slice(out);
                }

                match swapped {
                    Some(true) => report.swaps += 1,
                    Some(false) => report.repeats += 1,
                    None => {}
                }
            }

            if capturing {
                debug!("Captured frame {}", report.frames);
                report.capture = Some(captured);
            }
            report.frames += 1;

            if self.options.stats_interval > 0 && report.frames % self.options.stats_interval == 0
            {
                info!(
                    "Frame {}: {} swaps, {} repeats, {} late",
                    report.frames, report.swaps, report.repeats, report.late_frames
                );
            }

            if let Some(period) = self.options.frame_period {
                deadline += period;
                let now = Instant::now();
                if deadline > now {
                    std::thread::sleep(deadline - now);
                } else {
                    report.late_frames += 1;
                    deadline = now;
                }
            }
        }

        if report.late_frames > 0 {
            warn!(
                "{} of {} frames missed their deadline",
                report.late_frames, report.frames
            );
        }
        Ok(report)
    }
}
