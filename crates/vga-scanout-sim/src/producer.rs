//! Demo producer drawing animated test patterns.

use anyhow::{bail, Result};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};
use vga_scanout_hw::{ColorMode, Error as ScanoutError, FrameMut, Producer};

/// Eight bar colors as RGB332: black, blue, green, cyan, red, magenta, yellow, white.
const BAR_COLORS_RGB332: [u8; 8] = [0x00, 0x03, 0x1C, 0x1F, 0xE0, 0xE3, 0xFC, 0xFF];

/// Test pattern drawn each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pattern {
    /// Eight vertical color bars scrolling one pixel per frame.
    #[default]
    Bars,
    /// 8x8 checkerboard that inverts every 32 frames.
    Checker,
    /// Solid fill with the configured value.
    Solid,
}

impl FromStr for Pattern {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "bars" => Ok(Pattern::Bars),
            "checker" => Ok(Pattern::Checker),
            "solid" => Ok(Pattern::Solid),
            _ => bail!("Invalid pattern: {}", s),
        }
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pattern::Bars => write!(f, "bars"),
            Pattern::Checker => write!(f, "checker"),
            Pattern::Solid => write!(f, "solid"),
        }
    }
}

/// Maps a 3-bit color index to a pixel value for the frame's color mode.
fn color(mode: ColorMode, index: usize) -> u8 {
    match mode {
        ColorMode::Direct8 => BAR_COLORS_RGB332[index % 8],
        // bit 0 red, bit 1 green, bit 2 blue
        ColorMode::Packed3x2 => {
            let rgb332 = BAR_COLORS_RGB332[index % 8];
            let r = (rgb332 & 0x80 != 0) as u8;
            let g = (rgb332 & 0x10 != 0) as u8;
            let b = (rgb332 & 0x02 != 0) as u8;
            r | (g << 1) | (b << 2)
        }
    }
}

/// Draws one frame of `pattern` for animation step `frame`.
pub fn draw(target: &mut FrameMut<'_>, pattern: Pattern, fill: u8, frame: u64) {
    let (width, height) = (target.width(), target.height());
    let mode = target.color_mode();

    match pattern {
        Pattern::Solid => target.clear(fill),
        Pattern::Bars => {
            let bar_width = (width / 8).max(1);
            let shift = (frame as usize) % width;
            for x in 0..width {
                let value = color(mode, ((x + shift) % width) / bar_width);
                for y in 0..height {
                    target.set_pixel(x, y, value);
                }
            }
        }
        Pattern::Checker => {
            let phase = ((frame / 32) % 2) as usize;
            let (dark, light) = (color(mode, 0), color(mode, 7));
            for y in 0..height {
                for x in 0..width {
                    let cell = (x / 8 + y / 8 + phase) % 2;
                    target.set_pixel(x, y, if cell == 0 { dark } else { light });
                }
            }
        }
    }
}

/// Draws and presents frames until `stop` is set or the scanout goes away.
///
/// Returns the number of frames presented.
pub fn run(mut producer: Producer, pattern: Pattern, fill: u8, stop: Arc<AtomicBool>) -> Result<u64> {
    info!("Producer started with {} pattern", pattern);
    let mut presented = 0u64;

    while !stop.load(Ordering::Relaxed) {
        draw(&mut producer.back_buffer(), pattern, fill, presented);

        match producer.signal_ready_and_wait() {
            Ok(()) => presented += 1,
            Err(ScanoutError::ScanoutClosed) => {
                debug!("Scanout closed, producer exiting");
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!("Producer stopped after {} frames", presented);
    Ok(presented)
}
