//! Video mode timing table.
//!
//! Pixel clocks and porch/pulse widths for the resolutions the RGB panel
//! peripheral is known to drive as VGA.

use std::time::Duration;
use thiserror::Error;

/// Timing lookup errors.
#[derive(Error, Debug)]
pub enum TimingError {
    #[error("No video timing for {width}x{height}")]
    UnknownResolution { width: usize, height: usize },

    #[error("No video mode fits a {width}x{height} logical frame")]
    NoFit { width: usize, height: usize },
}

/// Timing parameters for one physical resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoMode {
    pub width: usize,
    pub height: usize,
    pub pixel_clock_hz: u32,
    pub hsync_front_porch: usize,
    pub hsync_pulse_width: usize,
    pub hsync_back_porch: usize,
    pub vsync_front_porch: usize,
    pub vsync_pulse_width: usize,
    pub vsync_back_porch: usize,
}

/// Supported modes, largest first.
pub const MODES: [VideoMode; 4] = [
    VideoMode {
        width: 800,
        height: 600,
        pixel_clock_hz: 40_000_000,
        hsync_front_porch: 40,
        hsync_pulse_width: 128,
        hsync_back_porch: 88,
        vsync_front_porch: 1,
        vsync_pulse_width: 4,
        vsync_back_porch: 23,
    },
    VideoMode {
        width: 640,
        height: 480,
        pixel_clock_hz: 36_000_000,
        hsync_front_porch: 56,
        hsync_pulse_width: 56,
        hsync_back_porch: 80,
        vsync_front_porch: 1,
        vsync_pulse_width: 3,
        vsync_back_porch: 25,
    },
    VideoMode {
        width: 640,
        height: 400,
        pixel_clock_hz: 25_000_000,
        hsync_front_porch: 16,
        hsync_pulse_width: 96,
        hsync_back_porch: 48,
        vsync_front_porch: 12,
        vsync_pulse_width: 2,
        vsync_back_porch: 35,
    },
    VideoMode {
        width: 640,
        height: 350,
        pixel_clock_hz: 25_000_000,
        hsync_front_porch: 16,
        hsync_pulse_width: 96,
        hsync_back_porch: 48,
        vsync_front_porch: 37,
        vsync_pulse_width: 2,
        vsync_back_porch: 60,
    },
];

impl VideoMode {
    /// Looks up the timing for a physical resolution.
    pub fn lookup(width: usize, height: usize) -> Result<&'static VideoMode, TimingError> {
        MODES
            .iter()
            .find(|m| m.width == width && m.height == height)
            .ok_or(TimingError::UnknownResolution { width, height })
    }

    /// Picks the mode and scale for a logical frame size.
    ///
    /// Prefers pixel doubling, then falls back to a 1:1 mode.
    pub fn fit_logical(
        width: usize,
        height: usize,
    ) -> Result<(&'static VideoMode, usize), TimingError> {
        [2, 1]
            .into_iter()
            .find_map(|scale| {
                Self::lookup(width * scale, height * scale)
                    .ok()
                    .map(|mode| (mode, scale))
            })
            .ok_or(TimingError::NoFit { width, height })
    }

    /// Returns pixel clocks per line including blanking.
    pub fn h_total(&self) -> usize {
        self.width + self.hsync_front_porch + self.hsync_pulse_width + self.hsync_back_porch
    }

    /// Returns lines per frame including blanking.
    pub fn v_total(&self) -> usize {
        self.height + self.vsync_front_porch + self.vsync_pulse_width + self.vsync_back_porch
    }

    /// Returns the duration of one full frame.
    pub fn frame_period(&self) -> Duration {
        let clocks = (self.h_total() * self.v_total()) as u64;
        Duration::from_nanos(clocks * 1_000_000_000 / self.pixel_clock_hz as u64)
    }

    /// Returns the vertical refresh rate in Hz.
    pub fn refresh_hz(&self) -> f64 {
        self.pixel_clock_hz as f64 / (self.h_total() * self.v_total()) as f64
    }
}

impl std::fmt::Display for VideoMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}x{}@{:.1}Hz",
            self.width,
            self.height,
            self.refresh_hz()
        )
    }
}
