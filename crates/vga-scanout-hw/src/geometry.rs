//! Physical screen geometry and the logical frame format derived from it.

use crate::color::ColorMode;
use crate::{Error, Result};
use tracing::debug;

/// Supported integer scale factors between logical and physical pixels.
pub const SUPPORTED_SCALES: [usize; 2] = [1, 2];

/// Dimensions and pixel encoding of one logical frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameFormat {
    /// Logical width in pixels.
    pub width: usize,
    /// Logical height in pixels.
    pub height: usize,
    /// Pixel encoding.
    pub color_mode: ColorMode,
}

impl FrameFormat {
    /// Creates a new frame format.
    pub fn new(width: usize, height: usize, color_mode: ColorMode) -> Self {
        Self {
            width,
            height,
            color_mode,
        }
    }

    /// Returns the number of bytes in one logical row.
    pub fn row_bytes(&self) -> usize {
        self.color_mode.row_bytes(self.width)
    }

    /// Returns the total buffer size in bytes.
    pub fn byte_len(&self) -> usize {
        self.row_bytes() * self.height
    }
}

impl std::fmt::Display for FrameFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{} {}", self.width, self.height, self.color_mode)
    }
}

/// Validated physical geometry of the scanout.
///
/// Construction rejects every combination the converter does not implement,
/// so conversion never has to re-check configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    screen_width: usize,
    screen_height: usize,
    scale: usize,
    color_mode: ColorMode,
    boundary_lines: usize,
}

impl Geometry {
    /// Creates a geometry, validating the combination.
    ///
    /// `boundary_lines` is counted from the bottom of the screen: the boundary
    /// hook fires when scanout reaches line `screen_height - boundary_lines`.
    pub fn new(
        screen_width: usize,
        screen_height: usize,
        scale: usize,
        color_mode: ColorMode,
        boundary_lines: usize,
    ) -> Result<Self> {
        if !SUPPORTED_SCALES.contains(&scale) {
            return Err(Error::UnsupportedGeometry(format!(
                "scale {} (supported: 1, 2)",
                scale
            )));
        }
        if screen_width == 0 || screen_height == 0 {
            return Err(Error::UnsupportedGeometry(format!(
                "empty screen {}x{}",
                screen_width, screen_height
            )));
        }
        if screen_width % scale != 0 || screen_height % scale != 0 {
            return Err(Error::UnsupportedGeometry(format!(
                "{}x{} is not divisible by scale {}",
                screen_width, screen_height, scale
            )));
        }
        let logical_width = screen_width / scale;
        if logical_width % color_mode.pixels_per_byte() != 0 {
            return Err(Error::UnsupportedGeometry(format!(
                "logical width {} is not a whole number of {} bytes",
                logical_width, color_mode
            )));
        }
        if boundary_lines == 0 || boundary_lines > screen_height {
            return Err(Error::UnsupportedGeometry(format!(
                "boundary of {} lines outside 1..={}",
                boundary_lines, screen_height
            )));
        }

        let geometry = Self {
            screen_width,
            screen_height,
            scale,
            color_mode,
            boundary_lines,
        };
        debug!(
            "Geometry {}x{} scale {} -> logical {}",
            screen_width,
            screen_height,
            scale,
            geometry.format()
        );
        Ok(geometry)
    }

    /// Creates a geometry whose boundary sits a tenth of the screen above the bottom.
    pub fn with_default_boundary(
        screen_width: usize,
        screen_height: usize,
        scale: usize,
        color_mode: ColorMode,
    ) -> Result<Self> {
        Self::new(
            screen_width,
            screen_height,
            scale,
            color_mode,
            default_boundary_lines(screen_height),
        )
    }

    pub fn screen_width(&self) -> usize {
        self.screen_width
    }

    pub fn screen_height(&self) -> usize {
        self.screen_height
    }

    pub fn scale(&self) -> usize {
        self.scale
    }

    pub fn color_mode(&self) -> ColorMode {
        self.color_mode
    }

    pub fn boundary_lines(&self) -> usize {
        self.boundary_lines
    }

    /// Returns the logical width in pixels.
    pub fn logical_width(&self) -> usize {
        self.screen_width / self.scale
    }

    /// Returns the logical height in pixels.
    pub fn logical_height(&self) -> usize {
        self.screen_height / self.scale
    }

    /// Returns the format of the logical frames for this geometry.
    pub fn format(&self) -> FrameFormat {
        FrameFormat::new(self.logical_width(), self.logical_height(), self.color_mode)
    }

    /// Returns the number of physical pixels (and output bytes) per frame.
    pub fn frame_pixels(&self) -> usize {
        self.screen_width * self.screen_height
    }

    /// Returns the flattened physical pixel offset at which the boundary hook fires.
    pub fn boundary_pixel(&self) -> usize {
        self.screen_width * (self.screen_height - self.boundary_lines)
    }
}

/// Returns the default boundary depth for a screen height (a tenth, at least one line).
pub fn default_boundary_lines(screen_height: usize) -> usize {
    (screen_height / 10).max(1)
}
