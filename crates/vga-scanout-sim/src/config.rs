//! Configuration management.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use vga_scanout_hw::geometry::default_boundary_lines;
use vga_scanout_hw::{ColorMode, Geometry, MemoryRegion};

use crate::producer::Pattern;
use crate::timing::VideoMode;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Display geometry
    #[serde(default)]
    pub display: DisplayConfig,

    /// Frame buffer memory
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Software scanout engine
    #[serde(default)]
    pub engine: EngineConfig,

    /// Demo producer
    #[serde(default)]
    pub producer: ProducerConfig,
}

/// Display geometry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Physical width in pixels
    #[serde(default = "default_width")]
    pub width: usize,

    /// Physical height in pixels
    #[serde(default = "default_height")]
    pub height: usize,

    /// Logical-to-physical scale factor (1 or 2)
    #[serde(default = "default_scale")]
    pub scale: usize,

    /// Logical frame size; when both are set, the physical mode and scale
    /// are picked from the timing table instead
    #[serde(default)]
    pub logical_width: Option<usize>,
    #[serde(default)]
    pub logical_height: Option<usize>,

    /// "direct8" or "packed3x2"
    #[serde(default = "default_color_mode")]
    pub color_mode: String,

    /// Lines from the bottom at which buffers may swap (default: height / 10)
    #[serde(default)]
    pub boundary_lines: Option<usize>,

    /// Raw byte the first visible frame is cleared to
    #[serde(default = "default_initial_fill")]
    pub initial_fill: u8,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            scale: default_scale(),
            logical_width: None,
            logical_height: None,
            color_mode: default_color_mode(),
            boundary_lines: None,
            initial_fill: default_initial_fill(),
        }
    }
}

impl DisplayConfig {
    /// Resolves the configured display into a validated geometry.
    pub fn geometry(&self) -> Result<Geometry> {
        let color_mode: ColorMode = self.color_mode.parse()?;

        let (width, height, scale) = match (self.logical_width, self.logical_height) {
            (Some(w), Some(h)) => {
                let (mode, scale) = VideoMode::fit_logical(w, h)?;
                (mode.width, mode.height, scale)
            }
            _ => (self.width, self.height, self.scale),
        };

        let boundary_lines = self
            .boundary_lines
            .unwrap_or_else(|| default_boundary_lines(height));

        Geometry::new(width, height, scale, color_mode, boundary_lines)
            .context("Invalid display geometry")
    }
}

/// Frame buffer memory configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// "internal" or "external"
    #[serde(default = "default_region")]
    pub region: String,

    /// Byte budget for both frame buffers (unlimited if unset)
    #[serde(default)]
    pub limit: Option<usize>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            limit: None,
        }
    }
}

impl MemoryConfig {
    pub fn region(&self) -> Result<MemoryRegion> {
        Ok(self.region.parse()?)
    }
}

/// Software scanout engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Lines per chunk request (default: the display's boundary lines)
    #[serde(default)]
    pub bounce_lines: Option<usize>,

    /// Frames to scan out before exiting (0 = until signalled)
    #[serde(default)]
    pub frames: u64,

    /// Pace frames at the video mode's refresh rate
    #[serde(default = "default_realtime")]
    pub realtime: bool,

    /// Frame number to save as PNG
    #[serde(default)]
    pub capture_frame: Option<u64>,

    /// PNG output path for the captured frame
    #[serde(default = "default_capture_path")]
    pub capture_path: String,

    /// Log swap statistics every this many frames (0 = never)
    #[serde(default = "default_stats_interval")]
    pub stats_interval: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bounce_lines: None,
            frames: 0,
            realtime: default_realtime(),
            capture_frame: None,
            capture_path: default_capture_path(),
            stats_interval: default_stats_interval(),
        }
    }
}

/// Demo producer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProducerConfig {
    /// "bars", "checker" or "solid"
    #[serde(default = "default_pattern")]
    pub pattern: String,

    /// Pixel value for the solid pattern
    #[serde(default)]
    pub fill: u8,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            pattern: default_pattern(),
            fill: 0,
        }
    }
}

impl ProducerConfig {
    pub fn pattern(&self) -> Result<Pattern> {
        self.pattern.parse()
    }
}

// Default value functions
fn default_width() -> usize {
    640
}

fn default_height() -> usize {
    480
}

fn default_scale() -> usize {
    2
}

fn default_color_mode() -> String {
    "direct8".to_string()
}

fn default_initial_fill() -> u8 {
    0xFF
}

fn default_region() -> String {
    "internal".to_string()
}

fn default_realtime() -> bool {
    true
}

fn default_capture_path() -> String {
    "capture.png".to_string()
}

fn default_stats_interval() -> u64 {
    600
}

fn default_pattern() -> String {
    "bars".to_string()
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read configuration file")?;
        Self::parse(&content)
    }

    /// Parses configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse configuration")?;
        Ok(config)
    }

    /// Saves configuration to a TOML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        std::fs::write(path.as_ref(), content).context("Failed to write configuration file")?;
        Ok(())
    }

    /// Returns the chunk size in lines for a geometry.
    ///
    /// Defaults to the boundary line count, which makes the boundary chunk the
    /// last chunk of every frame.
    pub fn bounce_lines(&self, geometry: &Geometry) -> usize {
        self.engine
            .bounce_lines
            .unwrap_or_else(|| geometry.boundary_lines())
    }
}
