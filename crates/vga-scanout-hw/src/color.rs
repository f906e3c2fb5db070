//! Logical pixel color modes.
//!
//! The scanout always emits one byte per physical pixel. Logical frames either
//! store that byte directly or pack two 3-bit samples per byte to halve the
//! memory footprint.

use crate::{Error, Result};
use std::str::FromStr;

/// Mask for the significant bits of a packed sample.
pub const PACKED_SAMPLE_MASK: u8 = 0b0000_0111;

/// Shift of the high (odd column) sample within a packed byte.
pub const PACKED_HIGH_SHIFT: u32 = 4;

/// Pixel encoding of a logical frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    /// One byte per pixel, values 0-255.
    #[default]
    Direct8,
    /// Two pixels per byte: even column in bits 0-2, odd column in bits 4-6.
    /// Bits 3 and 7 are reserved and ignored on read.
    Packed3x2,
}

impl ColorMode {
    /// Returns the significant bits per pixel.
    pub fn bits(&self) -> u8 {
        match self {
            ColorMode::Direct8 => 8,
            ColorMode::Packed3x2 => 3,
        }
    }

    /// Returns how many logical pixels share one buffer byte.
    pub fn pixels_per_byte(&self) -> usize {
        match self {
            ColorMode::Direct8 => 1,
            ColorMode::Packed3x2 => 2,
        }
    }

    /// Converts a color depth in bits to a ColorMode.
    pub fn from_bits(bits: u8) -> Result<Self> {
        match bits {
            8 => Ok(ColorMode::Direct8),
            3 => Ok(ColorMode::Packed3x2),
            _ => Err(Error::InvalidColorMode(bits.to_string())),
        }
    }

    /// Returns the number of bytes one logical row of `width` pixels occupies.
    pub fn row_bytes(&self, width: usize) -> usize {
        width / self.pixels_per_byte()
    }

    /// Maps an output byte to RGB888 for captures.
    ///
    /// Direct8 is read as RGB332, Packed3x2 as one bit per channel
    /// (bit 0 red, bit 1 green, bit 2 blue). This is a debug palette only.
    #[inline]
    pub fn to_rgb888(&self, value: u8) -> (u8, u8, u8) {
        match self {
            ColorMode::Direct8 => {
                let r = (value >> 5) & 0x07;
                let g = (value >> 2) & 0x07;
                let b = value & 0x03;
                // Expand to 8-bit
                let r8 = (r << 5) | (r << 2) | (r >> 1);
                let g8 = (g << 5) | (g << 2) | (g >> 1);
                let b8 = b * 0x55;
                (r8, g8, b8)
            }
            ColorMode::Packed3x2 => {
                let channel = |bit: u8| if value & (1 << bit) != 0 { 0xFF } else { 0x00 };
                (channel(0), channel(1), channel(2))
            }
        }
    }
}

/// Extracts the sample for `column` from a packed byte.
#[inline]
pub fn unpack_sample(byte: u8, column: usize) -> u8 {
    if column % 2 == 0 {
        byte & PACKED_SAMPLE_MASK
    } else {
        (byte >> PACKED_HIGH_SHIFT) & PACKED_SAMPLE_MASK
    }
}

impl FromStr for ColorMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "direct8" | "direct" => Ok(ColorMode::Direct8),
            "packed3x2" | "packed" => Ok(ColorMode::Packed3x2),
            // Bare color depth, as in `color_mode = "3"`
            other => match other.parse::<u8>() {
                Ok(bits) => Self::from_bits(bits),
                Err(_) => Err(Error::InvalidColorMode(s.to_string())),
            },
        }
    }
}

impl std::fmt::Display for ColorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColorMode::Direct8 => write!(f, "direct8"),
            ColorMode::Packed3x2 => write!(f, "packed3x2"),
        }
    }
}
