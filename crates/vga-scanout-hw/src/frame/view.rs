//! Borrowed views over a logical frame's bytes.

use crate::color::{unpack_sample, ColorMode, PACKED_HIGH_SHIFT, PACKED_SAMPLE_MASK};
use crate::geometry::FrameFormat;
use crate::{Error, Result};

fn check_len(format: &FrameFormat, actual: usize) -> Result<()> {
    let expected = format.byte_len();
    if actual != expected {
        return Err(Error::FrameSize { expected, actual });
    }
    Ok(())
}

/// Read-only view of a logical frame.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    format: FrameFormat,
    data: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Wraps `data`, checking that its length matches `format`.
    pub fn new(format: FrameFormat, data: &'a [u8]) -> Result<Self> {
        check_len(&format, data.len())?;
        Ok(Self { format, data })
    }

    pub(crate) fn from_parts(format: FrameFormat, data: &'a [u8]) -> Self {
        debug_assert_eq!(data.len(), format.byte_len());
        Self { format, data }
    }

    pub fn format(&self) -> FrameFormat {
        self.format
    }

    /// Returns the raw frame bytes.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    /// Returns the bytes of logical row `y`.
    #[inline]
    pub fn row(&self, y: usize) -> &'a [u8] {
        let row_bytes = self.format.row_bytes();
        &self.data[y * row_bytes..(y + 1) * row_bytes]
    }

    /// Gets the logical pixel at the given coordinates.
    pub fn pixel(&self, x: usize, y: usize) -> Option<u8> {
        read_pixel(&self.format, self.data, x, y)
    }
}

/// Writable view of a logical frame, handed to the producer.
///
/// Holds the only mutable borrow of the back buffer; it cannot outlive the
/// next call to present the frame.
#[derive(Debug)]
pub struct FrameMut<'a> {
    format: FrameFormat,
    data: &'a mut [u8],
}

impl<'a> FrameMut<'a> {
    /// Wraps `data`, checking that its length matches `format`.
    pub fn new(format: FrameFormat, data: &'a mut [u8]) -> Result<Self> {
        check_len(&format, data.len())?;
        Ok(Self { format, data })
    }

    pub(crate) fn from_parts(format: FrameFormat, data: &'a mut [u8]) -> Self {
        debug_assert_eq!(data.len(), format.byte_len());
        Self { format, data }
    }

    pub fn format(&self) -> FrameFormat {
        self.format
    }

    /// Returns the logical width in pixels.
    pub fn width(&self) -> usize {
        self.format.width
    }

    /// Returns the logical height in pixels.
    pub fn height(&self) -> usize {
        self.format.height
    }

    pub fn color_mode(&self) -> ColorMode {
        self.format.color_mode
    }

    /// Returns the raw frame bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &*self.data
    }

    /// Returns the raw frame bytes for direct drawing.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut *self.data
    }

    /// Clears the frame to a solid pixel value.
    pub fn clear(&mut self, value: u8) {
        let byte = match self.format.color_mode {
            ColorMode::Direct8 => value,
            ColorMode::Packed3x2 => {
                let sample = value & PACKED_SAMPLE_MASK;
                sample | (sample << PACKED_HIGH_SHIFT)
            }
        };
        self.data.fill(byte);
    }

    /// Sets a pixel at the given coordinates. Out-of-bounds writes are ignored.
    ///
    /// In Packed3x2 mode only the low three bits of `value` are stored and the
    /// neighbouring pixel sharing the byte is preserved.
    pub fn set_pixel(&mut self, x: usize, y: usize, value: u8) {
        if x >= self.format.width || y >= self.format.height {
            return;
        }
        match self.format.color_mode {
            ColorMode::Direct8 => {
                self.data[y * self.format.width + x] = value;
            }
            ColorMode::Packed3x2 => {
                let idx = y * self.format.row_bytes() + x / 2;
                let sample = value & PACKED_SAMPLE_MASK;
                let byte = &mut self.data[idx];
                if x % 2 == 0 {
                    *byte = (*byte & !PACKED_SAMPLE_MASK) | sample;
                } else {
                    *byte = (*byte & !(PACKED_SAMPLE_MASK << PACKED_HIGH_SHIFT))
                        | (sample << PACKED_HIGH_SHIFT);
                }
            }
        }
    }

    /// Gets the logical pixel at the given coordinates.
    pub fn pixel(&self, x: usize, y: usize) -> Option<u8> {
        read_pixel(&self.format, &*self.data, x, y)
    }
}

fn read_pixel(format: &FrameFormat, data: &[u8], x: usize, y: usize) -> Option<u8> {
    if x >= format.width || y >= format.height {
        return None;
    }
    match format.color_mode {
        ColorMode::Direct8 => Some(data[y * format.width + x]),
        ColorMode::Packed3x2 => Some(unpack_sample(data[y * format.row_bytes() + x / 2], x)),
    }
}
