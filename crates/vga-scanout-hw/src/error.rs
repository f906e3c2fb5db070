//! Error types for the VGA scanout library.

use thiserror::Error;

use crate::memory::MemoryRegion;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while setting up or feeding the scanout.
#[derive(Error, Debug)]
pub enum Error {
    /// A frame buffer could not be obtained from the memory pool.
    #[error("Failed to allocate {bytes} bytes in {region} memory")]
    AllocationFailure { bytes: usize, region: MemoryRegion },

    /// Scale, color depth or resolution combination is not implemented.
    #[error("Unsupported geometry: {0}")]
    UnsupportedGeometry(String),

    /// Chunk request does not start or end on a physical line boundary.
    #[error(
        "Chunk request not line aligned: start pixel {start_pixel}, {byte_length} bytes, line width {screen_width}"
    )]
    MisalignedRequest {
        start_pixel: usize,
        byte_length: usize,
        screen_width: usize,
    },

    /// Chunk request covers lines past the bottom of the screen.
    #[error(
        "Chunk request of {lines} lines from line {first_line} exceeds screen height {screen_height}"
    )]
    RequestOutOfRange {
        first_line: usize,
        lines: usize,
        screen_height: usize,
    },

    /// Frame data length does not match its format.
    #[error("Frame size mismatch: expected {expected}, got {actual}")]
    FrameSize { expected: usize, actual: usize },

    /// Output slice is shorter than the requested byte length.
    #[error("Chunk buffer too small: expected {expected}, got {actual}")]
    ChunkBuffer { expected: usize, actual: usize },

    /// Frame store format does not match the geometry it is paired with.
    #[error("Frame store format mismatch: geometry wants {expected}, store holds {actual}")]
    FormatMismatch { expected: String, actual: String },

    /// The scanout handle was dropped while the producer waited for a swap.
    #[error("Scanout closed before the frame was swapped in")]
    ScanoutClosed,

    /// Invalid color mode value.
    #[error("Invalid color mode: {0}")]
    InvalidColorMode(String),

    /// Invalid memory region value.
    #[error("Invalid memory region: {0}")]
    InvalidMemoryRegion(String),
}
