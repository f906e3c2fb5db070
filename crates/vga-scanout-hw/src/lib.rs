//! VGA Scanout Library
//!
//! Drives a raster video output from a logical frame smaller than the
//! physical screen. Pixels are converted and upscaled on demand as the
//! scanout engine requests them, while a producer redraws a second frame
//! that is swapped in at the end of the active picture.

pub mod color;
pub mod convert;
pub mod engine;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod memory;
pub mod sync;

pub use color::ColorMode;
pub use convert::{boundary_in_last_chunk, frame_chunks, produce, ChunkRequest};
pub use engine::ScanoutHandler;
pub use error::{Error, Result};
pub use frame::{Frame, FrameMut, FrameStore};
pub use geometry::{FrameFormat, Geometry};
pub use memory::{HeapPool, MemoryPool, MemoryRegion};
pub use sync::{init, split, Producer, Scanout, ScanoutStats};
