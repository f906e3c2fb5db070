//! The pair of logical frame buffers.

use std::cell::UnsafeCell;

use tracing::info;

use super::view::{Frame, FrameMut};
use crate::geometry::FrameFormat;
use crate::memory::{MemoryPool, MemoryRegion};
use crate::Result;

/// Number of logical frames held by a store.
pub const BUFFER_COUNT: usize = 2;

/// Owns the two logical frames and their format.
///
/// The store itself is passive. While it is owned outright it can be read and
/// written through `&mut self`; once shared between the producer and scanout
/// handles, access goes through the role-checked `front`/`back` accessors.
pub struct FrameStore {
    format: FrameFormat,
    region: MemoryRegion,
    buffers: [UnsafeCell<Box<[u8]>>; BUFFER_COUNT],
}

// SAFETY: the shared accessors are `unsafe` and require the caller to keep the
// front/back split: at most one context touches each buffer, and a buffer only
// changes hands across a synchronizing atomic (see `sync`).
unsafe impl Sync for FrameStore {}

impl FrameStore {
    /// Allocates both frames from `pool`.
    ///
    /// Fails with `AllocationFailure` if either buffer cannot be obtained.
    pub fn allocate<P: MemoryPool + ?Sized>(format: FrameFormat, pool: &P) -> Result<Self> {
        let len = format.byte_len();
        let first = pool.allocate(len)?;
        let second = pool.allocate(len)?;

        info!(
            "Allocated {} frame buffers of {} bytes ({}, {} bits per pixel) in {} memory",
            BUFFER_COUNT,
            len,
            format,
            format.color_mode.bits(),
            pool.region()
        );

        Ok(Self {
            format,
            region: pool.region(),
            buffers: [UnsafeCell::new(first), UnsafeCell::new(second)],
        })
    }

    pub fn format(&self) -> FrameFormat {
        self.format
    }

    /// Returns the memory region the frames live in.
    pub fn region(&self) -> MemoryRegion {
        self.region
    }

    /// Returns the size of one frame in bytes.
    pub fn byte_len(&self) -> usize {
        self.format.byte_len()
    }

    /// Fills one frame with a raw byte value.
    pub fn fill(&mut self, index: usize, value: u8) {
        self.buffers[index].get_mut().fill(value);
    }

    /// Returns exclusive access to one frame while the store is unshared.
    pub fn frame_mut(&mut self, index: usize) -> FrameMut<'_> {
        FrameMut::from_parts(self.format, self.buffers[index].get_mut())
    }

    /// Returns read access to one frame while the store is unshared.
    pub fn frame(&mut self, index: usize) -> Frame<'_> {
        Frame::from_parts(self.format, self.buffers[index].get_mut())
    }

    /// Returns read access to the frame at `index`.
    ///
    /// # Safety
    ///
    /// `index` must be the current front buffer and no `FrameMut` for it may
    /// be alive for the lifetime of the returned view.
    pub(crate) unsafe fn front(&self, index: usize) -> Frame<'_> {
        Frame::from_parts(self.format, &*self.buffers[index].get())
    }

    /// Returns write access to the frame at `index`.
    ///
    /// # Safety
    ///
    /// `index` must be the current back buffer, and the caller must be the
    /// single producer; no other view of it may be alive meanwhile.
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn back(&self, index: usize) -> FrameMut<'_> {
        FrameMut::from_parts(self.format, &mut *self.buffers[index].get())
    }
}

impl std::fmt::Debug for FrameStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameStore")
            .field("format", &self.format)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}
