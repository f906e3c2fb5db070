//! Interface between the scanout engine and the frame pipeline.
//!
//! An engine (the RGB panel peripheral on hardware, or a software stand-in)
//! is handed a `ScanoutHandler` at registration and calls it from its own
//! timing-critical context. Implementations must not block.

use crate::convert::ChunkRequest;
use crate::geometry::Geometry;
use crate::Result;

/// Callbacks an engine invokes while scanning out frames.
pub trait ScanoutHandler: Send {
    /// Returns the geometry the handler was set up for.
    fn geometry(&self) -> &Geometry;

    /// Fills `out` with the physical bytes for `request`.
    fn on_chunk(&mut self, request: ChunkRequest, out: &mut [u8]) -> Result<()>;

    /// End-of-active-picture notification. Returns true if a new frame was
    /// swapped in.
    fn on_boundary(&mut self) -> bool;

    /// Fills a chunk, then runs the boundary hook if the chunk covers the
    /// boundary line.
    ///
    /// Returns `Some` with the hook's result for the one chunk per frame that
    /// covers the boundary pixel, and `None` for every other chunk. Engines
    /// should pick a chunk size for which that chunk is the last one of the
    /// frame (see [`boundary_in_last_chunk`](crate::convert::boundary_in_last_chunk)).
    fn on_chunk_with_boundary(
        &mut self,
        request: ChunkRequest,
        out: &mut [u8],
    ) -> Result<Option<bool>> {
        self.on_chunk(request, out)?;
        if request.contains(self.geometry().boundary_pixel()) {
            Ok(Some(self.on_boundary()))
        } else {
            Ok(None)
        }
    }
}
