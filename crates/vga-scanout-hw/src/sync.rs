//! Double-buffer handshake between the producer and the scanout.
//!
//! The producer draws into the back buffer, raises the ready flag and blocks.
//! Once per physical frame the scanout's boundary hook tests and clears the
//! flag; if it was raised the buffers swap roles and the producer is released.
//! The hook never waits: it uses an atomic swap and a non-blocking send into
//! a single-slot channel.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::Arc;

use tracing::{debug, info};

use crate::convert::{self, ChunkRequest};
use crate::engine::ScanoutHandler;
use crate::frame::{Frame, FrameMut, FrameStore};
use crate::geometry::Geometry;
use crate::memory::MemoryPool;
use crate::{Error, Result};

/// Swap counters shared by both handles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanoutStats {
    /// Boundaries that swapped in a new frame.
    pub swaps: u64,
    /// Boundaries that found no frame ready and repeated the previous one.
    pub repeats: u64,
}

struct Shared {
    geometry: Geometry,
    store: FrameStore,
    ready: AtomicBool,
    front: AtomicUsize,
    swaps: AtomicU64,
    repeats: AtomicU64,
}

impl Shared {
    fn stats(&self) -> ScanoutStats {
        ScanoutStats {
            swaps: self.swaps.load(Ordering::Relaxed),
            repeats: self.repeats.load(Ordering::Relaxed),
        }
    }
}

/// Allocates the frame store, clears the first visible frame and splits it
/// into producer and scanout handles.
pub fn init<P: MemoryPool + ?Sized>(
    geometry: Geometry,
    pool: &P,
    initial_fill: u8,
) -> Result<(Producer, Scanout)> {
    let mut store = FrameStore::allocate(geometry.format(), pool)?;
    store.fill(0, initial_fill);
    split(geometry, store)
}

/// Hands `store` to a producer/scanout pair. Frame 0 starts as the front buffer.
pub fn split(geometry: Geometry, store: FrameStore) -> Result<(Producer, Scanout)> {
    if store.format() != geometry.format() {
        return Err(Error::FormatMismatch {
            expected: geometry.format().to_string(),
            actual: store.format().to_string(),
        });
    }

    let (release_tx, release_rx) = mpsc::sync_channel(1);
    let shared = Arc::new(Shared {
        geometry,
        store,
        ready: AtomicBool::new(false),
        front: AtomicUsize::new(0),
        swaps: AtomicU64::new(0),
        repeats: AtomicU64::new(0),
    });

    info!(
        "Scanout ready: {}x{} from {} frames, boundary {} lines from bottom",
        geometry.screen_width(),
        geometry.screen_height(),
        geometry.format(),
        geometry.boundary_lines()
    );

    Ok((
        Producer {
            shared: shared.clone(),
            release: release_rx,
        },
        Scanout {
            shared,
            release: release_tx,
        },
    ))
}

/// Producer side: draws into the back buffer and paces itself on swaps.
pub struct Producer {
    shared: Arc<Shared>,
    release: Receiver<()>,
}

impl Producer {
    pub fn geometry(&self) -> &Geometry {
        &self.shared.geometry
    }

    /// Returns the index of the buffer currently being scanned out.
    pub fn front_index(&self) -> usize {
        self.shared.front.load(Ordering::Acquire)
    }

    /// Returns the index of the buffer the producer may write.
    pub fn back_index(&self) -> usize {
        1 - self.front_index()
    }

    /// Returns the writable back buffer.
    ///
    /// The view borrows the producer, so it must be dropped before the frame
    /// is presented; fetch a fresh one each frame.
    pub fn back_buffer(&mut self) -> FrameMut<'_> {
        let index = self.back_index();
        // SAFETY: the front index only changes inside `Scanout::on_boundary`
        // while the ready flag is raised, i.e. while this producer is blocked
        // in `signal_ready_and_wait` and holds no view. The scanout never
        // reads the back buffer.
        unsafe { self.shared.store.back(index) }
    }

    /// Marks the back buffer complete and blocks until it has been swapped in.
    ///
    /// Returns once a new back buffer is available. Fails with
    /// `ScanoutClosed` if the scanout handle is gone and no swap can happen.
    pub fn signal_ready_and_wait(&mut self) -> Result<()> {
        self.shared.ready.store(true, Ordering::Release);
        self.release.recv().map_err(|_| Error::ScanoutClosed)
    }

    pub fn stats(&self) -> ScanoutStats {
        self.shared.stats()
    }
}

/// Scanout side: converts the front buffer and runs the boundary hook.
///
/// Nothing here blocks or allocates.
pub struct Scanout {
    shared: Arc<Shared>,
    release: SyncSender<()>,
}

impl Scanout {
    pub fn geometry(&self) -> &Geometry {
        &self.shared.geometry
    }

    /// Returns the index of the buffer currently being scanned out.
    pub fn front_index(&self) -> usize {
        self.shared.front.load(Ordering::Relaxed)
    }

    /// Returns true if the producer has presented a frame not yet swapped in.
    pub fn ready_pending(&self) -> bool {
        self.shared.ready.load(Ordering::Acquire)
    }

    /// Returns the visible frame.
    pub fn front(&self) -> Frame<'_> {
        // SAFETY: only `on_boundary` moves the front index and it needs
        // `&mut self`, so the index is stable while this view lives. The
        // producer never writes the front buffer.
        unsafe { self.shared.store.front(self.front_index()) }
    }

    /// Converts the requested chunk of the visible frame into `out`.
    pub fn produce(&self, request: ChunkRequest, out: &mut [u8]) -> Result<()> {
        convert::produce(self.front(), &self.shared.geometry, request, out)
    }

    /// Boundary hook: swaps buffers if the producer has a frame ready.
    ///
    /// Returns true if a swap happened. Without a pending frame the current
    /// front buffer is scanned out again.
    pub fn on_boundary(&mut self) -> bool {
        if !self.shared.ready.swap(false, Ordering::AcqRel) {
            self.shared.repeats.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        let front = self.shared.front.load(Ordering::Relaxed);
        self.shared.front.store(1 - front, Ordering::Release);
        self.shared.swaps.fetch_add(1, Ordering::Relaxed);

        // The slot is always empty here: one release per raised flag, and the
        // flag is only raised again after the producer took the last one. A
        // disconnected producer has nobody left to wake.
        let _ = self.release.try_send(());
        true
    }

    pub fn stats(&self) -> ScanoutStats {
        self.shared.stats()
    }
}

impl ScanoutHandler for Scanout {
    fn geometry(&self) -> &Geometry {
        Scanout::geometry(self)
    }

    fn on_chunk(&mut self, request: ChunkRequest, out: &mut [u8]) -> Result<()> {
        self.produce(request, out)
    }

    fn on_boundary(&mut self) -> bool {
        Scanout::on_boundary(self)
    }
}

impl Drop for Scanout {
    fn drop(&mut self) {
        debug!("Scanout handle dropped after {:?}", self.stats());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ColorMode;
    use crate::convert::frame_chunks;
    use crate::geometry::FrameFormat;
    use crate::memory::{HeapPool, MemoryRegion};
    use std::thread;
    use std::time::{Duration, Instant};

    fn setup(mode: ColorMode) -> (Producer, Scanout) {
        let geometry = Geometry::with_default_boundary(64, 40, 2, mode).unwrap();
        let pool = HeapPool::new(MemoryRegion::Internal);
        init(geometry, &pool, 0xFF).unwrap()
    }

    fn wait_until_ready(scanout: &Scanout) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !scanout.ready_pending() {
            assert!(Instant::now() < deadline, "producer never signalled");
            thread::yield_now();
        }
    }

    fn visible_line(scanout: &Scanout, line: usize) -> Vec<u8> {
        let request = ChunkRequest::lines(scanout.geometry(), line, 1);
        let mut out = vec![0u8; request.byte_length];
        scanout.produce(request, &mut out).unwrap();
        out
    }

    #[test]
    fn test_initial_roles() {
        let (mut producer, scanout) = setup(ColorMode::Direct8);
        assert_eq!(producer.front_index(), 0);
        assert_eq!(producer.back_index(), 1);
        assert!(!scanout.ready_pending());
        assert!(scanout.front().as_bytes().iter().all(|&b| b == 0xFF));
        assert!(producer.back_buffer().as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_swap_releases_producer() {
        let (mut producer, mut scanout) = setup(ColorMode::Direct8);
        let (done_tx, done_rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            producer.back_buffer().clear(5);
            producer.signal_ready_and_wait().unwrap();
            done_tx.send(producer.back_index()).unwrap();
            producer
        });

        wait_until_ready(&scanout);
        assert!(done_rx.try_recv().is_err());
        assert!(scanout.on_boundary());
        assert_eq!(scanout.front_index(), 1);
        assert!(!scanout.ready_pending());

        let back = done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(back, 0);
        assert!(visible_line(&scanout, 0).iter().all(|&b| b == 5));

        let producer = handle.join().unwrap();
        assert_eq!(producer.stats(), ScanoutStats { swaps: 1, repeats: 0 });
    }

    #[test]
    fn test_no_signal_repeats_frame() {
        let (_producer, mut scanout) = setup(ColorMode::Packed3x2);
        let before = visible_line(&scanout, 7);

        for _ in 0..100 {
            assert!(!scanout.on_boundary());
        }
        assert_eq!(scanout.front_index(), 0);
        assert_eq!(visible_line(&scanout, 7), before);
        assert_eq!(scanout.stats(), ScanoutStats { swaps: 0, repeats: 100 });
    }

    #[test]
    fn test_one_swap_per_signal() {
        let (mut producer, mut scanout) = setup(ColorMode::Direct8);

        let handle = thread::spawn(move || {
            for value in 1..=3u8 {
                producer.back_buffer().clear(value);
                producer.signal_ready_and_wait().unwrap();
            }
        });

        for value in 1..=3u8 {
            wait_until_ready(&scanout);
            assert!(scanout.on_boundary());
            assert!(visible_line(&scanout, 0).iter().all(|&b| b == value));
        }
        handle.join().unwrap();
        assert_eq!(scanout.stats().swaps, 3);
        assert_eq!(scanout.front_index(), 1);
    }

    #[test]
    fn test_chunk_driven_boundary_fires_once_per_frame() {
        let (mut producer, mut scanout) = setup(ColorMode::Direct8);
        let geometry = *scanout.geometry();
        let mut bounce = vec![0u8; 4 * geometry.screen_width()];

        let handle = thread::spawn(move || {
            producer.back_buffer().clear(1);
            producer.signal_ready_and_wait().unwrap();
            producer.back_buffer().clear(2);
            producer.signal_ready_and_wait().unwrap();
        });

        wait_until_ready(&scanout);
        let hooks: Vec<_> = frame_chunks(&geometry, 4)
            .map(|request| scanout.on_chunk_with_boundary(request, &mut bounce).unwrap())
            .collect();
        assert_eq!(hooks.iter().filter(|hook| hook.is_some()).count(), 1);
        assert_eq!(hooks.last(), Some(&Some(true)));
        assert_eq!(scanout.stats(), ScanoutStats { swaps: 1, repeats: 0 });

        wait_until_ready(&scanout);
        for request in frame_chunks(&geometry, 4) {
            scanout.on_chunk_with_boundary(request, &mut bounce).unwrap();
        }
        assert_eq!(scanout.stats(), ScanoutStats { swaps: 2, repeats: 0 });
        assert!(visible_line(&scanout, 39).iter().all(|&b| b == 2));

        for request in frame_chunks(&geometry, 4) {
            scanout.on_chunk_with_boundary(request, &mut bounce).unwrap();
        }
        assert_eq!(scanout.stats(), ScanoutStats { swaps: 2, repeats: 1 });
        handle.join().unwrap();
    }

    #[test]
    fn test_producer_fails_when_scanout_dropped() {
        let (mut producer, scanout) = setup(ColorMode::Direct8);
        drop(scanout);
        let err = producer.signal_ready_and_wait().unwrap_err();
        assert!(matches!(err, Error::ScanoutClosed));
    }

    #[test]
    fn test_split_rejects_mismatched_store() {
        let geometry = Geometry::with_default_boundary(64, 40, 2, ColorMode::Direct8).unwrap();
        let pool = HeapPool::new(MemoryRegion::Internal);
        let store =
            FrameStore::allocate(FrameFormat::new(64, 40, ColorMode::Direct8), &pool).unwrap();
        assert!(matches!(
            split(geometry, store),
            Err(Error::FormatMismatch { .. })
        ));
    }

    #[test]
    fn test_init_reports_allocation_failure() {
        let geometry = Geometry::with_default_boundary(640, 480, 2, ColorMode::Direct8).unwrap();
        let pool = HeapPool::with_limit(MemoryRegion::Internal, 1024);
        assert!(matches!(
            init(geometry, &pool, 0),
            Err(Error::AllocationFailure { .. })
        ));
    }
}
