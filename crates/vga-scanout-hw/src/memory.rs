//! Memory pools that frame buffers are allocated from.

use crate::{Error, Result};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};

/// Memory region a pool draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemoryRegion {
    /// On-chip RAM: fast, small.
    #[default]
    Internal,
    /// External RAM (e.g. PSRAM): large, slower.
    External,
}

impl FromStr for MemoryRegion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "internal" => Ok(MemoryRegion::Internal),
            "external" | "psram" => Ok(MemoryRegion::External),
            _ => Err(Error::InvalidMemoryRegion(s.to_string())),
        }
    }
}

impl std::fmt::Display for MemoryRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryRegion::Internal => write!(f, "internal"),
            MemoryRegion::External => write!(f, "external"),
        }
    }
}

/// Source of zeroed byte buffers.
pub trait MemoryPool {
    /// Returns the region this pool allocates from.
    fn region(&self) -> MemoryRegion;

    /// Allocates a zeroed buffer of `len` bytes.
    fn allocate(&self, len: usize) -> Result<Box<[u8]>>;
}

/// Heap-backed pool with an optional byte budget.
///
/// The budget is shared by every allocation made through the same pool, which
/// models a fixed-size memory region on the target.
#[derive(Debug)]
pub struct HeapPool {
    region: MemoryRegion,
    limit: Option<usize>,
    used: AtomicUsize,
}

impl HeapPool {
    /// Creates an unbounded pool.
    pub fn new(region: MemoryRegion) -> Self {
        Self {
            region,
            limit: None,
            used: AtomicUsize::new(0),
        }
    }

    /// Creates a pool that refuses to hand out more than `limit` bytes in total.
    pub fn with_limit(region: MemoryRegion, limit: usize) -> Self {
        Self {
            region,
            limit: Some(limit),
            used: AtomicUsize::new(0),
        }
    }

    /// Returns the bytes handed out so far.
    pub fn used(&self) -> usize {
        self.used.load(Ordering::Relaxed)
    }

    fn reserve(&self, len: usize) -> Result<()> {
        let Some(limit) = self.limit else {
            self.used.fetch_add(len, Ordering::Relaxed);
            return Ok(());
        };

        self.used
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |used| {
                used.checked_add(len).filter(|&total| total <= limit)
            })
            .map(|_| ())
            .map_err(|used| {
                warn!(
                    "{} pool exhausted: {} of {} bytes used, {} requested",
                    self.region, used, limit, len
                );
                Error::AllocationFailure {
                    bytes: len,
                    region: self.region,
                }
            })
    }
}

impl MemoryPool for HeapPool {
    fn region(&self) -> MemoryRegion {
        self.region
    }

    fn allocate(&self, len: usize) -> Result<Box<[u8]>> {
        self.reserve(len)?;

        let mut buffer = Vec::new();
        if buffer.try_reserve_exact(len).is_err() {
            self.used.fetch_sub(len, Ordering::Relaxed);
            return Err(Error::AllocationFailure {
                bytes: len,
                region: self.region,
            });
        }
        buffer.resize(len, 0);

        debug!("Allocated {} bytes in {} memory", len, self.region);
        Ok(buffer.into_boxed_slice())
    }
}
