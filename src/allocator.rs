//! Byte-budget allocators for evaluation arenas.
//!
//! Blocks meter every buffer reservation through an [`Allocator`]. The
//! default [`HeapAllocator`] only keeps accounting; a [`BoundedAllocator`]
//! additionally enforces a ceiling, turning exhaustion into a
//! `MEMORY_EXCEEDED` error instead of an abort. There is no process-wide
//! default: callers pass an allocator explicitly.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{Error, ErrorCode, Result};

/// Byte-budget interface for evaluation buffers.
///
/// Implementations must be thread-safe; independent trees may share one
/// allocator from different threads.
pub trait Allocator: fmt::Debug + Send + Sync {
    /// Reserves `bytes` from the budget.
    ///
    /// # Errors
    ///
    /// Returns `MEMORY_EXCEEDED` if the reservation does not fit.
    fn reserve(&self, bytes: usize) -> Result<()>;

    /// Returns `bytes` to the budget.
    fn release(&self, bytes: usize);

    /// Returns the number of bytes currently reserved.
    fn bytes_in_use(&self) -> usize;
}

/// Unbounded allocator; reservations always succeed.
#[derive(Debug, Default)]
pub struct HeapAllocator {
    used: AtomicUsize,
}

impl HeapAllocator {
    /// Creates a new unbounded allocator.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(HeapAllocator::default())
    }
}

impl Allocator for HeapAllocator {
    fn reserve(&self, bytes: usize) -> Result<()> {
        self.used.fetch_add(bytes, Ordering::Relaxed);
        Ok(())
    }

    fn release(&self, bytes: usize) {
        self.used.fetch_sub(bytes, Ordering::Relaxed);
    }

    fn bytes_in_use(&self) -> usize {
        self.used.load(Ordering::Relaxed)
    }
}

/// Allocator with a hard byte ceiling.
#[derive(Debug)]
pub struct BoundedAllocator {
    limit: usize,
    used: AtomicUsize,
}

impl BoundedAllocator {
    /// Creates an allocator that refuses reservations past `limit` bytes.
    #[must_use]
    pub fn new(limit: usize) -> Arc<Self> {
        Arc::new(BoundedAllocator {
            limit,
            used: AtomicUsize::new(0),
        })
    }

    /// Returns the ceiling in bytes.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl Allocator for BoundedAllocator {
    fn reserve(&self, bytes: usize) -> Result<()> {
        let mut used = self.used.load(Ordering::Relaxed);
        loop {
            let new_used = used.saturating_add(bytes);
            if new_used > self.limit {
                return Err(Error::new(
                    ErrorCode::MemoryExceeded,
                    format!(
                        "memory limit exceeded: {used} bytes used, {bytes} requested, limit is {} bytes",
                        self.limit
                    ),
                ));
            }
            match self
                .used
                .compare_exchange(used, new_used, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return Ok(()),
                Err(current) => used = current,
            }
        }
    }

    fn release(&self, bytes: usize) {
        self.used.fetch_sub(bytes, Ordering::Relaxed);
    }

    fn bytes_in_use(&self) -> usize {
        self.used.load(Ordering::Relaxed)
    }
}
