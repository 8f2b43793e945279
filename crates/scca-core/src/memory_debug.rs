//! Allocation statistics for debugging builds.
//!
//! Register [`CountingAllocator`] as the global allocator of a binary to have
//! the interruption trap report allocation counts before the attached
//! handler runs:
//!
//! ```ignore
//! #[global_allocator]
//! static ALLOCATOR: scca_core::memory_debug::CountingAllocator =
//!     scca_core::memory_debug::CountingAllocator;
//! ```

#![allow(unsafe_code)]

use std::alloc::{GlobalAlloc, Layout, System};
use std::fmt::{self, Write as _};
use std::sync::atomic::{AtomicUsize, Ordering};

static ALLOCATIONS: AtomicUsize = AtomicUsize::new(0);
static DEALLOCATIONS: AtomicUsize = AtomicUsize::new(0);
static BYTES_IN_USE: AtomicUsize = AtomicUsize::new(0);
static PEAK_BYTES: AtomicUsize = AtomicUsize::new(0);

/// Global allocator wrapper around [`System`] that counts allocations
#[derive(Debug, Default, Clone, Copy)]
pub struct CountingAllocator;

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = System.alloc(layout);
        if !ptr.is_null() {
            record_allocation(layout.size());
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = System.alloc_zeroed(layout);
        if !ptr.is_null() {
            record_allocation(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout);
        record_deallocation(layout.size());
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = System.realloc(ptr, layout, new_size);
        if !new_ptr.is_null() {
            record_deallocation(layout.size());
            record_allocation(new_size);
        }
        new_ptr
    }
}

/// Snapshot of the allocation counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AllocationStats {
    /// Number of allocations (a reallocation counts as one)
    pub allocations: usize,
    /// Number of deallocations
    pub deallocations: usize,
    /// Bytes currently allocated
    pub bytes_in_use: usize,
    /// Highest value `bytes_in_use` has reached
    pub peak_bytes: usize,
}

impl fmt::Display for AllocationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "allocations: {}, deallocations: {}, bytes in use: {}, peak bytes: {}",
            self.allocations, self.deallocations, self.bytes_in_use, self.peak_bytes
        )
    }
}

/// Current allocation counters
pub fn statistics() -> AllocationStats {
    AllocationStats {
        allocations: ALLOCATIONS.load(Ordering::Relaxed),
        deallocations: DEALLOCATIONS.load(Ordering::Relaxed),
        bytes_in_use: BYTES_IN_USE.load(Ordering::Relaxed),
        peak_bytes: PEAK_BYTES.load(Ordering::Relaxed),
    }
}

/// Writes the counters to standard error without allocating
pub(crate) fn dump_statistics() {
    let mut line = StackBuffer::new();
    if writeln!(line, "memory-debug: {}", statistics()).is_err() {
        return;
    }
    write_stderr(line.as_bytes());
}

#[cfg(unix)]
fn write_stderr(bytes: &[u8]) {
    let _ = nix::unistd::write(std::io::stderr(), bytes);
}

#[cfg(not(unix))]
fn write_stderr(bytes: &[u8]) {
    use std::io::Write;
    let _ = std::io::stderr().write_all(bytes);
}

fn record_allocation(size: usize) {
    ALLOCATIONS.fetch_add(1, Ordering::Relaxed);
    let in_use = BYTES_IN_USE.fetch_add(size, Ordering::Relaxed) + size;
    PEAK_BYTES.fetch_max(in_use, Ordering::Relaxed);
}

fn record_deallocation(size: usize) {
    DEALLOCATIONS.fetch_add(1, Ordering::Relaxed);
    BYTES_IN_USE.fetch_sub(size, Ordering::Relaxed);
}

/// Fixed-size formatting target
struct StackBuffer {
    bytes: [u8; 256],
    len: usize,
}

impl StackBuffer {
    fn new() -> Self {
        Self {
            bytes: [0; 256],
            len: 0,
        }
    }

    fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

impl fmt::Write for StackBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let end = self.len + s.len();
        if end > self.bytes.len() {
            return Err(fmt::Error);
        }
        self.bytes[self.len..end].copy_from_slice(s.as_bytes());
        self.len = end;
        Ok(())
    }
}
