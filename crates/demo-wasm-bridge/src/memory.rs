//! Linear memory management for the wasm bridge.
//!
//! The host and guest share a linear memory region addressed by numeric
//! offsets. This module is the indirection layer behind those offsets: an
//! allocation table keyed by starting offset, where each live region owns its
//! bytes. Offsets are handed out from a monotonically increasing counter and
//! never reused, so a released or fabricated offset is simply absent from the
//! table.
//!
//! The host may only use offsets returned by [`LinearMemory::allocate`] and
//! not yet released; anything else is a contract violation. With the
//! `debug_memory` feature on, released offsets are kept as tombstones and
//! misuse (double free, use after free) panics with a diagnostic. With the
//! feature off, misuse degrades to a silent no-op and the external contract
//! is unchanged.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{LazyLock, Mutex};

use dashmap::DashMap;

/// An opaque offset into the linear memory region.
///
/// `#[repr(C)]` over `u32`, so it is bit-identical to the raw `i32` address
/// the embedding passes across the boundary. Offset 0 is reserved as the
/// null sentinel.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemOffset {
    offset: u32,
}

/// Null offset constant
pub const MEM_OFFSET_NULL: MemOffset = MemOffset { offset: 0 };

impl MemOffset {
    /// The null sentinel (offset 0).
    pub const fn null() -> Self {
        MEM_OFFSET_NULL
    }

    /// Check if this is the null sentinel.
    pub const fn is_null(&self) -> bool {
        self.offset == 0
    }

    pub(crate) fn from_offset(offset: u32) -> Self {
        MemOffset { offset }
    }
}

/// Region starting offsets are 8-byte aligned.
const REGION_ALIGN: u32 = 8;

/// A live allocation: the region's bytes, owned by the table.
struct Region {
    data: Box<[u8]>,
}

#[derive(Debug)]
struct MemoryStats {
    allocated: u64,
    released: u64,
    peak_count: u64,
}

impl MemoryStats {
    const fn new() -> Self {
        Self {
            allocated: 0,
            released: 0,
            peak_count: 0,
        }
    }
}

/// The shared linear memory region, as an allocation table.
pub struct LinearMemory {
    /// Live regions keyed by starting offset.
    regions: DashMap<u32, Region>,
    /// Next starting offset to hand out. Starts past 0 (the null sentinel)
    /// and only ever grows.
    next_offset: AtomicU32,
    stats: Mutex<MemoryStats>,
    /// Released offsets and their region length, for misuse reporting.
    #[cfg(feature = "debug_memory")]
    tombstones: DashMap<u32, usize>,
}

impl LinearMemory {
    pub fn new() -> Self {
        Self {
            regions: DashMap::new(),
            next_offset: AtomicU32::new(REGION_ALIGN),
            stats: Mutex::new(MemoryStats::new()),
            #[cfg(feature = "debug_memory")]
            tombstones: DashMap::new(),
        }
    }

    /// Reserve `len` bytes and return the region's starting offset.
    ///
    /// Returns the null offset when the request cannot be satisfied (zero
    /// length, or the 32-bit offset space is exhausted). No initialization
    /// guarantee is part of the contract, though regions are currently
    /// zero-filled.
    pub fn allocate(&self, len: usize) -> MemOffset {
        if len == 0 {
            return MEM_OFFSET_NULL;
        }
        let Ok(len_u32) = u32::try_from(len) else {
            return MEM_OFFSET_NULL;
        };
        let Some(step) = len_u32.checked_next_multiple_of(REGION_ALIGN) else {
            return MEM_OFFSET_NULL;
        };

        let claimed = self
            .next_offset
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |cur| {
                cur.checked_add(step)
            });
        let Ok(offset) = claimed else {
            // Offset space exhausted; report failure via the sentinel.
            return MEM_OFFSET_NULL;
        };

        self.regions.insert(
            offset,
            Region {
                data: vec![0u8; len].into_boxed_slice(),
            },
        );

        {
            let mut stats = self.stats.lock().unwrap();
            stats.allocated += 1;
            let live = stats.allocated - stats.released;
            if live > stats.peak_count {
                stats.peak_count = live;
            }
        }

        MemOffset::from_offset(offset)
    }

    /// Release the region starting at `offset`.
    ///
    /// Releasing the null offset is a no-op. Releasing an offset that is not
    /// currently live is a caller contract violation.
    pub fn release(&self, offset: MemOffset) {
        if offset.is_null() {
            return;
        }
        match self.regions.remove(&offset.offset) {
            Some((_, _region)) => {
                #[cfg(feature = "debug_memory")]
                self.tombstones.insert(offset.offset, _region.data.len());
                let mut stats = self.stats.lock().unwrap();
                stats.released += 1;
            }
            None => {
                #[cfg(feature = "debug_memory")]
                self.report_bad_release(offset.offset);
            }
        }
    }

    #[cfg(feature = "debug_memory")]
    fn report_bad_release(&self, offset: u32) -> ! {
        if self.tombstones.contains_key(&offset) {
            panic!("double free of linear memory offset {offset:#x}");
        }
        panic!("free of never-allocated linear memory offset {offset:#x}");
    }

    /// Execute a closure with read access to the region at `offset`.
    ///
    /// Returns `None` when the offset is not live.
    pub fn with_bytes<T, F>(&self, offset: MemOffset, f: F) -> Option<T>
    where
        F: FnOnce(&[u8]) -> T,
    {
        if offset.is_null() {
            return None;
        }
        let region = self.regions.get(&offset.offset);
        #[cfg(feature = "debug_memory")]
        if region.is_none() && self.tombstones.contains_key(&offset.offset) {
            panic!(
                "use after free of linear memory offset {:#x}",
                offset.offset
            );
        }
        region.map(|r| f(&r.data))
    }

    /// Execute a closure with write access to the region at `offset`.
    ///
    /// Returns `None` when the offset is not live.
    pub fn with_bytes_mut<T, F>(&self, offset: MemOffset, f: F) -> Option<T>
    where
        F: FnOnce(&mut [u8]) -> T,
    {
        if offset.is_null() {
            return None;
        }
        let region = self.regions.get_mut(&offset.offset);
        #[cfg(feature = "debug_memory")]
        if region.is_none() && self.tombstones.contains_key(&offset.offset) {
            panic!(
                "use after free of linear memory offset {:#x}",
                offset.offset
            );
        }
        region.map(|mut r| f(&mut r.data))
    }

    /// Length in bytes of the region at `offset`, if live.
    pub fn region_len(&self, offset: MemOffset) -> Option<usize> {
        self.with_bytes(offset, |data| data.len())
    }

    /// Host-side write into a live region, starting at its base.
    ///
    /// Returns `false` when the offset is not live or `bytes` does not fit.
    pub fn write_bytes(&self, offset: MemOffset, bytes: &[u8]) -> bool {
        self.with_bytes_mut(offset, |data| {
            if bytes.len() > data.len() {
                return false;
            }
            data[..bytes.len()].copy_from_slice(bytes);
            true
        })
        .unwrap_or(false)
    }

    /// Host-side copy of a live region's full contents.
    pub fn read_bytes(&self, offset: MemOffset) -> Option<Vec<u8>> {
        self.with_bytes(offset, |data| data.to_vec())
    }

    /// Read the NUL-terminated byte sequence starting at `offset`.
    ///
    /// The terminator is excluded. A region with no terminator is clamped at
    /// its end (an unterminated sequence is a caller contract violation; the
    /// clamp just keeps the safe implementation bounded).
    pub fn read_cstr(&self, offset: MemOffset) -> Option<Vec<u8>> {
        self.with_bytes(offset, |data| {
            let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
            data[..end].to_vec()
        })
    }

    /// Drop every live region and reset statistics (test isolation).
    pub fn clear_all(&self) {
        self.regions.clear();
        #[cfg(feature = "debug_memory")]
        self.tombstones.clear();
        let mut stats = self.stats.lock().unwrap();
        *stats = MemoryStats::new();
    }

    /// Allocation statistics: (allocated, released, peak live count).
    pub fn stats(&self) -> (u64, u64, u64) {
        let stats = self.stats.lock().unwrap();
        (stats.allocated, stats.released, stats.peak_count)
    }
}

impl Default for LinearMemory {
    fn default() -> Self {
        Self::new()
    }
}

static LINEAR_MEMORY: LazyLock<LinearMemory> = LazyLock::new(LinearMemory::new);

/// Access the process-wide linear memory region shared with the host.
pub fn linear_memory() -> &'static LinearMemory {
    &LINEAR_MEMORY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_returns_distinct_aligned_offsets() {
        let memory = LinearMemory::new();
        let a = memory.allocate(3);
        let b = memory.allocate(16);
        assert!(!a.is_null());
        assert!(!b.is_null());
        assert_ne!(a, b);
        assert_eq!(a.offset % REGION_ALIGN, 0);
        assert_eq!(b.offset % REGION_ALIGN, 0);
    }

    #[test]
    fn allocate_zero_is_null() {
        let memory = LinearMemory::new();
        assert!(memory.allocate(0).is_null());
    }

    #[test]
    fn release_removes_region() {
        let memory = LinearMemory::new();
        let offset = memory.allocate(8);
        assert_eq!(memory.region_len(offset), Some(8));
        memory.release(offset);
        assert_eq!(memory.region_len(offset), None);
        assert_eq!(memory.stats(), (1, 1, 1));
    }

    #[test]
    fn release_null_is_noop() {
        let memory = LinearMemory::new();
        memory.release(MemOffset::null());
        assert_eq!(memory.stats(), (0, 0, 0));
    }

    #[cfg(not(feature = "debug_memory"))]
    #[test]
    fn release_unknown_is_noop_without_debug_memory() {
        let memory = LinearMemory::new();
        memory.release(MemOffset::from_offset(0x40));
        assert_eq!(memory.stats(), (0, 0, 0));
    }

    #[cfg(feature = "debug_memory")]
    #[test]
    #[should_panic(expected = "double free")]
    fn double_release_panics_with_debug_memory() {
        let memory = LinearMemory::new();
        let offset = memory.allocate(8);
        memory.release(offset);
        memory.release(offset);
    }

    #[test]
    fn write_then_read_round_trips() {
        let memory = LinearMemory::new();
        let offset = memory.allocate(8);
        assert!(memory.write_bytes(offset, b"abc\0"));
        assert_eq!(memory.read_cstr(offset).unwrap(), b"abc");
        assert_eq!(memory.read_bytes(offset).unwrap().len(), 8);
    }

    #[test]
    fn write_oversized_is_rejected() {
        let memory = LinearMemory::new();
        let offset = memory.allocate(2);
        assert!(!memory.write_bytes(offset, b"too long"));
    }

    #[test]
    fn read_cstr_clamps_unterminated_region() {
        let memory = LinearMemory::new();
        let offset = memory.allocate(4);
        assert!(memory.write_bytes(offset, b"abcd"));
        assert_eq!(memory.read_cstr(offset).unwrap(), b"abcd");
    }

    #[test]
    fn regions_are_zero_filled() {
        let memory = LinearMemory::new();
        let offset = memory.allocate(16);
        assert_eq!(memory.read_bytes(offset).unwrap(), vec![0u8; 16]);
    }
}
