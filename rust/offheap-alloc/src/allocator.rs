//! Allocation tracking and release.

use std::sync::{Arc, OnceLock, atomic::AtomicU64, atomic::Ordering};

use dashmap::DashMap;

use offheap_common::{Result, error::Error};

use crate::memory::{HEADER_SIZE, Memory};

/// What a registered allocation is backed by. Captured at registration time
/// so a record can be released without the original [`Memory`] value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MemoryKind {
    Heap,
    Mapped,
}

/// Everything the allocator needs to release an allocation it tracked:
/// backing kind, header address, and total size.
#[derive(Debug, Clone, Copy)]
pub struct AllocationRecord {
    kind: MemoryKind,
    header_address: usize,
    size: u64,
}

impl AllocationRecord {
    fn of(memory: &Memory) -> Option<AllocationRecord> {
        let kind = match memory {
            Memory::Empty => return None,
            Memory::Heap { .. } => MemoryKind::Heap,
            Memory::Mapped { .. } => MemoryKind::Mapped,
        };
        Some(AllocationRecord {
            kind,
            header_address: memory.header_address(),
            size: memory.size() as u64,
        })
    }

    fn to_memory(self) -> Memory {
        match self.kind {
            MemoryKind::Heap => unsafe {
                Memory::heap_from_header(self.header_address as *mut u8)
            },
            MemoryKind::Mapped => {
                Memory::mapped(self.header_address as *mut u8, self.size as usize)
            }
        }
    }
}

/// Tracks every live off-heap allocation and releases each exactly once.
///
/// The table is keyed by header address and shared between allocating threads;
/// insert/remove/lookup are linearizable per key. The aggregate size counter
/// is a diagnostic and is only eventually consistent with the table under
/// concurrent mutation.
pub struct Allocator {
    records: DashMap<usize, AllocationRecord>,
    allocated: AtomicU64,
}

impl Allocator {
    pub fn new() -> Allocator {
        Allocator {
            records: DashMap::new(),
            allocated: AtomicU64::new(0),
        }
    }

    /// The process-wide allocator used by buffers that do not carry their own.
    pub fn global() -> &'static Arc<Allocator> {
        static GLOBAL: OnceLock<Arc<Allocator>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(Allocator::new()))
    }

    /// Allocates `size` bytes of off-heap memory with an 8-byte size header
    /// in front, registers the allocation, and returns the owning handle.
    ///
    /// `size` 0 yields the empty memory without touching the system
    /// allocator.
    ///
    /// # Errors
    ///
    /// `AllocationFailure` if the system allocator cannot satisfy the
    /// request.
    pub fn allocate(self: &Arc<Self>, size: usize) -> Result<MemoryHandle> {
        if size == 0 {
            return Ok(MemoryHandle {
                memory: Memory::Empty,
                allocator: Arc::clone(self),
            });
        }
        let total = size
            .checked_add(HEADER_SIZE)
            .ok_or_else(|| Error::allocation_failure(size as u64))?;
        let header = unsafe { std::alloc::alloc(Memory::heap_layout(total)) };
        if header.is_null() {
            return Err(Error::allocation_failure(size as u64));
        }
        unsafe {
            (header as *mut u64).write(size as u64);
        }
        Ok(self.register(Memory::Heap { header }))
    }

    /// Registers a memory region constructed outside the normal `allocate`
    /// path (e.g. an OS mapping) and returns the owning handle. The region
    /// becomes subject to the same release bookkeeping as heap allocations.
    pub fn register(self: &Arc<Self>, memory: Memory) -> MemoryHandle {
        if let Some(record) = AllocationRecord::of(&memory) {
            self.records.insert(record.header_address, record);
            self.allocated.fetch_add(record.size, Ordering::Relaxed);
            log::trace!(
                "registered {} bytes at {:#x}",
                record.size,
                record.header_address
            );
        }
        MemoryHandle {
            memory,
            allocator: Arc::clone(self),
        }
    }

    /// Releases a tracked allocation. If `memory` is not (or no longer)
    /// present in the table, this is a silent no-op; two racing calls on the
    /// same region deallocate it exactly once.
    ///
    /// # Safety
    ///
    /// After this call, any remaining pointer into the region dangles.
    /// Callers must ensure no handle or view will access it again; the safe
    /// path is dropping the owning [`MemoryHandle`].
    pub unsafe fn release(&self, memory: &Memory) {
        self.release_address(memory.header_address());
    }

    /// Releases whatever allocation is registered at `header_address`, using
    /// only the data captured at registration time.
    pub(crate) fn release_address(&self, header_address: usize) {
        if let Some((_, record)) = self.records.remove(&header_address) {
            self.allocated.fetch_sub(record.size, Ordering::Relaxed);
            if let Err(e) = unsafe { record.to_memory().release() } {
                // A failed release must not take down the caller; the record
                // is already gone, so this region is simply lost.
                log::error!(
                    "failed to release {} bytes at {:#x}: {e}",
                    record.size,
                    record.header_address
                );
            } else {
                log::trace!(
                    "released {} bytes at {:#x}",
                    record.size,
                    record.header_address
                );
            }
        }
    }

    /// Releases every allocation currently tracked by this allocator. All
    /// outstanding addresses become invalid.
    ///
    /// Iterates a point-in-time snapshot of the table, so it tolerates
    /// concurrent allocate/release; regions registered after the snapshot
    /// survive.
    pub fn release_all(&self) {
        let addresses: Vec<usize> = self.records.iter().map(|r| *r.key()).collect();
        for address in addresses {
            log::warn!("releasing still-registered allocation at {address:#x}");
            self.release_address(address);
        }
    }

    /// Current sum of live allocation sizes in bytes (headers included).
    /// Eventually consistent under concurrent allocate/release.
    pub fn allocated_size(&self) -> u64 {
        self.allocated.load(Ordering::Relaxed)
    }

    /// Whether the allocation starting at `header_address` is still tracked.
    pub fn is_registered(&self, header_address: usize) -> bool {
        self.records.contains_key(&header_address)
    }
}

impl Default for Allocator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Allocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Allocator")
            .field("live_records", &self.records.len())
            .field("allocated_size", &self.allocated_size())
            .finish()
    }
}

/// Owning handle to a registered [`Memory`]. Dropping the handle releases the
/// allocation through its [`Allocator`]; buffers share one handle via `Arc`,
/// so the region is reclaimed when the last owner goes away.
pub struct MemoryHandle {
    memory: Memory,
    allocator: Arc<Allocator>,
}

impl MemoryHandle {
    #[inline]
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn allocator(&self) -> &Arc<Allocator> {
        &self.allocator
    }
}

impl Drop for MemoryHandle {
    fn drop(&mut self) {
        // Idempotent: explicit releases that happened earlier leave no
        // record, and this becomes a no-op.
        unsafe { self.allocator.release(&self.memory) };
    }
}

impl std::fmt::Debug for MemoryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryHandle")
            .field("memory", &self.memory)
            .finish_non_exhaustive()
    }
}
