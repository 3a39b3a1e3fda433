//! Description of a single off-heap allocation.

use std::alloc::Layout;

/// Size of the length header stored in front of every heap allocation's
/// payload. The header word holds the payload size in bytes, so a bare
/// address can be rehydrated into a full [`Memory`] description.
pub const HEADER_SIZE: usize = 8;

/// One off-heap allocation: `|header (8 bytes: data size)| data ...|` for
/// heap memory, or a raw OS mapping where header and data coincide and the
/// length is tracked in the value itself.
///
/// `Memory` is a plain description; it does not own the region. Lifetime is
/// managed by [`MemoryHandle`](crate::MemoryHandle) and the
/// [`Allocator`](crate::Allocator) registration table.
#[derive(Debug, Clone, Copy)]
pub enum Memory {
    /// The empty allocation: all accessors return 0 and release is a no-op.
    Empty,
    /// Heap allocation; `header` points at the size header, the payload
    /// starts `HEADER_SIZE` bytes later.
    Heap { header: *mut u8 },
    /// File-backed OS mapping of `len` bytes starting at `ptr`. No header is
    /// written into the mapped region.
    Mapped { ptr: *mut u8, len: usize },
}

// SAFETY: Memory is a description of a raw region; synchronization of access
// to the region's contents is the caller's responsibility.
unsafe impl Send for Memory {}
unsafe impl Sync for Memory {}

impl Memory {
    /// Rehydrates a heap `Memory` from a bare header address, relying on the
    /// size header stored in the region itself.
    ///
    /// # Safety
    ///
    /// `header` must point at a live allocation produced by
    /// [`Allocator::allocate`](crate::Allocator::allocate).
    pub unsafe fn heap_from_header(header: *mut u8) -> Memory {
        Memory::Heap { header }
    }

    /// Wraps a raw OS mapping as a `Memory`, suitable for
    /// [`Allocator::register`](crate::Allocator::register).
    pub fn mapped(ptr: *mut u8, len: usize) -> Memory {
        Memory::Mapped { ptr, len }
    }

    /// Start of the allocation, including the header for heap memory.
    /// 0 denotes the empty allocation.
    #[inline]
    pub fn header_address(&self) -> usize {
        match *self {
            Memory::Empty => 0,
            Memory::Heap { header } => header as usize,
            Memory::Mapped { ptr, .. } => ptr as usize,
        }
    }

    /// Pointer to the start of the data region.
    #[inline]
    pub fn data_ptr(&self) -> *mut u8 {
        match *self {
            Memory::Empty => std::ptr::null_mut(),
            Memory::Heap { header } => unsafe { header.add(HEADER_SIZE) },
            Memory::Mapped { ptr, .. } => ptr,
        }
    }

    /// Address of the start of the data region. 0 for the empty allocation.
    #[inline]
    pub fn address(&self) -> usize {
        self.data_ptr() as usize
    }

    /// Total allocation size in bytes: data plus header for heap memory,
    /// mapped length for mappings.
    #[inline]
    pub fn size(&self) -> usize {
        match *self {
            Memory::Empty => 0,
            Memory::Heap { .. } => self.data_size() + HEADER_SIZE,
            Memory::Mapped { len, .. } => len,
        }
    }

    /// Usable payload size in bytes. For heap memory this is a load from the
    /// header word, which is the source of truth for the allocation's size.
    #[inline]
    pub fn data_size(&self) -> usize {
        match *self {
            Memory::Empty => 0,
            Memory::Heap { header } => unsafe { (header as *const u64).read() as usize },
            Memory::Mapped { len, .. } => len,
        }
    }

    /// Releases the underlying region: the system deallocator for heap
    /// memory, `munmap` for mappings. No-op for the empty allocation.
    ///
    /// # Safety
    ///
    /// The region must not have been released before and must not be accessed
    /// afterwards. Callers normally go through
    /// [`Allocator::release`](crate::Allocator::release), whose registration
    /// table enforces exactly-once release.
    pub unsafe fn release(&self) -> std::io::Result<()> {
        match *self {
            Memory::Empty => Ok(()),
            Memory::Heap { header } => {
                let total = self.data_size() + HEADER_SIZE;
                unsafe {
                    #[cfg(debug_assertions)]
                    header.write_bytes(0xDD, total);
                    std::alloc::dealloc(header, Self::heap_layout(total));
                }
                Ok(())
            }
            Memory::Mapped { ptr, len } => unsafe { offheap_page::mmap::unmap(ptr, len) },
        }
    }

    pub(crate) fn heap_layout(total: usize) -> Layout {
        // Total always includes the 8-byte header, so size and alignment are
        // both valid here.
        unsafe { Layout::from_size_align_unchecked(total, HEADER_SIZE) }
    }
}
