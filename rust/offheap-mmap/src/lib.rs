//! Memory-mapped file buffers.
//!
//! [`MappedBuffer`] maps a byte range of a file into the address space and
//! exposes it through the full [`Buffer`] API. The mapping is registered with
//! the same allocator bookkeeping as heap buffers, so aggregate accounting and
//! bulk release cover both kinds of memory.

pub mod mapped;

pub use mapped::MappedBuffer;
pub use offheap_page::MapMode;
