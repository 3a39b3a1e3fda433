//! # Offheap: manually managed off-heap memory
//!
//! Offheap provides byte buffers that live outside the managed heap, with
//! explicit allocation tracking, typed access at arbitrary byte offsets, and
//! memory-mapped file buffers sharing the same API.
//!
//! ## Components
//!
//! * [`Buffer`] - byte-addressed off-heap buffer with typed get/put,
//!   fill/copy, copying slices versus zero-copy views, and bulk file I/O
//! * [`MappedBuffer`] - a file range mapped into the address space, exposed
//!   through the same buffer API
//! * [`Allocator`] - tracks every live allocation by address, maintains the
//!   aggregate size counter, and releases each region exactly once
//! * [`BufferSink`] - adapter exposing a buffer as a `std::io::Write`
//!   destination
//!
//! Allocations are owned: dropping the last buffer or view over a region
//! returns it to the OS. [`Allocator::release_all`] is the backstop for
//! tearing down everything a particular allocator still tracks.
//!
//! ## Module Organization
//!
//! This crate is a convenience entry point re-exporting the component crates:
//!
//! * [`alloc`] - allocation registry, [`Memory`] descriptions, owning handles
//! * [`buffer`] - the buffer, sink, and view types
//! * [`mmap`] - memory-mapped buffers
//! * [`common`] - error and result types shared across components
//! * [`page`] - thin OS syscall layer underneath the mapped buffers
//!
//! ## Example
//!
//! ```
//! use offheap::Buffer;
//!
//! # fn main() -> offheap::Result<()> {
//! let buf = Buffer::allocate(1024)?;
//! buf.put_u64(0, 42);
//! buf.put_f64(8, 2.5);
//! assert_eq!(buf.get_u64(0), 42);
//!
//! // Zero-copy view over a sub-range; writes are shared.
//! let view = buf.view(8, 16)?;
//! assert_eq!(view.get_f64(0), 2.5);
//! # Ok(())
//! # }
//! ```

pub use offheap_alloc as alloc;
pub use offheap_buffer as buffer;
pub use offheap_common as common;
pub use offheap_mmap as mmap;
pub use offheap_page as page;

pub use offheap_alloc::{Allocator, Memory, MemoryHandle};
pub use offheap_buffer::{Buffer, BufferSink, MAX_VIEW_LEN, RawView, Views};
pub use offheap_common::Result;
pub use offheap_mmap::{MapMode, MappedBuffer};
