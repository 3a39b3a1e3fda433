//! Off-heap memory allocation and lifetime tracking.
//!
//! [`Allocator`] hands out raw memory regions described by [`Memory`] values
//! and records every live allocation in a concurrent table keyed by address.
//! Ownership is carried by [`MemoryHandle`], which releases the allocation
//! through the table when dropped; the table makes release idempotent, so the
//! explicit and drop-time paths can race safely.

pub mod allocator;
pub mod memory;

pub use allocator::{AllocationRecord, Allocator, MemoryHandle};
pub use memory::{HEADER_SIZE, Memory};

#[cfg(test)]
mod tests;
