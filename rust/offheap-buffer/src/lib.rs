//! Byte-addressed read/write access over off-heap memory.
//!
//! [`Buffer`] wraps a registered allocation and exposes typed get/put at byte
//! offsets, fill/copy, zero-copy views versus copying slices, and bulk I/O to
//! and from files. Operations that hand memory to I/O primitives go through
//! bounded [`RawView`] windows, since a single window is limited to a 31-bit
//! length.

pub mod buffer;
pub mod sink;
pub mod view;

pub use buffer::Buffer;
pub use sink::BufferSink;
pub use view::{MAX_VIEW_LEN, RawView, Views};

#[cfg(test)]
mod tests;
