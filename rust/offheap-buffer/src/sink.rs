//! Adapter exposing a [`Buffer`] as a `std::io::Write` destination.

use std::io::Write;

use crate::buffer::Buffer;

/// Cursor-based write sink over a [`Buffer`].
///
/// Each `write` copies into the buffer at the current cursor, advances it by
/// the amount copied, and reports exactly that amount. Writes near the end of
/// the buffer are truncated to the remaining capacity; a full sink reports
/// zero bytes consumed, which `write_all` and `io::copy` surface as
/// `WriteZero` instead of discarding input.
pub struct BufferSink<'a> {
    buffer: &'a Buffer,
    cursor: usize,
}

impl<'a> BufferSink<'a> {
    pub fn new(buffer: &'a Buffer) -> BufferSink<'a> {
        BufferSink { buffer, cursor: 0 }
    }

    /// Like [`BufferSink::new`], starting the cursor at `position`.
    ///
    /// # Panics
    ///
    /// Panics if `position` exceeds the buffer length.
    pub fn at(buffer: &'a Buffer, position: usize) -> BufferSink<'a> {
        assert!(position <= buffer.len());
        BufferSink {
            buffer,
            cursor: position,
        }
    }

    /// Number of bytes written into the buffer so far (plus the starting
    /// position for [`BufferSink::at`]).
    #[inline]
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Remaining buffer capacity in bytes.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.cursor
    }
}

impl Write for BufferSink<'_> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let stored = self.buffer.read_from_slice(buf, self.cursor);
        self.cursor += stored;
        Ok(stored)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl std::fmt::Debug for BufferSink<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferSink")
            .field("cursor", &self.cursor)
            .field("len", &self.buffer.len())
            .finish()
    }
}
