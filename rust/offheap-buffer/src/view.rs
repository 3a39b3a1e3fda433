//! Bounded windows over off-heap memory.

use std::marker::PhantomData;

/// Largest length of a single [`RawView`]. I/O primitives that take one
/// contiguous window are limited to a 31-bit length, so anything larger is
/// decomposed into a sequence of views.
pub const MAX_VIEW_LEN: usize = i32::MAX as usize;

/// A fixed window over a buffer's memory, never longer than [`MAX_VIEW_LEN`].
///
/// The lifetime ties the view to the buffer it was created from; the window
/// is valid as long as that buffer is alive.
pub struct RawView<'a> {
    ptr: *mut u8,
    len: usize,
    _parent: PhantomData<&'a ()>,
}

impl<'a> RawView<'a> {
    pub(crate) fn new(ptr: *mut u8, len: usize) -> RawView<'a> {
        debug_assert!(len <= MAX_VIEW_LEN);
        RawView {
            ptr,
            len,
            _parent: PhantomData,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn ptr(&self) -> *mut u8 {
        self.ptr
    }

    /// The window contents as a byte slice.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }

    /// The window contents as a mutable byte slice. Writes go straight into
    /// the underlying buffer.
    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.len) }
    }
}

impl std::fmt::Debug for RawView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawView")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}

/// Iterator decomposing a byte range into the minimal ordered sequence of
/// [`RawView`] windows covering it. Every window except possibly the last has
/// the full chunk length.
pub struct Views<'a> {
    ptr: *mut u8,
    remaining: usize,
    chunk: usize,
    _parent: PhantomData<&'a ()>,
}

impl<'a> Views<'a> {
    pub(crate) fn new(ptr: *mut u8, len: usize, chunk: usize) -> Views<'a> {
        assert!(chunk > 0 && chunk <= MAX_VIEW_LEN);
        Views {
            ptr,
            remaining: len,
            chunk,
            _parent: PhantomData,
        }
    }
}

impl<'a> Iterator for Views<'a> {
    type Item = RawView<'a>;

    fn next(&mut self) -> Option<RawView<'a>> {
        if self.remaining == 0 {
            return None;
        }
        let len = self.remaining.min(self.chunk);
        let view = RawView::new(self.ptr, len);
        self.ptr = unsafe { self.ptr.add(len) };
        self.remaining -= len;
        Some(view)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining.div_ceil(self.chunk);
        (n, Some(n))
    }
}

impl ExactSizeIterator for Views<'_> {}
