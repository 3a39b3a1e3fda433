use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use offheap_alloc::{Allocator, Memory, MemoryHandle};
use offheap_common::{Result, error::Error, verify_range};

use crate::sink::BufferSink;
use crate::view::{MAX_VIEW_LEN, RawView, Views};

/// Byte-addressed read/write access over one off-heap allocation.
///
/// A root buffer owns its registered [`Memory`] through an `Arc`-shared
/// [`MemoryHandle`]; zero-copy views created with [`Buffer::view`] share the
/// same handle and only differ by offset and length. The allocation is
/// released when the last sharer is dropped (or earlier, through the
/// allocator's explicit release path).
///
/// All get/put/copy/fill operations compute `data address + offset` and
/// perform a raw, unaligned, native-byte-order memory access. Offsets are
/// range-checked against the buffer length; the `*_unchecked` variants skip
/// the check. Buffers over memory mapped without write access are marked
/// read-only, and debug builds reject stores through the safe API instead of
/// faulting on the access. The buffer provides no locking over its contents —
/// concurrent readers and writers of overlapping ranges must synchronize
/// externally.
pub struct Buffer {
    memory: Arc<MemoryHandle>,
    offset: usize,
    len: usize,
    read_only: bool,
}

// SAFETY: Buffer hands out raw access to off-heap memory; synchronization of
// overlapping accesses is documented as the caller's responsibility.
unsafe impl Send for Buffer {}
unsafe impl Sync for Buffer {}

impl Buffer {
    /// Allocates a buffer of `size` bytes from the process-wide allocator.
    /// The contents are not initialized to any particular value; use
    /// [`Buffer::clear`] when zeroed contents are needed.
    pub fn allocate(size: usize) -> Result<Buffer> {
        Self::allocate_with(Allocator::global(), size)
    }

    /// Allocates a buffer of `size` bytes from the given allocator.
    pub fn allocate_with(allocator: &Arc<Allocator>, size: usize) -> Result<Buffer> {
        Ok(Self::from_handle(allocator.allocate(size)?))
    }

    /// Wraps a registered memory handle as a root buffer spanning the whole
    /// data region.
    pub fn from_handle(handle: MemoryHandle) -> Buffer {
        let len = handle.memory().data_size();
        Buffer {
            memory: Arc::new(handle),
            offset: 0,
            len,
            read_only: false,
        }
    }

    /// Wraps a registered memory handle as a buffer over
    /// `[offset, offset + len)` of its data region. Used by memory-mapped
    /// buffers, where the externally visible range starts at the page offset
    /// within the mapping.
    ///
    /// # Panics
    ///
    /// Panics if the range exceeds the handle's data region.
    pub fn from_handle_at(handle: MemoryHandle, offset: usize, len: usize) -> Buffer {
        assert!(offset.checked_add(len).is_some_and(|end| end <= handle.memory().data_size()));
        Buffer {
            memory: Arc::new(handle),
            offset,
            len,
            read_only: false,
        }
    }

    /// Marks the buffer as read-only: debug builds reject stores through the
    /// safe API with a panic instead of faulting on the memory access. Used
    /// for mappings established without write access; views inherit the
    /// marking.
    pub fn into_read_only(mut self) -> Buffer {
        self.read_only = true;
        self
    }

    /// Size of this buffer in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Address of the first byte of this buffer.
    #[inline]
    pub fn address(&self) -> usize {
        self.data_ptr() as usize
    }

    /// The underlying memory description shared by this buffer and its views.
    pub fn memory(&self) -> &Memory {
        self.memory.memory()
    }

    /// The allocator that tracks the underlying allocation.
    pub fn allocator(&self) -> &Arc<Allocator> {
        self.memory.allocator()
    }

    /// Releases this buffer's hold on the allocation. Identical to dropping:
    /// the memory itself is reclaimed once no other view shares it.
    pub fn release(self) {
        drop(self);
    }

    #[inline]
    pub(crate) fn data_ptr(&self) -> *mut u8 {
        unsafe { self.memory.memory().data_ptr().add(self.offset) }
    }

    #[inline]
    fn check_writable(&self) {
        debug_assert!(!self.read_only, "store into a read-only buffer");
    }

    #[inline]
    fn check(&self, offset: usize, len: usize) {
        assert!(
            offset.checked_add(len).is_some_and(|end| end <= self.len),
            "offset {offset} + length {len} out of bounds of buffer of {} bytes",
            self.len
        );
    }
}

/// Typed access.
impl Buffer {
    /// Reads a `T` at the given byte offset, in native byte order, without
    /// alignment requirements.
    ///
    /// # Panics
    ///
    /// Panics if `offset + size_of::<T>()` exceeds the buffer length.
    #[inline]
    pub fn get<T: bytemuck::AnyBitPattern>(&self, offset: usize) -> T {
        self.check(offset, size_of::<T>());
        unsafe { self.get_unchecked(offset) }
    }

    /// Writes a `T` at the given byte offset, in native byte order, without
    /// alignment requirements.
    ///
    /// # Panics
    ///
    /// Panics if `offset + size_of::<T>()` exceeds the buffer length.
    #[inline]
    pub fn put<T: bytemuck::NoUninit>(&self, offset: usize, value: T) {
        self.check_writable();
        self.check(offset, size_of::<T>());
        unsafe { self.put_unchecked(offset, value) }
    }

    /// Reads a `T` at the given byte offset without a range check.
    ///
    /// # Safety
    ///
    /// `offset + size_of::<T>()` must not exceed the buffer length.
    #[inline]
    pub unsafe fn get_unchecked<T: bytemuck::AnyBitPattern>(&self, offset: usize) -> T {
        unsafe { (self.data_ptr().add(offset) as *const T).read_unaligned() }
    }

    /// Writes a `T` at the given byte offset without a range check.
    ///
    /// # Safety
    ///
    /// `offset + size_of::<T>()` must not exceed the buffer length.
    #[inline]
    pub unsafe fn put_unchecked<T: bytemuck::NoUninit>(&self, offset: usize, value: T) {
        unsafe { (self.data_ptr().add(offset) as *mut T).write_unaligned(value) }
    }
}

macro_rules! scalar_accessors {
    ($($ty:ident),* $(,)?) => {
        impl Buffer {
            paste::paste! {
                $(
                    #[doc = concat!("Reads a `", stringify!($ty), "` at the given byte offset.")]
                    #[inline]
                    pub fn [<get_ $ty>](&self, offset: usize) -> $ty {
                        self.get::<$ty>(offset)
                    }

                    #[doc = concat!("Writes a `", stringify!($ty), "` at the given byte offset.")]
                    #[inline]
                    pub fn [<put_ $ty>](&self, offset: usize, value: $ty) {
                        self.put::<$ty>(offset, value)
                    }
                )*
            }
        }
    };
}

scalar_accessors!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

/// Fill and copy.
impl Buffer {
    /// Sets `len` bytes starting at `offset` to `value`.
    pub fn fill(&self, offset: usize, len: usize, value: u8) {
        self.check_writable();
        self.check(offset, len);
        unsafe { self.data_ptr().add(offset).write_bytes(value, len) };
    }

    /// Fills the whole buffer with zeros.
    pub fn clear(&self) {
        self.fill(0, self.len, 0);
    }

    /// Copies `len` bytes from `src_offset` in this buffer to `dest_offset`
    /// in `dest`. Source and destination may be the same buffer or views of
    /// the same memory; overlapping ranges copy correctly (memmove
    /// semantics).
    pub fn copy_to_buffer(&self, src_offset: usize, dest: &Buffer, dest_offset: usize, len: usize) {
        self.check(src_offset, len);
        dest.check_writable();
        dest.check(dest_offset, len);
        unsafe {
            std::ptr::copy(
                self.data_ptr().add(src_offset),
                dest.data_ptr().add(dest_offset),
                len,
            );
        }
    }

    /// Copies `len` bytes from `src_offset` in this buffer into `dest`
    /// starting at `dest_offset`, going through bounded windows.
    pub fn copy_to_slice(&self, src_offset: usize, dest: &mut [u8], dest_offset: usize, len: usize) {
        self.check(src_offset, len);
        assert!(dest_offset.checked_add(len).is_some_and(|end| end <= dest.len()));
        let mut cursor = dest_offset;
        for view in self.views_of(src_offset, len) {
            dest[cursor..cursor + view.len()].copy_from_slice(view.as_bytes());
            cursor += view.len();
        }
    }

    /// Overwrites this buffer starting at `dest_offset` with bytes from
    /// `src` starting at `src_offset`, copying at most `len` bytes.
    ///
    /// The amount copied is clamped to what both sides can provide: short
    /// sources and destinations truncate the copy instead of failing.
    /// Returns the number of bytes copied.
    pub fn read_from(&self, src: &[u8], src_offset: usize, dest_offset: usize, len: usize) -> usize {
        self.check_writable();
        let n = len
            .min(src.len().saturating_sub(src_offset))
            .min(self.len.saturating_sub(dest_offset));
        if n > 0 {
            unsafe {
                std::ptr::copy_nonoverlapping(
                    src.as_ptr().add(src_offset),
                    self.data_ptr().add(dest_offset),
                    n,
                );
            }
        }
        n
    }

    /// Overwrites this buffer starting at `dest_offset` with the whole of
    /// `src`, clamped like [`Buffer::read_from`].
    pub fn read_from_slice(&self, src: &[u8], dest_offset: usize) -> usize {
        self.read_from(src, 0, dest_offset, src.len())
    }

    /// Overwrites this buffer starting at `dest_offset` with the whole of
    /// `src`, failing instead of truncating when `src` does not fit.
    ///
    /// # Errors
    ///
    /// `InvalidRange` if `dest_offset + src.len()` exceeds the buffer length.
    pub fn read_from_exact(&self, src: &[u8], dest_offset: usize) -> Result<usize> {
        verify_range!(
            "read_from_exact",
            dest_offset,
            dest_offset as u64 + src.len() as u64,
            self.len
        );
        Ok(self.read_from(src, 0, dest_offset, src.len()))
    }
}

/// Slices and views.
impl Buffer {
    /// Extracts `[from, to)` as a new, independently allocated buffer and
    /// copies the bytes into it. Mutations of either buffer do not affect
    /// the other.
    ///
    /// # Errors
    ///
    /// `InvalidRange` if `from > to` or `to` exceeds the buffer length.
    pub fn slice(&self, from: usize, to: usize) -> Result<Buffer> {
        verify_range!("slice", from, to, self.len);
        let copy = Self::allocate_with(self.allocator(), to - from)?;
        self.copy_to_buffer(from, &copy, 0, to - from);
        Ok(copy)
    }

    /// Creates a zero-copy view of `[from, to)` sharing this buffer's
    /// memory. Mutations through the view are visible in the parent and vice
    /// versa; the allocation stays alive as long as any sharer exists.
    ///
    /// # Errors
    ///
    /// `InvalidRange` if `from > to` or `to` exceeds the buffer length.
    pub fn view(&self, from: usize, to: usize) -> Result<Buffer> {
        verify_range!("view", from, to, self.len);
        Ok(Buffer {
            memory: Arc::clone(&self.memory),
            offset: self.offset + from,
            len: to - from,
            read_only: self.read_only,
        })
    }

    /// A single bounded window over `[offset, offset + len)`.
    ///
    /// # Errors
    ///
    /// `SizeTooLarge` if `len` exceeds [`MAX_VIEW_LEN`]; `InvalidRange` if
    /// the window exceeds the buffer length.
    pub fn view_at(&self, offset: usize, len: usize) -> Result<RawView<'_>> {
        if len > MAX_VIEW_LEN {
            return Err(Error::size_too_large("view_at", len as u64, MAX_VIEW_LEN as u64));
        }
        verify_range!("view_at", offset, offset as u64 + len as u64, self.len);
        Ok(RawView::new(unsafe { self.data_ptr().add(offset) }, len))
    }

    /// Decomposes the whole buffer into the minimal ordered sequence of
    /// bounded windows (each at most [`MAX_VIEW_LEN`] bytes, the last one
    /// possibly shorter).
    pub fn views(&self) -> Views<'_> {
        self.views_of(0, self.len)
    }

    /// Like [`Buffer::views`], over `[offset, offset + len)`.
    pub fn views_of(&self, offset: usize, len: usize) -> Views<'_> {
        self.views_with_limit(offset, len, MAX_VIEW_LEN)
    }

    /// Window decomposition with a custom chunk ceiling; lets tests cross
    /// chunk boundaries without multi-gigabyte buffers.
    pub(crate) fn views_with_limit(&self, offset: usize, len: usize, limit: usize) -> Views<'_> {
        self.check(offset, len);
        Views::new(unsafe { self.data_ptr().add(offset) }, len, limit)
    }

    /// Materializes the full contents as an owned byte vector.
    ///
    /// # Errors
    ///
    /// `SizeTooLarge` if the buffer exceeds [`MAX_VIEW_LEN`] (the documented
    /// 2 GiB ceiling of the single-shot conversion; larger buffers go
    /// through [`Buffer::views`] or [`Buffer::write_to`]).
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        if self.len > MAX_VIEW_LEN {
            return Err(Error::size_too_large("to_vec", self.len as u64, MAX_VIEW_LEN as u64));
        }
        let mut out = vec![0u8; self.len];
        self.copy_to_slice(0, &mut out, 0, self.len);
        Ok(out)
    }
}

/// File and stream I/O.
impl Buffer {
    /// Writes the full contents to `dest` as a sequence of bounded chunks.
    pub fn write_to<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.write_chunks(dest, MAX_VIEW_LEN)
    }

    pub(crate) fn write_chunks<W: Write>(&self, dest: &mut W, limit: usize) -> std::io::Result<()> {
        for view in self.views_with_limit(0, self.len, limit) {
            dest.write_all(view.as_bytes())?;
        }
        Ok(())
    }

    /// Dumps the contents to a file as a raw byte sequence (no framing or
    /// metadata), creating or truncating it.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut file = std::fs::File::create(path)
            .map_err(|e| Error::io(path.display().to_string(), e))?;
        self.write_to(&mut file)
            .map_err(|e| Error::io(path.display().to_string(), e))?;
        file.sync_all()
            .map_err(|e| Error::io(path.display().to_string(), e))?;
        Ok(())
    }

    /// Allocates a buffer sized to the file and streams the file's bytes
    /// into it through a [`BufferSink`].
    ///
    /// # Errors
    ///
    /// `SizeTooLarge` if the file exceeds [`MAX_VIEW_LEN`] bytes (the
    /// documented single-buffer load ceiling); `Io` on any file error.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Buffer> {
        Self::load_from_with(Allocator::global(), path)
    }

    /// Like [`Buffer::load_from`], allocating from the given allocator.
    pub fn load_from_with(allocator: &Arc<Allocator>, path: impl AsRef<Path>) -> Result<Buffer> {
        let path = path.as_ref();
        let context = || path.display().to_string();
        let mut file = std::fs::File::open(path).map_err(|e| Error::io(context(), e))?;
        let file_len = file.metadata().map_err(|e| Error::io(context(), e))?.len();
        if file_len > MAX_VIEW_LEN as u64 {
            return Err(Error::size_too_large("load_from", file_len, MAX_VIEW_LEN as u64));
        }
        let buffer = Self::allocate_with(allocator, file_len as usize)?;
        let mut sink = BufferSink::new(&buffer);
        std::io::copy(&mut file, &mut sink).map_err(|e| Error::io(context(), e))?;
        log::debug!("loaded {file_len} bytes from '{}'", path.display());
        Ok(buffer)
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("address", &format_args!("{:#x}", self.address()))
            .field("offset", &self.offset)
            .field("len", &self.len)
            .finish()
    }
}
