use std::fs::{File, OpenOptions};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use offheap_alloc::{Allocator, Memory};
use offheap_buffer::Buffer;
use offheap_common::{Result, error::Error};
use offheap_page::{MapMode, mmap};

/// A byte range of a file mapped into the address space, accessible through
/// the [`Buffer`] API.
///
/// The requested file offset does not have to be page-aligned: the mapping is
/// established at the closest aligned offset at or below it, and the buffer
/// window starts at the corresponding interior position, so offset 0 of the
/// buffer is exactly the requested file offset.
///
/// In `ReadWrite` mode the file is created if missing and extended if shorter
/// than the requested range. Stores through the buffer become visible to the
/// file lazily; call [`MappedBuffer::flush`] to force them to durable storage.
/// In `Private` mode stores stay in process-local copy-on-write pages and are
/// never written back. Stores require a writable mode: a `ReadOnly` mapping's
/// pages are not writable, so its buffer is marked read-only — debug builds
/// reject stores with a panic, release builds fault on the memory access.
///
/// The mapping is registered with an [`Allocator`] like any heap allocation
/// and is unmapped when the last buffer sharing it is dropped.
pub struct MappedBuffer {
    buffer: Buffer,
    file: File,
    mode: MapMode,
    path: PathBuf,
}

impl MappedBuffer {
    /// Maps the whole file at `path`.
    pub fn open(path: impl AsRef<Path>, mode: MapMode) -> Result<MappedBuffer> {
        let path = path.as_ref();
        let size = std::fs::metadata(path)
            .map_err(|e| Error::mapping(path, e))?
            .len();
        Self::open_range(path, mode, 0, size as usize)
    }

    /// Maps `size` bytes of the file at `path`, starting at byte `offset`,
    /// registering the mapping with the process-wide allocator.
    pub fn open_range(
        path: impl AsRef<Path>,
        mode: MapMode,
        offset: u64,
        size: usize,
    ) -> Result<MappedBuffer> {
        Self::open_range_with(Allocator::global(), path, mode, offset, size)
    }

    /// Like [`MappedBuffer::open_range`], registering with the given
    /// allocator.
    pub fn open_range_with(
        allocator: &Arc<Allocator>,
        path: impl AsRef<Path>,
        mode: MapMode,
        offset: u64,
        size: usize,
    ) -> Result<MappedBuffer> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(mode.is_writable())
            .create(mode == MapMode::ReadWrite)
            .open(path)
            .map_err(|e| Error::mapping(path, e))?;

        // A shorter file is grown to cover the range; mapping past EOF is not
        // portable. Read-only and private mappings leave the file untouched
        // and fail in map_file if the range does not exist.
        let end = offset + size as u64;
        if mode == MapMode::ReadWrite {
            let file_len = file.metadata().map_err(|e| Error::mapping(path, e))?.len();
            if file_len < end {
                file.set_len(end).map_err(|e| Error::mapping(path, e))?;
            }
        }

        // Mapping offsets must align to the page granule. Map from the
        // aligned offset below the requested one and expose the interior
        // window starting at the remainder.
        let granule = mmap::get_page_size() as u64;
        let page_offset = (offset % granule) as usize;
        let raw = mmap::map_file(raw_handle(&file), mode, offset - page_offset as u64, size + page_offset)
            .map_err(|e| Error::mapping(path, e))?;

        let handle = allocator.register(Memory::mapped(raw, size + page_offset));
        let mut buffer = Buffer::from_handle_at(handle, page_offset, size);
        if !mode.is_writable() {
            buffer = buffer.into_read_only();
        }
        log::debug!(
            "mapped {size} bytes of '{}' at offset {offset} ({:?})",
            path.display(),
            mode
        );
        Ok(MappedBuffer {
            buffer,
            file,
            mode,
            path: path.to_path_buf(),
        })
    }

    /// The buffer over the mapped range. `MappedBuffer` also derefs to it.
    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    /// Access mode the mapping was established with.
    pub fn mode(&self) -> MapMode {
        self.mode
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Synchronously writes modified pages back to the file.
    ///
    /// No-op for mappings that cannot dirty the file. The view sync alone
    /// does not cover file metadata (and on Windows only schedules the
    /// writes), so the backing file is synced as well.
    pub fn flush(&self) -> Result<()> {
        if self.mode != MapMode::ReadWrite {
            return Ok(());
        }
        let memory = self.buffer.memory();
        // Sync wants the page-aligned mapping start, not the window start.
        mmap::sync(memory.header_address() as *mut u8, memory.size())
            .map_err(|e| Error::io(self.path.display().to_string(), e))?;
        self.file
            .sync_all()
            .map_err(|e| Error::io(self.path.display().to_string(), e))?;
        Ok(())
    }

    /// Hints the OS to page in `[offset, offset + len)` of the mapped range
    /// ahead of access. Returns whether the hint was accepted; a `false`
    /// result (including out-of-range arguments) has no effect on
    /// correctness.
    pub fn prefetch(&self, offset: usize, len: usize) -> bool {
        let in_range = offset
            .checked_add(len)
            .is_some_and(|end| end <= self.buffer.len());
        if !in_range {
            return false;
        }
        let ptr = (self.buffer.address() + offset) as *const u8;
        mmap::advise_willneed(ptr, len).is_ok()
    }

    /// Flushes modified pages and drops this handle on the mapping. The
    /// mapping itself is unmapped once no view of the buffer remains.
    pub fn close(self) -> Result<()> {
        self.flush()
    }
}

impl Deref for MappedBuffer {
    type Target = Buffer;

    fn deref(&self) -> &Buffer {
        &self.buffer
    }
}

impl std::fmt::Debug for MappedBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedBuffer")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .field("len", &self.buffer.len())
            .finish()
    }
}

#[cfg(unix)]
fn raw_handle(file: &File) -> std::os::fd::RawFd {
    use std::os::fd::AsRawFd;
    file.as_raw_fd()
}

#[cfg(windows)]
fn raw_handle(file: &File) -> std::os::windows::io::RawHandle {
    use std::os::windows::io::AsRawHandle;
    file.as_raw_handle()
}

#[cfg(not(any(unix, windows)))]
fn raw_handle(_file: &File) -> i32 {
    -1
}
