//! Thin OS syscall layer for file-backed memory mappings.
//!
//! Everything here is a direct wrapper over the platform primitives
//! (`mmap`/`munmap`/`msync`/`madvise` on Unix, the file-mapping APIs on
//! Windows). Higher layers own lifetime and registration concerns; this crate
//! only translates calls and reports `std::io::Error` on failure.

#[cfg_attr(unix, path = "mmap_unix.rs")]
#[cfg_attr(windows, path = "mmap_win.rs")]
#[cfg_attr(not(any(unix, windows)), path = "mmap_fallback.rs")]
pub mod mmap;


/// Access mode of a file-backed mapping.
///
/// `Private` maps the file copy-on-write: stores are visible through the
/// mapping but are never written back to the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapMode {
    ReadOnly,
    ReadWrite,
    Private,
}

impl MapMode {
    /// Returns `true` if stores through the mapping are permitted.
    pub fn is_writable(&self) -> bool {
        !matches!(self, MapMode::ReadOnly)
    }
}
