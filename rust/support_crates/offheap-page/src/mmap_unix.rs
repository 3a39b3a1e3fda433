use std::os::fd::RawFd;
use std::sync::OnceLock;

use crate::MapMode;

/// Maps a region of an open file into the address space.
///
/// # Arguments
///
/// * `fd` - Raw descriptor of the open file.
/// * `mode` - Mapping access mode. `ReadOnly` and `ReadWrite` produce a shared
///   mapping; `Private` produces a copy-on-write mapping.
/// * `offset` - Byte offset within the file where the mapping starts. Must be
///   a multiple of [`get_page_size`].
/// * `len` - Length of the mapping in bytes.
///
/// # Returns
///
/// A pointer to the start of the mapped region. The region must be released
/// with [`unmap`] using the same length.
///
/// # Errors
///
/// Returns the OS error if the mapping cannot be established, e.g. when the
/// offset is not page-aligned or the file is not open with compatible access.
pub fn map_file(fd: RawFd, mode: MapMode, offset: u64, len: usize) -> std::io::Result<*mut u8> {
    let (prot, flags) = match mode {
        MapMode::ReadOnly => (libc::PROT_READ, libc::MAP_SHARED),
        MapMode::ReadWrite => (libc::PROT_READ | libc::PROT_WRITE, libc::MAP_SHARED),
        MapMode::Private => (libc::PROT_READ | libc::PROT_WRITE, libc::MAP_PRIVATE),
    };
    let ptr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            len.max(1),
            prot,
            flags,
            fd,
            offset as libc::off_t,
        )
    };
    if ptr.is_null() || ptr == libc::MAP_FAILED {
        return Err(std::io::Error::last_os_error());
    }
    Ok(ptr as *mut u8)
}

/// Removes a mapping established by [`map_file`].
///
/// # Safety
///
/// `ptr` must be the address returned by [`map_file`] and `len` the length it
/// was mapped with. The region must not be accessed afterwards.
pub unsafe fn unmap(ptr: *mut u8, len: usize) -> std::io::Result<()> {
    let res = unsafe { libc::munmap(ptr as *mut std::ffi::c_void, len.max(1)) };
    if res < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

/// Synchronously writes modified pages of the mapping back to the file.
///
/// `ptr` must be the page-aligned start of the mapping (the address returned
/// by [`map_file`], not an interior pointer).
pub fn sync(ptr: *mut u8, len: usize) -> std::io::Result<()> {
    let res = unsafe { libc::msync(ptr as *mut std::ffi::c_void, len, libc::MS_SYNC) };
    if res < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

/// Advises the OS to page in `[ptr, ptr + len)` ahead of access.
///
/// The start address is rounded down to a page boundary, as required by
/// `madvise`. This is a hint: success means the request was issued, not that
/// the pages are resident.
pub fn advise_willneed(ptr: *const u8, len: usize) -> std::io::Result<()> {
    let page_size = get_page_size();
    let addr = ptr as usize;
    let aligned = addr & !(page_size - 1);
    let len = len + (addr - aligned);
    let res = unsafe {
        libc::madvise(
            aligned as *mut std::ffi::c_void,
            len,
            libc::MADV_WILLNEED,
        )
    };
    if res < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

/// Gets the system's page size in bytes.
///
/// File mapping offsets must be aligned to this value. The result is cached
/// after the first call. If the size cannot be determined, a default of 4KB
/// is returned.
pub fn get_page_size() -> usize {
    static SIZE: OnceLock<usize> = OnceLock::new();
    if let Some(&size) = SIZE.get() {
        size
    } else {
        match read_page_size() {
            Ok(size) => {
                let _ = SIZE.set(size);
                size
            }
            Err(_) => 4 * 1024,
        }
    }
}

fn read_page_size() -> std::io::Result<usize> {
    let res = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if res < 0 {
        return Err(std::io::Error::last_os_error());
    }
    assert!(res < i32::MAX as _);
    Ok(res as usize)
}
