//! Stub implementation for platforms without file-mapping support.

use crate::MapMode;

fn unsupported<T>() -> std::io::Result<T> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "file-backed memory mapping is not supported on this platform",
    ))
}

pub fn map_file(
    _fd: i32,
    _mode: MapMode,
    _offset: u64,
    _len: usize,
) -> std::io::Result<*mut u8> {
    unsupported()
}

pub unsafe fn unmap(_ptr: *mut u8, _len: usize) -> std::io::Result<()> {
    unsupported()
}

pub fn sync(_ptr: *mut u8, _len: usize) -> std::io::Result<()> {
    unsupported()
}

pub fn advise_willneed(_ptr: *const u8, _len: usize) -> std::io::Result<()> {
    unsupported()
}

pub fn get_page_size() -> usize {
    4 * 1024
}
