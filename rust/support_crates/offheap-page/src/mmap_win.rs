use std::sync::OnceLock;

use windows_sys::Win32::{
    Foundation::{CloseHandle, GetLastError, HANDLE},
    System::{
        Memory::{
            CreateFileMappingW, FILE_MAP_COPY, FILE_MAP_READ, FILE_MAP_WRITE, FlushViewOfFile,
            MapViewOfFile, PAGE_READONLY, PAGE_READWRITE, PAGE_WRITECOPY, PrefetchVirtualMemory,
            UnmapViewOfFile, WIN32_MEMORY_RANGE_ENTRY,
        },
        SystemInformation::{GetSystemInfo, SYSTEM_INFO},
        Threading::GetCurrentProcess,
    },
};

use crate::MapMode;

/// Maps a region of an open file into the address space.
///
/// A file-mapping object sized to cover `offset + len` is created, the view is
/// mapped, and the mapping object handle is closed immediately; the view keeps
/// the mapping alive until [`unmap`].
///
/// # Arguments
///
/// * `file` - Raw handle of the open file.
/// * `mode` - Mapping access mode.
/// * `offset` - Byte offset within the file where the view starts. Must be a
///   multiple of [`get_page_size`] (the allocation granularity).
/// * `len` - Length of the view in bytes.
pub fn map_file(file: HANDLE, mode: MapMode, offset: u64, len: usize) -> std::io::Result<*mut u8> {
    let (protect, access) = match mode {
        MapMode::ReadOnly => (PAGE_READONLY, FILE_MAP_READ),
        MapMode::ReadWrite => (PAGE_READWRITE, FILE_MAP_READ | FILE_MAP_WRITE),
        MapMode::Private => (PAGE_WRITECOPY, FILE_MAP_COPY),
    };
    let max_size = offset + len as u64;
    unsafe {
        let mapping = CreateFileMappingW(
            file,
            std::ptr::null(),
            protect,
            (max_size >> 32) as u32,
            max_size as u32,
            std::ptr::null(),
        );
        if mapping.is_null() {
            return Err(std::io::Error::from_raw_os_error(GetLastError() as i32));
        }

        let ptr = MapViewOfFile(
            mapping,
            access,
            (offset >> 32) as u32,
            offset as u32,
            len,
        );
        // The view holds its own reference to the mapping object.
        CloseHandle(mapping);

        if ptr.Value.is_null() {
            return Err(std::io::Error::from_raw_os_error(GetLastError() as i32));
        }
        Ok(ptr.Value as *mut u8)
    }
}

/// Removes a view established by [`map_file`].
///
/// # Safety
///
/// `ptr` must be the address returned by [`map_file`]. The region must not be
/// accessed afterwards.
pub unsafe fn unmap(ptr: *mut u8, _len: usize) -> std::io::Result<()> {
    unsafe {
        let view = windows_sys::Win32::System::Memory::MEMORY_MAPPED_VIEW_ADDRESS {
            Value: ptr as *mut std::ffi::c_void,
        };
        if UnmapViewOfFile(view) == 0 {
            return Err(std::io::Error::from_raw_os_error(GetLastError() as i32));
        }
    }
    Ok(())
}

/// Synchronously writes modified pages of the view back to the file.
///
/// `FlushViewOfFile` only schedules the dirty pages; callers that need the
/// data on durable storage must also flush the file handle.
pub fn sync(ptr: *mut u8, len: usize) -> std::io::Result<()> {
    unsafe {
        if FlushViewOfFile(ptr as *const std::ffi::c_void, len) == 0 {
            return Err(std::io::Error::from_raw_os_error(GetLastError() as i32));
        }
    }
    Ok(())
}

/// Advises the OS to page in `[ptr, ptr + len)` ahead of access.
///
/// This is a hint: success means the request was issued, not that the pages
/// are resident.
pub fn advise_willneed(ptr: *const u8, len: usize) -> std::io::Result<()> {
    let entry = WIN32_MEMORY_RANGE_ENTRY {
        VirtualAddress: ptr as *mut std::ffi::c_void,
        NumberOfBytes: len,
    };
    unsafe {
        if PrefetchVirtualMemory(GetCurrentProcess(), 1, &entry, 0) == 0 {
            return Err(std::io::Error::from_raw_os_error(GetLastError() as i32));
        }
    }
    Ok(())
}

/// Gets the mapping alignment granule in bytes.
///
/// On Windows, view offsets must align to the allocation granularity
/// (typically 64KB), which is larger than the CPU page size. The result is
/// cached after the first call.
pub fn get_page_size() -> usize {
    static SIZE: OnceLock<usize> = OnceLock::new();

    *SIZE.get_or_init(|| unsafe {
        let mut system_info: SYSTEM_INFO = std::mem::zeroed();
        GetSystemInfo(&mut system_info);
        system_info.dwAllocationGranularity as usize
    })
}
