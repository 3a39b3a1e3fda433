use std::sync::Arc;

use crate::{Allocator, HEADER_SIZE, Memory};

#[test]
fn test_allocate_basic() {
    let allocator = Arc::new(Allocator::new());
    let handle = allocator.allocate(100).expect("allocate");
    let memory = handle.memory();

    assert_eq!(memory.data_size(), 100);
    assert_eq!(memory.size(), 100 + HEADER_SIZE);
    assert_eq!(memory.address(), memory.header_address() + HEADER_SIZE);
    assert!(!memory.data_ptr().is_null());
    assert_eq!(allocator.allocated_size(), (100 + HEADER_SIZE) as u64);
}

#[test]
fn test_allocate_zero() {
    let allocator = Arc::new(Allocator::new());
    let handle = allocator.allocate(0).expect("allocate");
    let memory = handle.memory();

    assert_eq!(memory.address(), 0);
    assert_eq!(memory.header_address(), 0);
    assert_eq!(memory.size(), 0);
    assert_eq!(memory.data_size(), 0);
    assert_eq!(allocator.allocated_size(), 0);
}

#[test]
fn test_header_word_holds_data_size() {
    let allocator = Arc::new(Allocator::new());
    let handle = allocator.allocate(4096).expect("allocate");
    let header = handle.memory().header_address();

    let stored = unsafe { (header as *const u64).read() };
    assert_eq!(stored, 4096);
}

#[test]
fn test_rehydrate_from_bare_address() {
    let allocator = Arc::new(Allocator::new());
    let handle = allocator.allocate(256).expect("allocate");
    let header = handle.memory().header_address() as *mut u8;

    let rehydrated = unsafe { Memory::heap_from_header(header) };
    assert_eq!(rehydrated.data_size(), 256);
    assert_eq!(rehydrated.size(), 256 + HEADER_SIZE);
    assert_eq!(rehydrated.address(), handle.memory().address());
}

#[test]
fn test_drop_releases() {
    let allocator = Arc::new(Allocator::new());
    let baseline = allocator.allocated_size();

    let handle = allocator.allocate(1000).expect("allocate");
    assert!(allocator.allocated_size() > baseline);
    drop(handle);
    assert_eq!(allocator.allocated_size(), baseline);
}

#[test]
fn test_double_release_is_noop() {
    let allocator = Arc::new(Allocator::new());
    let handle = allocator.allocate(64).expect("allocate");
    let memory = *handle.memory();

    unsafe {
        allocator.release(&memory);
        allocator.release(&memory);
    }
    assert_eq!(allocator.allocated_size(), 0);

    // The handle's own drop is a third release; still a no-op.
    drop(handle);
    assert_eq!(allocator.allocated_size(), 0);
}

#[test]
fn test_release_of_unknown_address_is_noop() {
    let allocator = Arc::new(Allocator::new());
    let handle = allocator.allocate(64).expect("allocate");

    let bogus = Memory::mapped(0x1000 as *mut u8, 32);
    unsafe { allocator.release(&bogus) };
    assert_eq!(allocator.allocated_size(), (64 + HEADER_SIZE) as u64);
    drop(handle);
}

#[test]
fn test_concurrent_release_single_effect() {
    let allocator = Arc::new(Allocator::new());
    let handle = allocator.allocate(512).expect("allocate");
    let memory = *handle.memory();

    let threads: Vec<_> = (0..8)
        .map(|_| {
            let allocator = Arc::clone(&allocator);
            std::thread::spawn(move || unsafe { allocator.release(&memory) })
        })
        .collect();
    for t in threads {
        t.join().expect("join");
    }

    assert_eq!(allocator.allocated_size(), 0);
    assert!(!allocator.is_registered(memory.header_address()));
    drop(handle);
}

#[test]
fn test_concurrent_allocate_release() {
    let allocator = Arc::new(Allocator::new());
    let threads: Vec<_> = (0..4)
        .map(|_| {
            let allocator = Arc::clone(&allocator);
            std::thread::spawn(move || {
                for i in 1..100usize {
                    let handle = allocator.allocate(i * 16).expect("allocate");
                    assert_eq!(handle.memory().data_size(), i * 16);
                }
            })
        })
        .collect();
    for t in threads {
        t.join().expect("join");
    }
    assert_eq!(allocator.allocated_size(), 0);
}

#[test]
fn test_release_all() {
    let allocator = Arc::new(Allocator::new());
    let handles: Vec<_> = (0..5)
        .map(|i| allocator.allocate(100 * (i + 1)).expect("allocate"))
        .collect();
    assert!(allocator.allocated_size() > 0);

    allocator.release_all();
    assert_eq!(allocator.allocated_size(), 0);

    // Handle drops after the bulk release find nothing to do.
    drop(handles);
    assert_eq!(allocator.allocated_size(), 0);
}

#[test]
fn test_mapped_memory_accessors() {
    let allocator = Arc::new(Allocator::new());

    // A mapped Memory has no header: header and data addresses coincide and
    // the length lives in the value. Borrow a heap region's address so no
    // actual OS mapping is needed.
    let probe = allocator.allocate(4096).expect("allocate");
    let mapped = Memory::mapped(probe.memory().header_address() as *mut u8, 64);
    assert_eq!(mapped.header_address(), mapped.address());
    assert_eq!(mapped.size(), 64);
    assert_eq!(mapped.data_size(), 64);
}

#[test]
fn test_global_allocator_roundtrip() {
    let allocator = Allocator::global();
    let baseline = allocator.allocated_size();

    let handle = allocator.allocate(128).expect("allocate");
    assert_eq!(
        allocator.allocated_size(),
        baseline + (128 + HEADER_SIZE) as u64
    );
    drop(handle);
    assert_eq!(allocator.allocated_size(), baseline);
}
