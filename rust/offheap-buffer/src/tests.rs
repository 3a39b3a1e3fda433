use std::io::Write;

use offheap_alloc::Allocator;
use offheap_common::error::ErrorKind;

use crate::{Buffer, BufferSink, MAX_VIEW_LEN};

fn local_buffer(size: usize) -> Buffer {
    let allocator = std::sync::Arc::new(Allocator::new());
    Buffer::allocate_with(&allocator, size).expect("allocate")
}

#[test]
fn test_scalar_roundtrip_extremes() {
    let buf = local_buffer(128);

    buf.put_u8(0, u8::MAX);
    buf.put_i8(1, i8::MIN);
    buf.put_u16(2, u16::MAX);
    buf.put_i16(4, i16::MIN);
    buf.put_u32(8, u32::MAX);
    buf.put_i32(12, i32::MIN);
    buf.put_u64(16, u64::MAX);
    buf.put_i64(24, i64::MIN);
    buf.put_f32(32, f32::MIN_POSITIVE);
    buf.put_f64(40, f64::MAX);

    assert_eq!(buf.get_u8(0), u8::MAX);
    assert_eq!(buf.get_i8(1), i8::MIN);
    assert_eq!(buf.get_u16(2), u16::MAX);
    assert_eq!(buf.get_i16(4), i16::MIN);
    assert_eq!(buf.get_u32(8), u32::MAX);
    assert_eq!(buf.get_i32(12), i32::MIN);
    assert_eq!(buf.get_u64(16), u64::MAX);
    assert_eq!(buf.get_i64(24), i64::MIN);
    assert_eq!(buf.get_f32(32), f32::MIN_POSITIVE);
    assert_eq!(buf.get_f64(40), f64::MAX);
}

#[test]
fn test_unaligned_access() {
    let buf = local_buffer(64);
    // Deliberately odd offsets; access has no alignment requirement.
    buf.put_u64(3, 0x0123_4567_89ab_cdef);
    buf.put_u32(13, 0xdead_beef);
    assert_eq!(buf.get_u64(3), 0x0123_4567_89ab_cdef);
    assert_eq!(buf.get_u32(13), 0xdead_beef);
}

#[test]
fn test_put_straddles_native_byte_order() {
    let buf = local_buffer(8);
    buf.put_u32(0, 0x0403_0201);
    let bytes: [u8; 4] = std::array::from_fn(|i| buf.get_u8(i));
    assert_eq!(bytes, 0x0403_0201u32.to_ne_bytes());
}

#[test]
#[should_panic]
fn test_get_out_of_bounds_panics() {
    let buf = local_buffer(8);
    buf.get_u64(1);
}

#[test]
fn test_fill_and_clear() {
    let buf = local_buffer(256);
    buf.fill(0, 256, 0x5a);
    assert_eq!(buf.get_u8(0), 0x5a);
    assert_eq!(buf.get_u8(255), 0x5a);

    buf.fill(10, 20, 0xff);
    assert_eq!(buf.get_u8(9), 0x5a);
    assert_eq!(buf.get_u8(10), 0xff);
    assert_eq!(buf.get_u8(29), 0xff);
    assert_eq!(buf.get_u8(30), 0x5a);

    buf.clear();
    for i in 0..256 {
        assert_eq!(buf.get_u8(i), 0);
    }
}

#[test]
fn test_copy_between_buffers() {
    let src = local_buffer(100);
    let dest = local_buffer(100);
    for i in 0..100 {
        src.put_u8(i, i as u8);
    }
    dest.clear();

    src.copy_to_buffer(20, &dest, 50, 30);
    for i in 0..30 {
        assert_eq!(dest.get_u8(50 + i), (20 + i) as u8);
    }
    assert_eq!(dest.get_u8(49), 0);
    assert_eq!(dest.get_u8(80), 0);
}

#[test]
fn test_overlapping_copy_within_one_buffer() {
    let buf = local_buffer(64);
    for i in 0..64 {
        buf.put_u8(i, i as u8);
    }

    // Forward-overlapping range; memmove semantics preserve the source bytes.
    buf.copy_to_buffer(0, &buf, 8, 32);
    for i in 0..32 {
        assert_eq!(buf.get_u8(8 + i), i as u8);
    }
}

#[test]
fn test_copy_to_slice() {
    let buf = local_buffer(50);
    for i in 0..50 {
        buf.put_u8(i, (i * 3) as u8);
    }

    let mut out = [0u8; 20];
    buf.copy_to_slice(5, &mut out, 2, 15);
    assert_eq!(out[0], 0);
    assert_eq!(out[1], 0);
    for i in 0..15 {
        assert_eq!(out[2 + i], ((5 + i) * 3) as u8);
    }
    assert_eq!(out[17], 0);
}

#[test]
fn test_read_from_clamps_to_both_sides() {
    let buf = local_buffer(10);
    buf.clear();
    let src = [1u8, 2, 3, 4, 5];

    // Clamped by the destination: only 3 bytes fit from offset 7.
    assert_eq!(buf.read_from(&src, 0, 7, 5), 3);
    assert_eq!(buf.get_u8(7), 1);
    assert_eq!(buf.get_u8(9), 3);

    // Clamped by the source: only 2 bytes remain past src offset 3.
    assert_eq!(buf.read_from(&src, 3, 0, 5), 2);
    assert_eq!(buf.get_u8(0), 4);
    assert_eq!(buf.get_u8(1), 5);

    // Fully out of range on either side copies nothing.
    assert_eq!(buf.read_from(&src, 9, 0, 5), 0);
    assert_eq!(buf.read_from(&src, 0, 10, 5), 0);
}

#[test]
fn test_read_from_exact_rejects_overflow() {
    let buf = local_buffer(8);
    assert_eq!(buf.read_from_exact(&[1, 2, 3, 4], 4).expect("fits"), 4);

    let err = buf.read_from_exact(&[1, 2, 3, 4], 5).expect_err("overflow");
    assert!(matches!(err.kind(), ErrorKind::InvalidRange { .. }));
}

#[test]
fn test_slice_is_independent() {
    let buf = local_buffer(40);
    for i in 0..40 {
        buf.put_u8(i, i as u8);
    }

    let slice = buf.slice(10, 20).expect("slice");
    assert_eq!(slice.len(), 10);
    for i in 0..10 {
        assert_eq!(slice.get_u8(i), (10 + i) as u8);
    }

    slice.put_u8(0, 0xee);
    assert_eq!(buf.get_u8(10), 10);
    buf.put_u8(11, 0x77);
    assert_eq!(slice.get_u8(1), 11);
}

#[test]
fn test_view_shares_memory() {
    let buf = local_buffer(40);
    buf.clear();

    let view = buf.view(10, 30).expect("view");
    assert_eq!(view.len(), 20);
    assert_eq!(view.address(), buf.address() + 10);

    view.put_u8(0, 0xaa);
    assert_eq!(buf.get_u8(10), 0xaa);
    buf.put_u8(29, 0xbb);
    assert_eq!(view.get_u8(19), 0xbb);
}

#[test]
fn test_view_of_view_composes_offsets() {
    let buf = local_buffer(100);
    buf.clear();

    let outer = buf.view(10, 90).expect("view");
    let inner = outer.view(5, 25).expect("view");
    assert_eq!(inner.len(), 20);
    assert_eq!(inner.address(), buf.address() + 15);

    inner.put_u8(0, 0x42);
    assert_eq!(buf.get_u8(15), 0x42);
}

#[test]
fn test_view_keeps_allocation_alive() {
    let allocator = std::sync::Arc::new(Allocator::new());
    let buf = Buffer::allocate_with(&allocator, 64).expect("allocate");
    buf.put_u64(0, 0x1122_3344_5566_7788);

    let view = buf.view(0, 64).expect("view");
    drop(buf);
    assert!(allocator.allocated_size() > 0);
    assert_eq!(view.get_u64(0), 0x1122_3344_5566_7788);

    drop(view);
    assert_eq!(allocator.allocated_size(), 0);
}

#[test]
fn test_invalid_ranges_rejected() {
    let buf = local_buffer(16);
    assert!(buf.slice(10, 5).is_err());
    assert!(buf.slice(0, 17).is_err());
    assert!(buf.view(10, 5).is_err());
    assert!(buf.view(0, 17).is_err());
    assert!(buf.view(16, 16).is_ok());
}

#[test]
fn test_views_decomposition() {
    let buf = local_buffer(100);
    for i in 0..100 {
        buf.put_u8(i, i as u8);
    }

    // Chunk ceiling of 32 splits 100 bytes into 32+32+32+4.
    let views: Vec<_> = buf.views_with_limit(0, 100, 32).collect();
    assert_eq!(views.len(), 4);
    assert_eq!(
        views.iter().map(|v| v.len()).collect::<Vec<_>>(),
        [32, 32, 32, 4]
    );

    let mut expected = 0u8;
    for view in &views {
        for &b in view.as_bytes() {
            assert_eq!(b, expected);
            expected = expected.wrapping_add(1);
        }
    }
}

#[test]
fn test_views_single_chunk_and_empty() {
    let buf = local_buffer(100);
    let views: Vec<_> = buf.views().collect();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].len(), 100);

    let empty = local_buffer(0);
    assert_eq!(empty.views().count(), 0);
}

#[test]
fn test_view_at_limit() {
    let buf = local_buffer(16);
    let view = buf.view_at(4, 8).expect("view_at");
    assert_eq!(view.len(), 8);

    let err = buf.view_at(0, MAX_VIEW_LEN + 1).expect_err("too large");
    assert!(matches!(err.kind(), ErrorKind::SizeTooLarge { .. }));

    // An out-of-range window is an error, like slice/view, not a panic.
    let err = buf.view_at(12, 8).expect_err("out of range");
    assert!(matches!(err.kind(), ErrorKind::InvalidRange { .. }));
    let err = buf.view_at(17, 0).expect_err("offset past end");
    assert!(matches!(err.kind(), ErrorKind::InvalidRange { .. }));
}

#[test]
fn test_to_vec_roundtrip() {
    let buf = local_buffer(300);
    for i in 0..300 {
        buf.put_u8(i, (i % 251) as u8);
    }
    let bytes = buf.to_vec().expect("to_vec");
    assert_eq!(bytes.len(), 300);
    for (i, &b) in bytes.iter().enumerate() {
        assert_eq!(b, (i % 251) as u8);
    }
}

#[test]
fn test_write_to_crosses_chunk_boundaries() {
    let buf = local_buffer(1000);
    let mut data = vec![0u8; 1000];
    fastrand::seed(7);
    for b in &mut data {
        *b = fastrand::u8(..);
    }
    buf.read_from_slice(&data, 0);

    // A 64-byte ceiling forces many chunks through the same path the
    // full-size ceiling uses for multi-gigabyte buffers.
    let mut out = Vec::new();
    buf.write_chunks(&mut out, 64).expect("write");
    assert_eq!(out, data);
}

#[test]
fn test_file_roundtrip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("buffer.bin");

    let buf = local_buffer(4096);
    fastrand::seed(42);
    for i in 0..4096 {
        buf.put_u8(i, fastrand::u8(..));
    }
    buf.write_to_file(&path).expect("write_to_file");
    assert_eq!(
        std::fs::metadata(&path).expect("metadata").len(),
        4096,
        "raw dump has no framing"
    );

    let allocator = std::sync::Arc::new(Allocator::new());
    let loaded = Buffer::load_from_with(&allocator, &path).expect("load_from");
    assert_eq!(loaded.len(), 4096);
    for i in 0..4096 {
        assert_eq!(loaded.get_u8(i), buf.get_u8(i));
    }
}

#[test]
fn test_load_from_missing_file() {
    let err = Buffer::load_from("/nonexistent/no-such-file").expect_err("missing");
    assert!(matches!(err.kind(), ErrorKind::Io { .. }));
}

#[test]
fn test_zero_length_buffer() {
    let buf = local_buffer(0);
    assert!(buf.is_empty());
    assert_eq!(buf.len(), 0);
    buf.clear();
    assert_eq!(buf.read_from_slice(&[1, 2, 3], 0), 0);
    assert_eq!(buf.to_vec().expect("to_vec"), Vec::<u8>::new());
}

#[test]
fn test_release_returns_memory() {
    let allocator = std::sync::Arc::new(Allocator::new());
    let buf = Buffer::allocate_with(&allocator, 128).expect("allocate");
    assert!(allocator.allocated_size() > 0);
    buf.release();
    assert_eq!(allocator.allocated_size(), 0);
}

#[test]
fn test_sink_basic() {
    let buf = local_buffer(32);
    buf.clear();

    let mut sink = BufferSink::new(&buf);
    sink.write_all(&[1, 2, 3, 4]).expect("write");
    sink.write_all(&[5, 6]).expect("write");
    assert_eq!(sink.position(), 6);
    assert_eq!(sink.remaining(), 26);

    for i in 0..6 {
        assert_eq!(buf.get_u8(i), (i + 1) as u8);
    }
    assert_eq!(buf.get_u8(6), 0);
}

#[test]
fn test_sink_clamps_at_capacity() {
    let buf = local_buffer(4);
    buf.clear();

    // A write larger than the buffer reports the stored count, not the
    // input length.
    let mut sink = BufferSink::new(&buf);
    assert_eq!(sink.write(&[1, 2, 3, 4, 5, 6]).expect("write"), 4);
    assert_eq!(sink.position(), 4);
    assert_eq!(sink.remaining(), 0);
    assert_eq!(sink.write(&[7]).expect("write"), 0);
    assert_eq!(sink.position(), 4);

    assert_eq!(buf.get_u8(0), 1);
    assert_eq!(buf.get_u8(3), 4);

    // A full sink surfaces as WriteZero instead of discarding input.
    let err = sink.write_all(&[8]).expect_err("full sink");
    assert_eq!(err.kind(), std::io::ErrorKind::WriteZero);
}

#[test]
fn test_sink_partial_write_at_boundary() {
    let buf = local_buffer(4);
    buf.clear();

    let mut sink = BufferSink::new(&buf);
    assert_eq!(sink.write(&[1, 2, 3]).expect("write"), 3);
    // One byte of capacity left; only that byte is consumed.
    assert_eq!(sink.write(&[4, 5, 6]).expect("write"), 1);
    assert_eq!(sink.position(), 4);
    assert_eq!(buf.get_u8(3), 4);
}

#[test]
fn test_sink_at_position() {
    let buf = local_buffer(16);
    buf.clear();

    let mut sink = BufferSink::at(&buf, 8);
    sink.write_all(&[0xaa, 0xbb]).expect("write");
    assert_eq!(sink.position(), 10);
    assert_eq!(buf.get_u8(7), 0);
    assert_eq!(buf.get_u8(8), 0xaa);
    assert_eq!(buf.get_u8(9), 0xbb);
}

#[test]
fn test_sink_with_io_copy() {
    let data: Vec<u8> = (0..200u8).collect();
    let buf = local_buffer(200);

    let mut sink = BufferSink::new(&buf);
    std::io::copy(&mut &data[..], &mut sink).expect("copy");
    assert_eq!(sink.position(), 200);
    for (i, &b) in data.iter().enumerate() {
        assert_eq!(buf.get_u8(i), b);
    }
}
