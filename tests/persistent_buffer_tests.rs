//! Tests for the memory-mapped ring buffer through its public API

use sherlog_mmap_ring::{layout::HEADER_SIZE, MmapRingBuffer, RingConfig, RingError};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};

// Helper struct to manage temporary test directories
struct TestContext {
    _temp_dir: TempDir,   // Keep the TempDir alive for the test duration
    buffer_path: PathBuf, // Path to the buffer file
}

impl TestContext {
    fn new() -> Self {
        let temp_dir = tempdir().unwrap();
        let buffer_path = temp_dir.path().join("test_ring.mmap");

        Self {
            _temp_dir: temp_dir,
            buffer_path,
        }
    }
}

/// Test creating a new buffer file
#[test]
fn test_create_buffer() {
    let context = TestContext::new();

    let buffer = MmapRingBuffer::create(&context.buffer_path, 1024, true).unwrap();

    assert!(context.buffer_path.exists(), "Buffer file should exist");
    let metadata = fs::metadata(&context.buffer_path).unwrap();
    assert_eq!(metadata.len(), 1024, "File size should equal the capacity");

    assert_eq!(buffer.capacity(), 1024);
    assert_eq!(buffer.path(), context.buffer_path);
    assert_eq!(
        buffer.head_tail().unwrap(),
        (HEADER_SIZE, HEADER_SIZE),
        "Cursors should start at the data region"
    );

    // Header holds the two cursors, everything else is zeroed
    let bytes = fs::read(&context.buffer_path).unwrap();
    assert_eq!(&bytes[0..4], &8u32.to_le_bytes());
    assert_eq!(&bytes[4..8], &8u32.to_le_bytes());
    assert!(bytes[8..].iter().all(|&b| b == 0), "Data region should be zeroed");
}

/// Write then read a single message
#[test]
fn test_basic_write_read() {
    let context = TestContext::new();
    let buffer = MmapRingBuffer::create(&context.buffer_path, 1024, true).unwrap();

    let message = b"hello, ring buffer!";
    buffer.write_msg(message).unwrap();

    let read = buffer.read_msg().unwrap();
    assert_eq!(read, message, "Read message should match written message");
}

/// Reading an empty buffer reports BufferEmpty
#[test]
fn test_empty_buffer() {
    let context = TestContext::new();
    let buffer = MmapRingBuffer::create(&context.buffer_path, 1024, true).unwrap();

    let err = buffer.read_msg().unwrap_err();
    assert!(matches!(err, RingError::BufferEmpty), "Expected BufferEmpty, got {:?}", err);
    assert!(err.is_transient());
    assert_eq!(buffer.head_tail().unwrap(), (HEADER_SIZE, HEADER_SIZE), "Nothing should move");
}

/// Empty and oversized payloads are rejected
#[test]
fn test_invalid_size() {
    let context = TestContext::new();
    let buffer = MmapRingBuffer::create(&context.buffer_path, 1024, true).unwrap();

    let err = buffer.write_msg(&[]).unwrap_err();
    assert!(matches!(err, RingError::InvalidMessageSize { size: 0, .. }));

    let err = buffer.write_msg(&vec![0u8; 1024]).unwrap_err();
    assert!(matches!(err, RingError::InvalidMessageSize { size: 1024, .. }));

    assert_eq!(buffer.head_tail().unwrap(), (HEADER_SIZE, HEADER_SIZE));
}

/// A message at the maximum size round-trips, one byte more is rejected
#[test]
fn test_capacity_boundary() {
    let context = TestContext::new();
    let buffer = MmapRingBuffer::create(&context.buffer_path, 32, true).unwrap();

    let max = buffer.max_message_size();
    assert_eq!(max, 32 - 8 - 4 - 3 - 1);

    let max_msg: Vec<u8> = (0..max).map(|i| b'A' + (i % 26) as u8).collect();
    buffer.write_msg(&max_msg).unwrap();
    assert_eq!(buffer.read_msg().unwrap(), max_msg, "Max-size message should match");

    let too_big = vec![b'Z'; max + 1];
    let err = buffer.write_msg(&too_big).unwrap_err();
    assert!(matches!(err, RingError::InvalidMessageSize { .. }));
}

/// Filling a small buffer eventually reports BufferFull without corrupting data
#[test]
fn test_buffer_full() {
    let context = TestContext::new();
    let buffer = MmapRingBuffer::create(&context.buffer_path, 256, true).unwrap();

    let mut count = 0;
    loop {
        match buffer.write_msg(b"test") {
            Ok(()) => count += 1,
            Err(RingError::BufferFull { .. }) => break,
            Err(e) => panic!("Unexpected error while writing: {:?}", e),
        }
        assert!(count <= 100, "Buffer not getting full after 100 writes");
    }

    assert!(count > 0, "Buffer became full without any successful writes");
    assert_eq!(count, 30, "248-byte data region holds 30 eight-byte frames");

    let before = buffer.head_tail().unwrap();
    assert!(buffer.write_msg(b"test").is_err());
    assert_eq!(buffer.head_tail().unwrap(), before, "Rejected write must not mutate");

    for _ in 0..count {
        assert_eq!(buffer.read_msg().unwrap(), b"test");
    }
    assert!(matches!(buffer.read_msg(), Err(RingError::BufferEmpty)));
}

/// Messages come back in write order and the buffer drains to empty
#[test]
fn test_fifo_order() {
    let context = TestContext::new();
    let buffer = MmapRingBuffer::create(&context.buffer_path, 128, true).unwrap();

    let messages = [
        "first message",
        "second message is longer",
        "third",
        "fourth message",
        "fifth message to force wrap",
    ];

    for (i, msg) in messages.iter().enumerate() {
        buffer
            .write_msg(msg.as_bytes())
            .unwrap_or_else(|e| panic!("Failed to write message {}: {:?}", i, e));
    }

    for (i, expected) in messages.iter().enumerate() {
        let read = buffer.read_msg().unwrap();
        assert_eq!(read, expected.as_bytes(), "Message {} mismatch", i);
    }

    assert!(matches!(buffer.read_msg(), Err(RingError::BufferEmpty)));
}

/// Interleaved writes and reads push the cursors around the end many times
#[test]
fn test_wrap_around_integrity() {
    let context = TestContext::new();
    let buffer = MmapRingBuffer::create(&context.buffer_path, 128, true).unwrap();

    let mut pending = std::collections::VecDeque::new();
    let mut wraps = 0;
    let mut last_head = buffer.head_tail().unwrap().0;

    for i in 0..500usize {
        let len = 1 + (i * 7) % 40;
        let msg: Vec<u8> = (0..len).map(|j| (i + j) as u8).collect();

        loop {
            match buffer.write_msg(&msg) {
                Ok(()) => break,
                Err(RingError::BufferFull { .. }) => {
                    let expected: Vec<u8> = pending.pop_front().unwrap();
                    assert_eq!(buffer.read_msg().unwrap(), expected);
                }
                Err(e) => panic!("Unexpected error: {:?}", e),
            }
        }
        pending.push_back(msg);

        let head = buffer.head_tail().unwrap().0;
        if head < last_head {
            wraps += 1;
        }
        last_head = head;
    }

    while let Some(expected) = pending.pop_front() {
        assert_eq!(buffer.read_msg().unwrap(), expected);
    }

    assert!(wraps > 10, "Head should have wrapped repeatedly, got {}", wraps);
    assert!(matches!(buffer.read_msg(), Err(RingError::BufferEmpty)));
}

/// Mixed message sizes round-trip byte-exact
#[test]
fn test_mixed_sizes() {
    let context = TestContext::new();
    let buffer = MmapRingBuffer::create(&context.buffer_path, 1024, true).unwrap();

    let mut messages: Vec<Vec<u8>> = vec![
        b"a".to_vec(),
        b"hello".to_vec(),
        b"medium length message".to_vec(),
        vec![0; 100],
        b"short".to_vec(),
        vec![0; 200],
        b"final".to_vec(),
    ];
    for (i, msg) in messages.iter_mut().enumerate() {
        for (j, b) in msg.iter_mut().enumerate() {
            *b = b'0' + ((i + j) % 10) as u8;
        }
    }

    for msg in &messages {
        buffer.write_msg(msg).unwrap();
    }
    for (i, expected) in messages.iter().enumerate() {
        assert_eq!(&buffer.read_msg().unwrap(), expected, "Message {} mismatch", i);
    }
}

/// Contents survive close and reopen by path
#[test]
fn test_reopen_buffer() {
    let context = TestContext::new();

    let buffer = MmapRingBuffer::create(&context.buffer_path, 1024, true).unwrap();
    buffer.write_msg(b"persistent message").unwrap();
    let cursors = buffer.head_tail().unwrap();
    buffer.close().unwrap();

    let buffer = MmapRingBuffer::open(&context.buffer_path).unwrap();
    assert_eq!(buffer.capacity(), 1024, "Capacity should come from the file");
    assert_eq!(buffer.head_tail().unwrap(), cursors, "Cursors should persist");

    assert_eq!(buffer.read_msg().unwrap(), b"persistent message");
    assert!(matches!(buffer.read_msg(), Err(RingError::BufferEmpty)));
}

/// A partially consumed buffer keeps its reader position across reopen
#[test]
fn test_reopen_keeps_reader_position() {
    let context = TestContext::new();

    {
        let buffer = MmapRingBuffer::create(&context.buffer_path, 512, true).unwrap();
        for i in 0..5 {
            buffer.write_msg(format!("Open {}", i).as_bytes()).unwrap();
        }
        assert_eq!(buffer.read_msg().unwrap(), b"Open 0");
        assert_eq!(buffer.read_msg().unwrap(), b"Open 1");
        buffer.close().unwrap();
    }

    let buffer = MmapRingBuffer::open(&context.buffer_path).unwrap();
    for i in 2..5 {
        let expected = format!("Open {}", i);
        assert_eq!(buffer.read_msg().unwrap(), expected.as_bytes());
    }
}

/// Dropping without close still leaves the data in the file
#[test]
fn test_drop_without_close() {
    let context = TestContext::new();

    {
        let buffer = MmapRingBuffer::create(&context.buffer_path, 256, true).unwrap();
        buffer.write_msg(b"dropped").unwrap();
    }

    let buffer = MmapRingBuffer::open(&context.buffer_path).unwrap();
    assert_eq!(buffer.read_msg().unwrap(), b"dropped");
}

/// Creating without reset truncates and reinitializes an existing file
#[test]
fn test_create_over_existing() {
    let context = TestContext::new();

    {
        let buffer = MmapRingBuffer::create(&context.buffer_path, 2048, true).unwrap();
        buffer.write_msg(b"old data").unwrap();
        buffer.close().unwrap();
    }

    let buffer = MmapRingBuffer::create(&context.buffer_path, 512, false).unwrap();
    assert_eq!(fs::metadata(&context.buffer_path).unwrap().len(), 512);
    assert!(buffer.is_empty().unwrap());
    assert!(matches!(buffer.read_msg(), Err(RingError::BufferEmpty)));
}

/// Create rejects capacities that cannot hold a frame
#[test]
fn test_invalid_configuration() {
    let context = TestContext::new();

    let err = MmapRingBuffer::create(&context.buffer_path, 8, true).unwrap_err();
    assert!(matches!(err, RingError::InvalidConfiguration { .. }));
    assert!(!context.buffer_path.exists(), "No file should be created");
}

/// Opening a missing file fails with an I/O error
#[test]
fn test_open_missing_file() {
    let context = TestContext::new();

    let err = MmapRingBuffer::open(&context.buffer_path).unwrap_err();
    assert!(matches!(err, RingError::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound));
}

/// Opening files that are not ring buffers fails
#[test]
fn test_open_invalid_file() {
    let context = TestContext::new();

    // Too small to hold the header and a frame
    fs::write(&context.buffer_path, [0u8; 6]).unwrap();
    let err = MmapRingBuffer::open(&context.buffer_path).unwrap_err();
    assert!(matches!(err, RingError::InvalidBuffer { .. }));

    // Large enough but never initialized: cursors point into the header
    let mut file = OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(&context.buffer_path)
        .unwrap();
    file.write_all(&[0u8; 64]).unwrap();
    drop(file);

    let err = MmapRingBuffer::open(&context.buffer_path).unwrap_err();
    assert!(matches!(err, RingError::InvalidBuffer { .. }));
}

/// A corrupted length field is reported instead of read past the frame
#[test]
fn test_corrupted_length_field() {
    let context = TestContext::new();

    {
        let buffer = MmapRingBuffer::create(&context.buffer_path, 256, true).unwrap();
        buffer.write_msg(b"Good record").unwrap();
        buffer.close().unwrap();
    }

    // Claim the frame is longer than everything that was written
    let mut bytes = fs::read(&context.buffer_path).unwrap();
    bytes[8..12].copy_from_slice(&200u32.to_le_bytes());
    fs::write(&context.buffer_path, &bytes).unwrap();

    let buffer = MmapRingBuffer::open(&context.buffer_path).unwrap();
    let err = buffer.read_msg().unwrap_err();
    assert!(matches!(err, RingError::CorruptFrame { offset: 8, length: 200 }));
    assert!(!err.is_transient());
}

/// Every operation fails after close, including a second close
#[test]
fn test_use_after_close() {
    let context = TestContext::new();
    let buffer = MmapRingBuffer::create(&context.buffer_path, 256, true).unwrap();

    buffer.close().unwrap();

    assert!(matches!(buffer.write_msg(b"x"), Err(RingError::Closed)));
    assert!(matches!(buffer.read_msg(), Err(RingError::Closed)));
    assert!(matches!(buffer.close(), Err(RingError::Closed)));
    assert!(context.buffer_path.exists(), "Close must not delete the file");
}

/// Config flags are carried by the instance; open takes the capacity from the file
///
/// Durability of `sync_on_write` is not observable here: a plain read of the
/// file goes through the same page cache as the mapping.
#[test]
fn test_create_with_config() {
    let context = TestContext::new();
    let config = RingConfig::new(4096)
        .with_reset_existing(true)
        .with_sync_on_write(true);

    let buffer = MmapRingBuffer::create_with(&context.buffer_path, &config).unwrap();
    assert_eq!(buffer.config(), &config);

    for i in 0..10 {
        buffer.write_msg(format!("synced {}", i).as_bytes()).unwrap();
    }
    assert_eq!(buffer.write_count(), 10);
    assert_eq!(buffer.read_msg().unwrap(), b"synced 0");
    assert_eq!(buffer.read_count(), 1);
    buffer.close().unwrap();

    let open_config = RingConfig::new(64)
        .with_reset_existing(true)
        .with_sync_on_write(true);
    let reopened = MmapRingBuffer::open_with(&context.buffer_path, &open_config).unwrap();
    assert_eq!(reopened.config().capacity, 4096);
    assert!(!reopened.config().reset_existing);
    assert!(reopened.config().sync_on_write);
    assert_eq!(reopened.read_msg().unwrap(), b"synced 1");
}

/// Free and used byte accounting follows writes and reads
#[test]
fn test_space_accounting() {
    let context = TestContext::new();
    let buffer = MmapRingBuffer::create(&context.buffer_path, 128, true).unwrap();

    assert_eq!(buffer.used_bytes().unwrap(), 0);
    assert_eq!(buffer.free_bytes().unwrap(), 119);

    buffer.write_msg(&[1u8; 16]).unwrap();
    assert_eq!(buffer.used_bytes().unwrap(), 20);
    assert_eq!(buffer.free_bytes().unwrap(), 99);
    assert!(!buffer.is_empty().unwrap());

    buffer.read_msg().unwrap();
    assert_eq!(buffer.used_bytes().unwrap(), 0);
    assert!(buffer.is_empty().unwrap());
}
