//! Basic usage example for the sherlog mmap ring
//!
//! This example demonstrates:
//! 1. Creating a file-backed ring buffer
//! 2. Writing messages from multiple threads concurrently
//! 3. Draining them from a reader thread with caller-driven backoff
//! 4. Closing, reopening by path and reading what was left behind
//!
//! Run with `RUST_LOG=debug` to see lifecycle logging.

use sherlog_mmap_ring::{MmapRingBuffer, RingConfig, RingError};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() -> Result<(), RingError> {
    env_logger::init();

    let path = std::env::temp_dir().join("sherlog_mmap_ring_example.mmap");
    println!("Using ring buffer file at: {:?}", path);

    let config = RingConfig::new(64 * 1024).with_reset_existing(true);
    let ring = Arc::new(MmapRingBuffer::create_with(&path, &config)?);

    let num_threads = 4;
    let msgs_per_thread = 1000;
    println!("Starting {} writers, each writing {} messages", num_threads, msgs_per_thread);

    let done = Arc::new(AtomicBool::new(false));
    let reader = {
        let ring = ring.clone();
        let done = done.clone();
        thread::spawn(move || {
            let mut count = 0usize;
            loop {
                match ring.read_msg() {
                    Ok(_) => count += 1,
                    Err(RingError::BufferEmpty) if done.load(Ordering::SeqCst) => break,
                    Err(RingError::BufferEmpty) => thread::sleep(Duration::from_micros(200)),
                    Err(e) => panic!("read failed: {}", e),
                }
            }
            count
        })
    };

    let writers: Vec<_> = (0..num_threads)
        .map(|thread_id| {
            let ring = ring.clone();
            thread::spawn(move || {
                for i in 0..msgs_per_thread {
                    let message = format!("Thread {} - Message {}", thread_id, i);
                    loop {
                        match ring.write_msg(message.as_bytes()) {
                            Ok(()) => break,
                            Err(e) if e.is_transient() => thread::sleep(Duration::from_micros(200)),
                            Err(e) => panic!("write failed: {}", e),
                        }
                    }
                }
                println!("Writer {} completed", thread_id);
            })
        })
        .collect();

    for handle in writers {
        handle.join().unwrap();
    }
    done.store(true, Ordering::SeqCst);
    let read = reader.join().unwrap();
    println!("Reader consumed {} messages", read);
    println!("Stats: {:?}", ring.stats());

    // Leave something behind and pick it up from a fresh mapping
    ring.write_msg(b"left for the next process")?;
    ring.close()?;

    let reopened = MmapRingBuffer::open(&path)?;
    let msg = reopened.read_msg()?;
    println!("After reopen: {}", String::from_utf8_lossy(&msg));
    reopened.close()?;

    std::fs::remove_file(&path).ok();
    println!("Example completed successfully");
    Ok(())
}
