//! Sherlog mmap ring - a file-backed circular buffer for passing
//! length-prefixed messages between threads and processes on one host.
//!
//! # Overview
//!
//! The whole buffer lives in one regular file that is memory-mapped shared,
//! so every process mapping the file sees the same bytes and the contents
//! survive restarts. The file starts with two little-endian `u32` cursors,
//! head (next write) and tail (next read), followed by the data region that
//! holds `[length: u32 LE][payload]` frames in FIFO order, wrapping at the
//! end of the file back to offset 8.
//!
//! # Key Features
//!
//! - Variable-length messages with wrap-around framing
//! - Persistence across process restarts through the backing file
//! - Multi-writer, multi-reader safety within one process
//! - Optional advisory file locking for multi-process use
//! - Non-blocking operations: full and empty are reported, never waited on
//!
//! # Usage
//!
//! ```no_run
//! use sherlog_mmap_ring::{MmapRingBuffer, RingError};
//!
//! let ring = MmapRingBuffer::create("/tmp/example.ring", 4096, true)?;
//! ring.write_msg(b"hello")?;
//!
//! match ring.read_msg() {
//!     Ok(msg) => assert_eq!(msg, b"hello"),
//!     Err(RingError::BufferEmpty) => {}
//!     Err(e) => return Err(e),
//! }
//!
//! ring.close()?;
//! # Ok::<(), RingError>(())
//! ```
//!
//! See the `demos` directory for a multi-threaded example.

#![deny(missing_docs)]

mod config;
mod disk;
mod error;
mod stats;

pub use config::RingConfig;
pub use disk::persistent::MmapRingBuffer;
pub use error::{Result, RingError};
pub use stats::RingStats;

/// On-disk layout constants and offset arithmetic
pub mod layout {
    pub use crate::disk::{
        Layout, HEADER_SIZE, HEAD_OFFSET, LENGTH_PREFIX, MAX_SKIP, MIN_CAPACITY, SLACK,
        TAIL_OFFSET,
    };
}
