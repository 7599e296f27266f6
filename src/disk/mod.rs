//! On-disk layout of the memory-mapped ring buffer
//!
//! The backing file is exactly `capacity` bytes and is laid out as:
//!
//! ```text
//! [0, 4)          head cursor, u32 little-endian (next write position)
//! [4, 8)          tail cursor, u32 little-endian (next read position)
//! [8, capacity)   data region, a sequence of frames
//! ```
//!
//! A frame is a 4-byte little-endian length followed by that many payload
//! bytes. The payload may straddle the end of the region and continue at
//! offset 8. The length field never does: when fewer than 4 bytes remain
//! before `capacity`, those bytes are skipped and the frame starts at 8.
//!
//! The module is split into:
//!
//! - [`Layout`]: the pure offset arithmetic shared by writers and readers
//! - `cursor`: the mapped region and the head/tail accessors
//! - `persistent`: the ring buffer itself
//! - `lock`: the advisory file lock used for cross-process exclusion

pub mod cursor;
pub(crate) mod lock;
pub mod persistent;

use std::ops::Range;

/// Size of the control header holding head and tail
pub const HEADER_SIZE: u32 = 8;

/// Offset of the head cursor
pub const HEAD_OFFSET: usize = 0;

/// Offset of the tail cursor
pub const TAIL_OFFSET: usize = 4;

/// Size of the length field in front of every payload
pub const LENGTH_PREFIX: u32 = 4;

/// Bytes that must stay free so a full buffer never looks empty
pub const SLACK: u32 = 1;

/// Most bytes a writer can skip at the end of the region
pub const MAX_SKIP: u32 = LENGTH_PREFIX - 1;

/// Smallest capacity that can carry a one-byte message from any position
pub const MIN_CAPACITY: usize = (HEADER_SIZE + LENGTH_PREFIX + MAX_SKIP + SLACK + 1) as usize;

/// Offset arithmetic for a ring of a fixed capacity
///
/// All offsets are absolute positions in the mapped file. Methods taking an
/// offset expect it to lie in `[HEADER_SIZE, capacity)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    capacity: u32,
}

impl Layout {
    /// Create the layout for a region of `capacity` bytes
    pub fn new(capacity: u32) -> Self {
        debug_assert!(capacity as usize >= MIN_CAPACITY);
        Self { capacity }
    }

    /// Total size of the region, header included
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Size of the data region
    pub fn data_size(&self) -> u32 {
        self.capacity - HEADER_SIZE
    }

    /// Largest payload that fits into an empty buffer wherever its cursors are
    pub fn max_message_size(&self) -> u32 {
        self.data_size() - LENGTH_PREFIX - MAX_SKIP - SLACK
    }

    /// Whether a cursor value points into the data region
    pub fn contains(&self, offset: u32) -> bool {
        offset >= HEADER_SIZE && offset < self.capacity
    }

    /// Bytes between tail and head, skipped bytes included
    pub fn used(&self, head: u32, tail: u32) -> u32 {
        if head >= tail {
            head - tail
        } else {
            self.data_size() - (tail - head)
        }
    }

    /// Bytes a writer may still consume without making head reach tail
    pub fn free(&self, head: u32, tail: u32) -> u32 {
        self.data_size()
            .saturating_sub(self.used(head, tail))
            .saturating_sub(SLACK)
    }

    /// Bytes left unused at `offset` because a length field would not fit
    pub fn skipped_at(&self, offset: u32) -> u32 {
        let remaining = self.capacity - offset;
        if remaining < LENGTH_PREFIX {
            remaining
        } else {
            0
        }
    }

    /// Where a frame whose cursor sits at `offset` actually begins
    pub fn frame_start(&self, offset: u32) -> u32 {
        if self.skipped_at(offset) > 0 {
            HEADER_SIZE
        } else {
            offset
        }
    }

    /// Move `offset` forward by `len` bytes, wrapping back into the data region
    ///
    /// `len` must be smaller than the data region.
    pub fn advance(&self, offset: u32, len: u32) -> u32 {
        let end = offset as u64 + len as u64;
        if end >= self.capacity as u64 {
            (end - self.data_size() as u64) as u32
        } else {
            end as u32
        }
    }

    /// Physical spans covering `len` bytes starting at `offset`
    ///
    /// The second span is empty unless the bytes wrap past `capacity`.
    pub fn spans(&self, offset: u32, len: u32) -> (Range<usize>, Range<usize>) {
        let start = offset as usize;
        let len = len as usize;
        let contiguous = (self.capacity - offset) as usize;
        let header = HEADER_SIZE as usize;

        if len <= contiguous {
            (start..start + len, header..header)
        } else {
            (
                start..self.capacity as usize,
                header..header + (len - contiguous),
            )
        }
    }
}
