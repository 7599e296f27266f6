//! Per-instance operation counters

use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of the operation counters of one ring buffer instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RingStats {
    /// Messages successfully written
    pub writes: u64,
    /// Messages successfully read
    pub reads: u64,
    /// Writes rejected because the buffer was full
    pub full_rejections: u64,
    /// Reads rejected because the buffer was empty
    pub empty_rejections: u64,
}

/// Live counters, cache-line padded so writers and readers don't share a line
#[derive(Debug, Default)]
pub(crate) struct Counters {
    writes: CachePadded<AtomicU64>,
    reads: CachePadded<AtomicU64>,
    full: CachePadded<AtomicU64>,
    empty: CachePadded<AtomicU64>,
}

impl Counters {
    pub fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_full(&self) {
        self.full.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_empty(&self) {
        self.empty.fetch_add(1, Ordering::Relaxed);
    }

    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> RingStats {
        RingStats {
            writes: self.writes(),
            reads: self.reads(),
            full_rejections: self.full.load(Ordering::Relaxed),
            empty_rejections: self.empty.load(Ordering::Relaxed),
        }
    }
}
