//! Configuration for creating and opening ring buffers

use crate::disk::MIN_CAPACITY;
use crate::error::{Result, RingError};

/// Configuration for a memory-mapped ring buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingConfig {
    /// Total size of the backing file in bytes, header included.
    /// Ignored when opening an existing file.
    pub capacity: usize,
    /// Remove any existing file at the path before creating
    pub reset_existing: bool,
    /// Hold an advisory file lock around every write, read and close
    pub cross_process_lock: bool,
    /// Sync the mapping to disk after every successful write
    pub sync_on_write: bool,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            capacity: 1024 * 1024, // 1 MiB
            reset_existing: false,
            cross_process_lock: false,
            sync_on_write: false,
        }
    }
}

impl RingConfig {
    /// Create a configuration with the given capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    /// Set the capacity in bytes
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Remove any existing file before creating
    pub fn with_reset_existing(mut self, reset: bool) -> Self {
        self.reset_existing = reset;
        self
    }

    /// Enable advisory file locking for multi-process use
    pub fn with_cross_process_lock(mut self, enabled: bool) -> Self {
        self.cross_process_lock = enabled;
        self
    }

    /// Sync to disk after every write
    pub fn with_sync_on_write(mut self, enabled: bool) -> Self {
        self.sync_on_write = enabled;
        self
    }

    /// Check that the capacity can be used to create a buffer
    ///
    /// The smallest accepted capacity is [`MIN_CAPACITY`] (17 bytes): the
    /// 8-byte header, a 4-byte length prefix, up to 3 skipped bytes before
    /// the end, 1 byte of slack and one payload byte. Capacities from 9 to 16
    /// are rejected along with anything that cannot hold the header. The
    /// largest message a buffer accepts is `capacity - 16` bytes.
    pub fn validate(&self) -> Result<()> {
        if self.capacity < MIN_CAPACITY {
            return Err(RingError::invalid_configuration(format!(
                "capacity {} is below the minimum of {} bytes",
                self.capacity, MIN_CAPACITY
            )));
        }
        if self.capacity > u32::MAX as usize {
            return Err(RingError::invalid_configuration(format!(
                "capacity {} does not fit 32-bit offsets",
                self.capacity
            )));
        }
        Ok(())
    }
}
