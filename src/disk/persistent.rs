//! Persistent ring buffer backed by a memory-mapped file
//!
//! This module implements the message ring itself. Writers append a frame
//! (length prefix plus payload) at the head cursor and readers remove the
//! oldest frame at the tail cursor. Both cursors live in the mapped file, so
//! the buffer contents survive process restarts and are visible to every
//! process mapping the same file.
//!
//! Concurrency contract:
//!
//! - Within one process any number of threads may write and read through a
//!   shared instance. The mapped region sits behind a single lock held for the
//!   whole of each write, read and close.
//! - Across processes the in-process lock gives no exclusion. Enable
//!   [`RingConfig::cross_process_lock`] to add an advisory file lock, or keep
//!   to one writer process and one reader process.
//!
//! Operations never block waiting for space or data: they fail with
//! [`RingError::BufferFull`] or [`RingError::BufferEmpty`] and the caller
//! decides how to back off.

use crate::config::RingConfig;
use crate::disk::cursor::Region;
use crate::disk::lock::FileLock;
use crate::disk::{Layout, HEADER_SIZE, LENGTH_PREFIX, MIN_CAPACITY};
use crate::error::{Result, RingError};
use crate::stats::{Counters, RingStats};
use log::{debug, trace};
use memmap2::MmapOptions;
use parking_lot::RwLock;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{fence, Ordering};

/// File-backed ring buffer of length-prefixed messages
pub struct MmapRingBuffer {
    /// Path to the buffer file
    path: PathBuf,
    /// Backing file, kept open for advisory locking
    file: File,
    /// Mapped region, `None` once closed
    region: RwLock<Option<Region>>,
    /// Offset arithmetic for this capacity
    layout: Layout,
    /// Options this instance was created or opened with
    config: RingConfig,
    /// Operation counters
    counters: Counters,
}

impl MmapRingBuffer {
    /// Create a new buffer file of `capacity` bytes at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the buffer file
    /// * `capacity` - Total size of the file in bytes, header included
    /// * `reset_existing` - Remove any file already at `path` first
    pub fn create<P: AsRef<Path>>(path: P, capacity: usize, reset_existing: bool) -> Result<Self> {
        let config = RingConfig::new(capacity).with_reset_existing(reset_existing);
        Self::create_with(path, &config)
    }

    /// Create a new buffer file using the given configuration
    ///
    /// The file is truncated to exactly `config.capacity` bytes, zero-filled,
    /// and both cursors are set to the start of the data region.
    pub fn create_with<P: AsRef<Path>>(path: P, config: &RingConfig) -> Result<Self> {
        config.validate()?;
        let path = path.as_ref().to_path_buf();

        if config.reset_existing {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;

        let region = {
            let _file_lock = lock_if(config.cross_process_lock, &file)?;

            file.set_len(config.capacity as u64)?;

            // Safety: the file stays open for the life of the mapping and is
            // never resized while mapped.
            let mmap = unsafe { MmapOptions::new().len(config.capacity).map_mut(&file)? };

            let layout = Layout::new(config.capacity as u32);
            let mut region = Region::new(mmap, layout);
            region.zero();
            region.set_head(HEADER_SIZE);
            region.set_tail(HEADER_SIZE);
            region
        };

        debug!(
            "created ring buffer at {} ({} bytes)",
            path.display(),
            config.capacity
        );

        Ok(Self::from_parts(path, file, region, config.clone()))
    }

    /// Open an existing buffer file, inheriting its cursors and contents
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, &RingConfig::default())
    }

    /// Open an existing buffer file using the given configuration
    ///
    /// The capacity is taken from the file length; `config.capacity` and
    /// `config.reset_existing` are ignored.
    pub fn open_with<P: AsRef<Path>>(path: P, config: &RingConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let file = OpenOptions::new().read(true).write(true).open(&path)?;

        let file_size = file.metadata()?.len();
        if file_size < MIN_CAPACITY as u64 || file_size > u32::MAX as u64 {
            return Err(RingError::invalid_buffer(format!(
                "file size {} is outside [{}, {}]",
                file_size,
                MIN_CAPACITY,
                u32::MAX
            )));
        }

        // Safety: see `create_with`.
        let mmap = unsafe { MmapOptions::new().len(file_size as usize).map_mut(&file)? };

        let layout = Layout::new(file_size as u32);
        let region = Region::new(mmap, layout);

        // A concurrent create may still be zeroing the file
        let (head, tail) = {
            let _file_lock = lock_if(config.cross_process_lock, &file)?;
            region.head_tail()
        };
        if !layout.contains(head) || !layout.contains(tail) {
            return Err(RingError::invalid_buffer(format!(
                "cursors (head {}, tail {}) outside the data region",
                head, tail
            )));
        }

        debug!(
            "opened ring buffer at {} ({} bytes, head {}, tail {})",
            path.display(),
            file_size,
            head,
            tail
        );

        let config = RingConfig {
            capacity: file_size as usize,
            reset_existing: false,
            ..config.clone()
        };

        Ok(Self::from_parts(path, file, region, config))
    }

    fn from_parts(path: PathBuf, file: File, region: Region, config: RingConfig) -> Self {
        Self {
            path,
            file,
            layout: region.layout(),
            region: RwLock::new(Some(region)),
            config,
            counters: Counters::default(),
        }
    }

    /// Append one message
    ///
    /// Fails with [`RingError::InvalidMessageSize`] for an empty or oversized
    /// payload and with [`RingError::BufferFull`] when the frame does not fit.
    /// Nothing is written on failure.
    pub fn write_msg(&self, payload: &[u8]) -> Result<()> {
        let mut guard = self.region.write();
        let region = guard.as_mut().ok_or(RingError::Closed)?;

        let max = self.layout.max_message_size() as usize;
        if payload.is_empty() || payload.len() > max {
            return Err(RingError::InvalidMessageSize {
                size: payload.len(),
                max,
            });
        }

        let _file_lock = self.lock_file()?;

        let (head, tail) = self.cursors(region)?;
        let layout = self.layout;

        // Frame bytes plus whatever is abandoned at the end of the region
        let skipped = layout.skipped_at(head);
        let required = skipped + LENGTH_PREFIX + payload.len() as u32;
        let available = layout.free(head, tail);
        if required > available {
            self.counters.record_full();
            return Err(RingError::BufferFull {
                required: required as usize,
                available: available as usize,
            });
        }

        let start = layout.frame_start(head);
        if skipped > 0 {
            trace!("write skipping {} bytes at offset {}", skipped, head);
        }

        region.write_u32(start as usize, payload.len() as u32);
        let payload_start = layout.advance(start, LENGTH_PREFIX);
        let new_head = region.write_wrapped(payload_start, payload);
        if new_head < payload_start {
            trace!("write wrapped, head now {}", new_head);
        }

        // Publish the frame only once it is fully copied
        fence(Ordering::Release);
        region.set_head(new_head);

        if self.config.sync_on_write {
            region.flush()?;
        }

        self.counters.record_write();
        Ok(())
    }

    /// Remove and return the oldest message
    ///
    /// Fails with [`RingError::BufferEmpty`] when there is nothing to read and
    /// with [`RingError::CorruptFrame`] when the stored length cannot be valid.
    /// The tail is left untouched on failure.
    pub fn read_msg(&self) -> Result<Vec<u8>> {
        let mut guard = self.region.write();
        let region = guard.as_mut().ok_or(RingError::Closed)?;

        let _file_lock = self.lock_file()?;

        let (head, tail) = self.cursors(region)?;
        if head == tail {
            self.counters.record_empty();
            return Err(RingError::BufferEmpty);
        }

        let layout = self.layout;
        let used = layout.used(head, tail);
        let skipped = layout.skipped_at(tail);
        let start = layout.frame_start(tail);
        if skipped > 0 {
            trace!("read skipping {} bytes at offset {}", skipped, tail);
        }

        let length = region.read_u32(start as usize);
        if length == 0
            || length > layout.max_message_size()
            || skipped + LENGTH_PREFIX + length > used
        {
            return Err(RingError::CorruptFrame {
                offset: start,
                length,
            });
        }

        let mut payload = vec![0u8; length as usize];
        let new_tail = region.read_wrapped(layout.advance(start, LENGTH_PREFIX), &mut payload);

        fence(Ordering::Release);
        region.set_tail(new_tail);

        self.counters.record_read();
        Ok(payload)
    }

    /// Unmap the region, flushing it to the backing file first
    ///
    /// The file itself is left in place. Every later call, including a second
    /// `close`, fails with [`RingError::Closed`].
    pub fn close(&self) -> Result<()> {
        let mut guard = self.region.write();
        if guard.is_none() {
            return Err(RingError::Closed);
        }

        let _file_lock = self.lock_file()?;

        let result = match guard.take() {
            // Dropping the region unmaps it
            Some(region) => region.flush(),
            None => Ok(()),
        };

        debug!("closed ring buffer at {}", self.path.display());
        result.map_err(RingError::from)
    }

    /// Read `(head, tail)` without side effects
    ///
    /// The values are returned as stored, even if another mapper left them
    /// outside the data region.
    pub fn head_tail(&self) -> Result<(u32, u32)> {
        let guard = self.region.read();
        let region = guard.as_ref().ok_or(RingError::Closed)?;
        Ok(region.head_tail())
    }

    /// Bytes currently occupied by unread frames
    pub fn used_bytes(&self) -> Result<usize> {
        let (head, tail) = self.checked_head_tail()?;
        Ok(self.layout.used(head, tail) as usize)
    }

    /// Bytes available for the next frame, length prefix included
    pub fn free_bytes(&self) -> Result<usize> {
        let (head, tail) = self.checked_head_tail()?;
        let free = self.layout.free(head, tail);
        Ok(free.saturating_sub(self.layout.skipped_at(head)) as usize)
    }

    /// Whether there is no message to read
    pub fn is_empty(&self) -> Result<bool> {
        let (head, tail) = self.checked_head_tail()?;
        Ok(head == tail)
    }

    /// Synchronously flush the mapping to disk
    pub fn flush(&self) -> Result<()> {
        let guard = self.region.read();
        let region = guard.as_ref().ok_or(RingError::Closed)?;
        region.flush()?;
        Ok(())
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.region.read().is_none()
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the total size of the buffer file in bytes
    pub fn capacity(&self) -> usize {
        self.layout.capacity() as usize
    }

    /// Configuration this instance runs with
    ///
    /// For an opened buffer the capacity is the file length.
    pub fn config(&self) -> &RingConfig {
        &self.config
    }

    /// Largest payload accepted by `write_msg`
    pub fn max_message_size(&self) -> usize {
        self.layout.max_message_size() as usize
    }

    /// Number of messages written through this instance
    pub fn write_count(&self) -> u64 {
        self.counters.writes()
    }

    /// Number of messages read through this instance
    pub fn read_count(&self) -> u64 {
        self.counters.reads()
    }

    /// Snapshot of this instance's operation counters
    pub fn stats(&self) -> RingStats {
        self.counters.snapshot()
    }

    /// Snapshot the cursors, rejecting values another mapper corrupted
    fn cursors(&self, region: &Region) -> Result<(u32, u32)> {
        let (head, tail) = region.head_tail();
        fence(Ordering::Acquire);

        if !self.layout.contains(head) || !self.layout.contains(tail) {
            return Err(RingError::invalid_buffer(format!(
                "cursors (head {}, tail {}) outside the data region",
                head, tail
            )));
        }
        Ok((head, tail))
    }

    fn checked_head_tail(&self) -> Result<(u32, u32)> {
        let guard = self.region.read();
        let region = guard.as_ref().ok_or(RingError::Closed)?;
        self.cursors(region)
    }

    fn lock_file(&self) -> Result<Option<FileLock<'_>>> {
        lock_if(self.config.cross_process_lock, &self.file).map_err(RingError::from)
    }
}

fn lock_if(enabled: bool, file: &File) -> io::Result<Option<FileLock<'_>>> {
    if enabled {
        FileLock::acquire(file).map(Some)
    } else {
        Ok(None)
    }
}

impl std::fmt::Debug for MmapRingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MmapRingBuffer")
            .field("path", &self.path)
            .field("capacity", &self.layout.capacity())
            .field("config", &self.config)
            .finish()
    }
}
