//! Error types for the memory-mapped ring buffer

use std::io;

/// Result type for ring buffer operations
pub type Result<T> = std::result::Result<T, RingError>;

/// Error types for the memory-mapped ring buffer
#[derive(Debug, thiserror::Error)]
pub enum RingError {
    /// Requested capacity cannot hold the header and a single frame
    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        /// What was wrong with the configuration
        message: String,
    },

    /// Payload is empty or larger than the maximum message size
    #[error("invalid message size: {size} (max {max})")]
    InvalidMessageSize {
        /// Length of the rejected payload
        size: usize,
        /// Largest payload this buffer accepts
        max: usize,
    },

    /// Not enough free space for the frame; nothing was written
    #[error("ring buffer is full: need {required} bytes, {available} available")]
    BufferFull {
        /// Bytes the frame would consume, including skipped tail bytes
        required: usize,
        /// Bytes available after slack
        available: usize,
    },

    /// No message to read; nothing was consumed
    #[error("ring buffer is empty")]
    BufferEmpty,

    /// The buffer was used after `close`
    #[error("ring buffer is closed")]
    Closed,

    /// The backing file does not hold a usable ring buffer
    #[error("invalid buffer file: {message}")]
    InvalidBuffer {
        /// Why the file was rejected
        message: String,
    },

    /// A length field read from the region cannot describe a valid frame
    #[error("corrupt frame at offset {offset}: length {length}")]
    CorruptFrame {
        /// Offset of the length field
        offset: u32,
        /// Length value found there
        length: u32,
    },

    /// An IO error occurred (open, truncate, map, flush, lock)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl RingError {
    /// Create an invalid configuration error
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Create an invalid buffer error
    pub fn invalid_buffer(message: impl Into<String>) -> Self {
        Self::InvalidBuffer {
            message: message.into(),
        }
    }

    /// Whether retrying the same call later may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::BufferFull { .. } | Self::BufferEmpty)
    }
}
