//! Common types and constants for the streaming codec adapter
//!
//! This module defines the core types shared by the codec interface, the
//! resource providers and the streaming engine: the stream direction, the
//! dictionary wrapper, and the crate-wide error type.

use std::fmt;
use thiserror::Error;

/// Direction of a codec session or stream.
///
/// A session created for one direction is never reused for the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Data written to the stream is compressed into the underlying stream.
    Compress,
    /// Data read from the stream is decompressed out of the underlying stream.
    Decompress,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Compress => f.write_str("compress"),
            Direction::Decompress => f.write_str("decompress"),
        }
    }
}

/// A compression or decompression dictionary.
///
/// The bytes are handed to the codec session during lazy initialization;
/// this crate treats them as opaque. For the compress direction the codec is
/// expected to build its level-specific form internally.
#[derive(Debug, Clone)]
pub struct Dictionary {
    bytes: Vec<u8>,
}

impl Dictionary {
    /// Wrap raw dictionary bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// The raw dictionary bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Error type for streaming codec operations
#[derive(Debug, Error)]
pub enum StreamCodecError {
    /// The codec could not allocate a native session
    #[error("codec session allocation failed")]
    SessionAllocation,

    /// A codec step primitive returned a non-success status
    #[error("codec error {code}: {message}")]
    Codec {
        /// Native status code as reported by the codec
        code: i64,
        /// Decoded message for the status code
        message: String,
    },

    /// The codec neither consumed input nor produced output
    #[error("codec made no progress with {remaining} input bytes pending")]
    StalledCodec {
        /// Bytes that were still waiting to be consumed
        remaining: usize,
    },

    /// The requested operation does not match the stream direction
    #[error("cannot {operation} a {direction} stream")]
    DirectionMismatch {
        /// Operation that was attempted
        operation: &'static str,
        /// Direction the stream was constructed with
        direction: Direction,
    },

    /// The stream has already been closed
    #[error("stream is closed")]
    Closed,

    /// The codec handle was used after its session had been released
    #[error("codec handle has already been released")]
    HandleReleased,

    /// Compression level outside the codec's supported range
    #[error("invalid compression level {level} (valid range 1..={max})")]
    InvalidLevel {
        /// Requested level
        level: i32,
        /// Maximum level reported by the codec
        max: i32,
    },

    /// A setting was changed after the first read or write
    #[error("{0} cannot be changed after the stream has started")]
    AlreadyStarted(&'static str),

    /// I/O error from the underlying stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StreamCodecError> for std::io::Error {
    fn from(err: StreamCodecError) -> Self {
        match err {
            StreamCodecError::Io(io) => io,
            StreamCodecError::DirectionMismatch { .. } => {
                std::io::Error::new(std::io::ErrorKind::Unsupported, err)
            }
            StreamCodecError::Closed => std::io::Error::new(std::io::ErrorKind::NotConnected, err),
            other => std::io::Error::new(std::io::ErrorKind::InvalidData, other),
        }
    }
}

/// Result type alias for streaming codec operations
pub type Result<T> = std::result::Result<T, StreamCodecError>;

/// Default capacity of each pooled handle queue (one queue per direction)
pub const DEFAULT_POOL_SIZE: usize = 8;
