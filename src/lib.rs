//! streamcodec - streaming adapter for block compression codecs
//!
//! This crate turns a block-oriented compression codec (fixed-size
//! input/output buffer pairs with partial-consumption semantics) into a byte
//! stream callers can read from or write to incrementally, without knowing
//! the codec's internal buffering rules. The codec itself is an external
//! collaborator behind the [`Codec`]/[`CodecSession`] traits; this crate
//! only implements the orchestration around it.
//!
//! # Features
//!
//! - Compress-on-write and decompress-on-read streams over any
//!   `std::io::Write` / `std::io::Read`
//! - Resumable step loop with precise position bookkeeping for codecs that
//!   consume or produce less than a full buffer per call
//! - Lazy per-stream initialization with a settable compression level and
//!   optional dictionary
//! - Exactly-once finalization (flush-step, end-step) on close, finish, or
//!   drop
//! - Pluggable resource strategy: direct allocation or bounded lock-free
//!   pooling of codec handles and scratch buffers across streams
//!
//! # Example - Compression
//!
//! ```no_run
//! use std::io::Write;
//! use std::sync::Arc;
//! use streamcodec::{Codec, CodecStream};
//!
//! fn compress_to_file(codec: Arc<dyn Codec>, data: &[u8]) -> streamcodec::Result<()> {
//!     let file = std::fs::File::create("data.bin")?;
//!     let mut stream = CodecStream::new_compress(file, codec)?;
//!     stream.set_compression_level(3)?;
//!     stream.write_all(data)?;
//!     stream.close()?;
//!     Ok(())
//! }
//! ```
//!
//! # Example - Decompression
//!
//! ```no_run
//! use std::io::Read;
//! use std::sync::Arc;
//! use streamcodec::{Codec, CodecStream};
//!
//! fn decompress_file(codec: Arc<dyn Codec>) -> streamcodec::Result<Vec<u8>> {
//!     let file = std::fs::File::open("data.bin")?;
//!     let mut stream = CodecStream::new_decompress(file, codec)?;
//!     let mut output = Vec::new();
//!     stream.read_to_end(&mut output)?;
//!     stream.close()?;
//!     Ok(output)
//! }
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

// Public modules
pub mod codec;
pub mod common;
pub mod error;
pub mod handle;
pub mod provider;
pub mod stream;

// Re-export commonly used types
pub use codec::{Codec, CodecSession, InputView, OutputView, StatusCode};
pub use common::{Dictionary, Direction, Result, StreamCodecError, DEFAULT_POOL_SIZE};
pub use handle::CodecHandle;
pub use provider::{DirectProvider, PooledProvider, ResourceProvider};
pub use stream::CodecStream;

use std::sync::Arc;

/// Compress `data` in one shot at the given level.
///
/// Convenience wrapper around a [`CodecStream`] writing into a `Vec<u8>`.
pub fn compress_bytes(codec: Arc<dyn Codec>, data: &[u8], level: i32) -> Result<Vec<u8>> {
    let mut stream = CodecStream::new_compress(Vec::new(), codec)?;
    stream.set_compression_level(level)?;
    stream.write_impl(data)?;
    stream.finish()
}

/// Decompress `data` in one shot.
///
/// Convenience wrapper around a [`CodecStream`] reading from a byte slice.
pub fn decompress_bytes(codec: Arc<dyn Codec>, data: &[u8]) -> Result<Vec<u8>> {
    let mut stream = CodecStream::new_decompress(data, codec)?;
    let mut output = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read_impl(&mut chunk)?;
        if n == 0 {
            break;
        }
        output.extend_from_slice(&chunk[..n]);
    }
    stream.close()?;
    Ok(output)
}
