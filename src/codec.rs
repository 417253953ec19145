//! Codec interface seam
//!
//! The streaming engine drives an external block codec through the traits in
//! this module. A [`Codec`] is the stateless entry point: it allocates
//! per-stream [`CodecSession`]s, reports recommended buffer sizes and level
//! bounds, and decodes native status codes. A [`CodecSession`] is the mutable
//! per-stream state the step primitives operate on.
//!
//! Every step call receives buffer views ([`InputView`], [`OutputView`])
//! whose position cursors the codec advances in place to report how much it
//! consumed and produced. A single call may consume less than the full input
//! and/or produce less than the full output; the engine loops until the
//! caller's request is satisfied.

use crate::common::{Direction, Result};

/// Raw status code returned by a codec step primitive.
///
/// The numeric value is codec-specific; only the owning [`Codec`] can decide
/// whether it denotes an error and what it means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCode(i64);

impl StatusCode {
    /// The conventional all-clear status.
    pub const OK: StatusCode = StatusCode(0);

    /// Wrap a raw native status value.
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// The raw native status value.
    pub fn raw(self) -> i64 {
        self.0
    }
}

/// Non-owning view over the bytes a codec step may consume.
///
/// `pos` starts at zero and is advanced by the codec to report consumption.
#[derive(Debug)]
pub struct InputView<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> InputView<'a> {
    /// View the whole of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Total size of the viewed region.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Bytes consumed so far.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// The not-yet-consumed tail of the region.
    pub fn remaining(&self) -> &[u8] {
        &self.data[self.pos..]
    }

    /// True once every byte of the region has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Record that the codec consumed `n` more bytes.
    pub fn advance(&mut self, n: usize) {
        debug_assert!(self.pos + n <= self.data.len());
        self.pos = (self.pos + n).min(self.data.len());
    }
}

/// Non-owning view over the region a codec step may produce into.
///
/// `pos` starts at zero and is advanced by the codec to report production.
#[derive(Debug)]
pub struct OutputView<'a> {
    data: &'a mut [u8],
    pos: usize,
}

impl<'a> OutputView<'a> {
    /// View the whole of `data`.
    pub fn new(data: &'a mut [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Total size of the viewed region.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Bytes produced so far.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// The writable tail of the region.
    pub fn remaining_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.pos..]
    }

    /// Free space left in the region.
    pub fn remaining_len(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Record that the codec produced `n` more bytes.
    pub fn advance(&mut self, n: usize) {
        debug_assert!(self.pos + n <= self.data.len());
        self.pos = (self.pos + n).min(self.data.len());
    }
}

/// A block compression codec.
///
/// Implementations are shared across streams and threads; all per-stream
/// mutable state lives in the sessions they create.
pub trait Codec: Send + Sync {
    /// Short human-readable codec name, used in log output.
    fn name(&self) -> &str;

    /// Allocate a fresh compress-direction session.
    ///
    /// Fails with [`StreamCodecError::SessionAllocation`] when the native
    /// allocation fails; a returned session is always usable.
    ///
    /// [`StreamCodecError::SessionAllocation`]: crate::StreamCodecError::SessionAllocation
    fn create_compress_session(&self) -> Result<Box<dyn CodecSession>>;

    /// Allocate a fresh decompress-direction session.
    fn create_decompress_session(&self) -> Result<Box<dyn CodecSession>>;

    /// Recommended input block size for the given direction.
    fn recommended_input_size(&self, direction: Direction) -> usize;

    /// Recommended output block size for the given direction.
    fn recommended_output_size(&self, direction: Direction) -> usize;

    /// Highest compression level the codec accepts.
    fn max_compression_level(&self) -> i32;

    /// Level used when the caller does not set one; mid-range by default.
    fn default_compression_level(&self) -> i32 {
        (self.max_compression_level() / 2).max(1)
    }

    /// Whether a status code denotes an error.
    fn status_is_error(&self, status: StatusCode) -> bool;

    /// Decoded message for a status code.
    fn status_message(&self, status: StatusCode) -> String;
}

/// One native compression or decompression session.
///
/// Sessions may be recycled across streams by a pooling resource provider;
/// the engine calls the matching `init_*` method exactly once per stream
/// before any step, and implementations must reset any prior session state
/// there.
pub trait CodecSession: Send {
    /// Initialize for compression at `level`, optionally with a dictionary.
    fn init_compress(&mut self, level: i32, dictionary: Option<&[u8]>) -> StatusCode;

    /// Initialize for decompression, optionally with a dictionary.
    fn init_decompress(&mut self, dictionary: Option<&[u8]>) -> StatusCode;

    /// Compress some input into the output region.
    ///
    /// Advances both view cursors to report consumed/produced counts.
    fn compress_step(&mut self, output: &mut OutputView<'_>, input: &mut InputView<'_>)
        -> StatusCode;

    /// Decompress some input into the output region.
    fn decompress_step(
        &mut self,
        output: &mut OutputView<'_>,
        input: &mut InputView<'_>,
    ) -> StatusCode;

    /// Emit any internally buffered compressed bytes without ending the
    /// logical stream.
    fn flush_step(&mut self, output: &mut OutputView<'_>) -> StatusCode;

    /// Emit the end-of-stream epilogue.
    fn end_step(&mut self, output: &mut OutputView<'_>) -> StatusCode;
}
