//! CodecStream - the streaming engine
//!
//! [`CodecStream`] drives a block codec across arbitrarily sized caller
//! buffers and exposes the result as a byte stream: compress-direction
//! streams implement [`std::io::Write`] over a writable underlying stream,
//! decompress-direction streams implement [`std::io::Read`] over a readable
//! one.
//!
//! The engine rents its codec handle and scratch buffer from a
//! [`ResourceProvider`] at construction and returns both on close. Codec
//! initialization is lazy: it happens on the first read or write, so the
//! compression level and dictionary can still be set after construction.
//! Finalization (flush-step, then end-step) runs exactly once, on the first
//! of explicit close, [`CodecStream::finish`], or drop.

use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

use log::{debug, trace};

use crate::codec::{Codec, InputView, OutputView, StatusCode};
use crate::common::{Dictionary, Direction, Result, StreamCodecError};
use crate::handle::CodecHandle;
use crate::provider::{DirectProvider, ResourceProvider};

fn check_status(codec: &dyn Codec, status: StatusCode) -> Result<()> {
    if codec.status_is_error(status) {
        return Err(StreamCodecError::Codec {
            code: status.raw(),
            message: codec.status_message(status),
        });
    }
    Ok(())
}

enum DrainKind {
    Flush,
    End,
}

/// A byte stream that compresses on write or decompresses on read.
///
/// The direction is fixed at construction and never mixed: calling the
/// mismatched operation fails before any underlying I/O happens. A single
/// stream instance is not meant to be shared across threads; cross-thread
/// concurrency is supported only through the resource provider.
pub struct CodecStream<S> {
    inner: Option<S>,
    codec: Arc<dyn Codec>,
    provider: Arc<dyn ResourceProvider>,
    direction: Direction,
    handle: Option<CodecHandle>,
    scratch: Option<Vec<u8>>,
    level: i32,
    dictionary: Option<Arc<Dictionary>>,
    leave_open: bool,
    initialized: bool,
    closed: bool,
    depleted: bool,
    scratch_pos: usize,
    scratch_fill: usize,
    finisher: fn(&mut Self) -> Result<()>,
}

impl<S> CodecStream<S> {
    fn build(
        inner: S,
        codec: Arc<dyn Codec>,
        provider: Arc<dyn ResourceProvider>,
        direction: Direction,
        finisher: fn(&mut Self) -> Result<()>,
    ) -> Result<Self> {
        let handle = provider.rent_handle(direction)?;
        // Compress stages codec output in the scratch buffer; decompress
        // stages raw input read from the underlying stream.
        let size = match direction {
            Direction::Compress => codec.recommended_output_size(Direction::Compress),
            Direction::Decompress => codec.recommended_input_size(Direction::Decompress),
        }
        .max(1);
        let scratch = provider.rent_buffer(size);
        let level = codec.default_compression_level();
        Ok(Self {
            inner: Some(inner),
            codec,
            provider,
            direction,
            handle: Some(handle),
            scratch: Some(scratch),
            level,
            dictionary: None,
            leave_open: false,
            initialized: false,
            closed: false,
            depleted: false,
            scratch_pos: 0,
            scratch_fill: 0,
            finisher,
        })
    }

    /// Direction the stream was constructed with.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Compression level that will be (or was) used at initialization.
    pub fn compression_level(&self) -> i32 {
        self.level
    }

    /// True once the stream has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Set the compression level for a compress-direction stream.
    ///
    /// Must be called before the first write; fails once the codec session
    /// has been initialized or when the level is outside `1..=max`.
    pub fn set_compression_level(&mut self, level: i32) -> Result<()> {
        if self.initialized {
            return Err(StreamCodecError::AlreadyStarted("compression level"));
        }
        let max = self.codec.max_compression_level();
        if level < 1 || level > max {
            return Err(StreamCodecError::InvalidLevel { level, max });
        }
        self.level = level;
        Ok(())
    }

    /// Set the dictionary passed to the codec at initialization.
    ///
    /// Must be called before the first read or write.
    pub fn set_dictionary(&mut self, dictionary: Arc<Dictionary>) -> Result<()> {
        if self.initialized {
            return Err(StreamCodecError::AlreadyStarted("dictionary"));
        }
        self.dictionary = Some(dictionary);
        Ok(())
    }

    /// Keep the underlying stream alive after [`CodecStream::close`]
    /// instead of dropping it.
    pub fn set_leave_open(&mut self, leave_open: bool) {
        self.leave_open = leave_open;
    }

    /// Finalize the stream and release all rented resources.
    ///
    /// For the compress direction this drains the codec's flush and end
    /// steps into the underlying stream and flushes it. Idempotent: a second
    /// close is a no-op. Resources are returned to the provider even when
    /// finalization fails.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        debug!("closing {} {} stream", self.codec.name(), self.direction);
        let result = (self.finisher)(self);
        self.release_resources();
        if !self.leave_open {
            self.inner = None;
        }
        result
    }

    /// Finalize the stream and hand back the underlying stream.
    ///
    /// Fails with [`StreamCodecError::Closed`] if the underlying stream was
    /// already dropped by a prior [`CodecStream::close`].
    pub fn finish(mut self) -> Result<S> {
        if !self.closed {
            self.closed = true;
            debug!("finishing {} {} stream", self.codec.name(), self.direction);
            let result = (self.finisher)(&mut self);
            self.release_resources();
            result?;
        }
        self.inner.take().ok_or(StreamCodecError::Closed)
    }

    fn release_resources(&mut self) {
        if let Some(buffer) = self.scratch.take() {
            self.provider.return_buffer(buffer);
        }
        if let Some(handle) = self.handle.take() {
            self.provider.release_handle(handle);
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed || self.inner.is_none() {
            return Err(StreamCodecError::Closed);
        }
        Ok(())
    }

    fn ensure_initialized(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        let dictionary = self.dictionary.as_ref().map(|d| d.as_bytes());
        let handle = self.handle.as_mut().ok_or(StreamCodecError::Closed)?;
        let session = handle.session_mut()?;
        let status = match self.direction {
            Direction::Compress => session.init_compress(self.level, dictionary),
            Direction::Decompress => session.init_decompress(dictionary),
        };
        check_status(self.codec.as_ref(), status)?;
        self.initialized = true;
        debug!(
            "initialized {} {} session (level {})",
            self.codec.name(),
            self.direction,
            self.level
        );
        Ok(())
    }

    fn finalize_none(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: Write> CodecStream<S> {
    /// Create a compress-direction stream writing into `inner`, with a
    /// direct (non-pooling) resource provider.
    pub fn new_compress(inner: S, codec: Arc<dyn Codec>) -> Result<Self> {
        let provider: Arc<dyn ResourceProvider> =
            Arc::new(DirectProvider::new(Arc::clone(&codec)));
        Self::new_compress_with(inner, codec, provider)
    }

    /// Create a compress-direction stream renting its resources from
    /// `provider`.
    pub fn new_compress_with(
        inner: S,
        codec: Arc<dyn Codec>,
        provider: Arc<dyn ResourceProvider>,
    ) -> Result<Self> {
        Self::build(
            inner,
            codec,
            provider,
            Direction::Compress,
            Self::finalize_compress,
        )
    }

    pub(crate) fn write_impl(&mut self, buf: &[u8]) -> Result<()> {
        self.ensure_open()?;
        if self.direction != Direction::Compress {
            return Err(StreamCodecError::DirectionMismatch {
                operation: "write to",
                direction: self.direction,
            });
        }
        self.ensure_initialized()?;

        let mut offset = 0;
        while offset < buf.len() {
            let (consumed, produced) = {
                let scratch = self.scratch.as_mut().ok_or(StreamCodecError::Closed)?;
                let handle = self.handle.as_mut().ok_or(StreamCodecError::Closed)?;
                let chunk = (buf.len() - offset).min(scratch.len());
                let mut input = InputView::new(&buf[offset..offset + chunk]);
                let mut output = OutputView::new(scratch.as_mut_slice());
                let status = handle.session_mut()?.compress_step(&mut output, &mut input);
                check_status(self.codec.as_ref(), status)?;
                (input.pos(), output.pos())
            };
            if produced > 0 {
                let scratch = self.scratch.as_ref().ok_or(StreamCodecError::Closed)?;
                let inner = self.inner.as_mut().ok_or(StreamCodecError::Closed)?;
                inner.write_all(&scratch[..produced])?;
            }
            if consumed == 0 && produced == 0 {
                // A correct codec always makes progress here; erroring beats
                // spinning forever.
                return Err(StreamCodecError::StalledCodec {
                    remaining: buf.len() - offset,
                });
            }
            offset += consumed;
        }
        Ok(())
    }

    pub(crate) fn flush_impl(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.direction != Direction::Compress {
            return Err(StreamCodecError::DirectionMismatch {
                operation: "flush",
                direction: self.direction,
            });
        }
        if self.initialized {
            self.drain_step(DrainKind::Flush)?;
        }
        self.inner
            .as_mut()
            .ok_or(StreamCodecError::Closed)?
            .flush()?;
        Ok(())
    }

    /// Run one flush or end step with the full scratch buffer as output and
    /// write whatever it produces to the underlying stream.
    fn drain_step(&mut self, kind: DrainKind) -> Result<()> {
        let produced = {
            let scratch = self.scratch.as_mut().ok_or(StreamCodecError::Closed)?;
            let handle = self.handle.as_mut().ok_or(StreamCodecError::Closed)?;
            let mut output = OutputView::new(scratch.as_mut_slice());
            let session = handle.session_mut()?;
            let status = match kind {
                DrainKind::Flush => session.flush_step(&mut output),
                DrainKind::End => session.end_step(&mut output),
            };
            check_status(self.codec.as_ref(), status)?;
            output.pos()
        };
        if produced > 0 {
            let scratch = self.scratch.as_ref().ok_or(StreamCodecError::Closed)?;
            let inner = self.inner.as_mut().ok_or(StreamCodecError::Closed)?;
            inner.write_all(&scratch[..produced])?;
        }
        Ok(())
    }

    fn finalize_compress(&mut self) -> Result<()> {
        // A never-written stream still emits the end-of-stream epilogue so
        // the output is a valid (empty) compressed stream.
        self.ensure_initialized()?;
        self.drain_step(DrainKind::Flush)?;
        self.drain_step(DrainKind::End)?;
        self.inner
            .as_mut()
            .ok_or(StreamCodecError::Closed)?
            .flush()?;
        Ok(())
    }
}

impl<S: Read> CodecStream<S> {
    /// Create a decompress-direction stream reading from `inner`, with a
    /// direct (non-pooling) resource provider.
    pub fn new_decompress(inner: S, codec: Arc<dyn Codec>) -> Result<Self> {
        let provider: Arc<dyn ResourceProvider> =
            Arc::new(DirectProvider::new(Arc::clone(&codec)));
        Self::new_decompress_with(inner, codec, provider)
    }

    /// Create a decompress-direction stream renting its resources from
    /// `provider`.
    pub fn new_decompress_with(
        inner: S,
        codec: Arc<dyn Codec>,
        provider: Arc<dyn ResourceProvider>,
    ) -> Result<Self> {
        Self::build(
            inner,
            codec,
            provider,
            Direction::Decompress,
            Self::finalize_none,
        )
    }

    pub(crate) fn read_impl(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.ensure_open()?;
        if self.direction != Direction::Decompress {
            return Err(StreamCodecError::DirectionMismatch {
                operation: "read from",
                direction: self.direction,
            });
        }
        self.ensure_initialized()?;

        let mut total = 0;
        while total < buf.len() {
            if self.scratch_pos == self.scratch_fill && !self.depleted {
                let scratch = self.scratch.as_mut().ok_or(StreamCodecError::Closed)?;
                let inner = self.inner.as_mut().ok_or(StreamCodecError::Closed)?;
                let filled = inner.read(scratch.as_mut_slice())?;
                self.scratch_pos = 0;
                self.scratch_fill = filled;
                if filled == 0 {
                    self.depleted = true;
                    trace!("underlying stream exhausted");
                } else {
                    trace!("refilled scratch buffer with {filled} bytes");
                }
            }
            let (consumed, produced) = {
                let scratch = self.scratch.as_ref().ok_or(StreamCodecError::Closed)?;
                let handle = self.handle.as_mut().ok_or(StreamCodecError::Closed)?;
                let mut input = InputView::new(&scratch[self.scratch_pos..self.scratch_fill]);
                let mut output = OutputView::new(&mut buf[total..]);
                let status = handle
                    .session_mut()?
                    .decompress_step(&mut output, &mut input);
                check_status(self.codec.as_ref(), status)?;
                (input.pos(), output.pos())
            };
            if produced == 0 && self.depleted {
                // End of the logical stream.
                break;
            }
            if produced == 0 && consumed == 0 {
                return Err(StreamCodecError::StalledCodec {
                    remaining: self.scratch_fill - self.scratch_pos,
                });
            }
            self.scratch_pos += consumed;
            total += produced;
        }
        Ok(total)
    }
}

impl<S: Read> Read for CodecStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.read_impl(buf).map_err(Into::into)
    }
}

impl<S: Write> Write for CodecStream<S> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.write_impl(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_impl().map_err(Into::into)
    }
}

impl<S> Drop for CodecStream<S> {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.close();
        }
    }
}

impl<S> fmt::Debug for CodecStream<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecStream")
            .field("codec", &self.codec.name())
            .field("direction", &self.direction)
            .field("level", &self.level)
            .field("initialized", &self.initialized)
            .field("closed", &self.closed)
            .field("leave_open", &self.leave_open)
            .finish()
    }
}
