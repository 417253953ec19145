//! Resource providers for codec handles and scratch buffers
//!
//! A stream rents its codec handle and scratch buffer from a
//! [`ResourceProvider`] at construction and hands them back on close. Two
//! strategies are provided: [`DirectProvider`] allocates and destroys on
//! every rent/release, [`PooledProvider`] keeps bounded lock-free queues of
//! idle handles (one per direction) and scratch buffers for reuse.
//!
//! Providers are shared across streams and threads; all queue operations are
//! safe under concurrent rent/release without external locking. Handles in a
//! pool are anonymous and fungible within their direction: a rent dequeues
//! whichever idle handle the queue yields first.

use std::fmt;
use std::sync::Arc;

use crossbeam_queue::ArrayQueue;
use log::trace;

use crate::codec::Codec;
use crate::common::{Direction, Result, DEFAULT_POOL_SIZE};
use crate::handle::CodecHandle;

/// Supplies and reclaims codec handles and scratch buffers.
pub trait ResourceProvider: Send + Sync {
    /// Obtain a handle of the given direction, recycled or freshly
    /// allocated.
    fn rent_handle(&self, direction: Direction) -> Result<CodecHandle>;

    /// Return a handle once its stream is done with it.
    fn release_handle(&self, handle: CodecHandle);

    /// Obtain a scratch buffer of at least `size` bytes. Reused buffers are
    /// not zeroed.
    fn rent_buffer(&self, size: usize) -> Vec<u8>;

    /// Return a scratch buffer for potential reuse.
    fn return_buffer(&self, buffer: Vec<u8>);
}

/// Provider that allocates fresh resources on every rent and destroys them
/// on release. No shared state; the safe default.
pub struct DirectProvider {
    codec: Arc<dyn Codec>,
}

impl DirectProvider {
    /// Create a direct provider for the given codec.
    pub fn new(codec: Arc<dyn Codec>) -> Self {
        Self { codec }
    }
}

impl ResourceProvider for DirectProvider {
    fn rent_handle(&self, direction: Direction) -> Result<CodecHandle> {
        CodecHandle::new(self.codec.as_ref(), direction)
    }

    fn release_handle(&self, mut handle: CodecHandle) {
        handle.release();
    }

    fn rent_buffer(&self, size: usize) -> Vec<u8> {
        vec![0; size]
    }

    fn return_buffer(&self, _buffer: Vec<u8>) {}
}

impl fmt::Debug for DirectProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectProvider")
            .field("codec", &self.codec.name())
            .finish()
    }
}

/// Provider that recycles handles and buffers through bounded lock-free
/// queues.
///
/// Each direction has its own queue capped at the configured pool size;
/// releasing into a full queue destroys the handle instead of growing the
/// pool. Recycled sessions are reset by the stream's per-use `init_*` call,
/// so no state leaks between streams.
pub struct PooledProvider {
    codec: Arc<dyn Codec>,
    compress_handles: ArrayQueue<CodecHandle>,
    decompress_handles: ArrayQueue<CodecHandle>,
    buffers: ArrayQueue<Vec<u8>>,
}

impl PooledProvider {
    /// Create a pooled provider with the default pool size.
    pub fn new(codec: Arc<dyn Codec>) -> Self {
        Self::with_pool_size(codec, DEFAULT_POOL_SIZE)
    }

    /// Create a pooled provider keeping at most `pool_size` idle handles per
    /// direction.
    pub fn with_pool_size(codec: Arc<dyn Codec>, pool_size: usize) -> Self {
        let pool_size = pool_size.max(1);
        Self {
            codec,
            compress_handles: ArrayQueue::new(pool_size),
            decompress_handles: ArrayQueue::new(pool_size),
            buffers: ArrayQueue::new(pool_size),
        }
    }

    fn queue(&self, direction: Direction) -> &ArrayQueue<CodecHandle> {
        match direction {
            Direction::Compress => &self.compress_handles,
            Direction::Decompress => &self.decompress_handles,
        }
    }

    /// Number of idle handles currently pooled for a direction.
    pub fn idle_handles(&self, direction: Direction) -> usize {
        self.queue(direction).len()
    }
}

impl ResourceProvider for PooledProvider {
    fn rent_handle(&self, direction: Direction) -> Result<CodecHandle> {
        if let Some(handle) = self.queue(direction).pop() {
            trace!("reusing pooled {direction} handle");
            return Ok(handle);
        }
        trace!("pool miss, allocating new {direction} handle");
        CodecHandle::new(self.codec.as_ref(), direction)
    }

    fn release_handle(&self, mut handle: CodecHandle) {
        if !handle.is_valid() {
            return;
        }
        let direction = handle.direction();
        if let Err(mut rejected) = self.queue(direction).push(handle) {
            trace!("{direction} pool full, destroying handle");
            rejected.release();
        }
    }

    fn rent_buffer(&self, size: usize) -> Vec<u8> {
        match self.buffers.pop() {
            Some(mut buffer) => {
                if buffer.len() < size {
                    buffer.resize(size, 0);
                }
                buffer
            }
            None => vec![0; size],
        }
    }

    fn return_buffer(&self, buffer: Vec<u8>) {
        let _ = self.buffers.push(buffer);
    }
}

impl fmt::Debug for PooledProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledProvider")
            .field("codec", &self.codec.name())
            .field("idle_compress", &self.compress_handles.len())
            .field("idle_decompress", &self.decompress_handles.len())
            .field("idle_buffers", &self.buffers.len())
            .finish()
    }
}
