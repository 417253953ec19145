//! Owned codec session handles
//!
//! A [`CodecHandle`] pairs a native codec session with the direction it was
//! created for. The handle exclusively owns the session between rent and
//! release; releasing takes the session out of the handle exactly once, so a
//! repeated release (for example once explicitly and once during teardown)
//! is a no-op rather than a double free.

use std::fmt;

use crate::codec::{Codec, CodecSession};
use crate::common::{Direction, Result, StreamCodecError};

/// An exclusively owned compression or decompression session.
pub struct CodecHandle {
    direction: Direction,
    session: Option<Box<dyn CodecSession>>,
}

impl CodecHandle {
    /// Create a handle with a freshly allocated session of the given
    /// direction.
    ///
    /// Fails when the codec cannot allocate the native session.
    pub fn new(codec: &dyn Codec, direction: Direction) -> Result<Self> {
        let session = match direction {
            Direction::Compress => codec.create_compress_session()?,
            Direction::Decompress => codec.create_decompress_session()?,
        };
        Ok(Self {
            direction,
            session: Some(session),
        })
    }

    /// Direction the session was created for, fixed for the handle's
    /// lifetime.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// True while the handle still owns its session.
    pub fn is_valid(&self) -> bool {
        self.session.is_some()
    }

    /// Mutable access to the owned session.
    ///
    /// Fails with [`StreamCodecError::HandleReleased`] if the session has
    /// already been released.
    pub fn session_mut(&mut self) -> Result<&mut dyn CodecSession> {
        match self.session.as_deref_mut() {
            Some(session) => Ok(session),
            None => Err(StreamCodecError::HandleReleased),
        }
    }

    /// Destroy the owned session. Idempotent: only the first call drops the
    /// session, later calls find the handle already empty.
    pub fn release(&mut self) {
        drop(self.session.take());
    }
}

impl fmt::Debug for CodecHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecHandle")
            .field("direction", &self.direction)
            .field("valid", &self.is_valid())
            .finish()
    }
}
