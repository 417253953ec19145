//! Error handling for streaming codec operations
//!
//! This module re-exports the error types defined in [`crate::common`]. It
//! uses thiserror for ergonomic error handling and keeps the native codec
//! status code and its decoded message on codec failures.

pub use crate::common::Result;
pub use crate::common::StreamCodecError;
