//! Error types for the core crate.

use thiserror::Error;

/// Errors that can occur while encoding or decoding composite state keys.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A key group id does not fit in the configured prefix width.
    ///
    /// This is a caller or configuration bug: the prefix width must be
    /// validated against the backend's maximum parallelism before any key
    /// is written.
    #[error("key group {key_group} does not fit in a {prefix_bytes}-byte prefix")]
    KeyGroupOutOfRange {
        /// The key group id that was rejected.
        key_group: u16,
        /// The configured prefix width in bytes.
        prefix_bytes: usize,
    },

    /// A stored key is inconsistent with its own framing.
    ///
    /// Raised when a length marker exceeds the remaining buffer or the
    /// input ends mid-span. Indicates storage corruption or a prefix-width
    /// mismatch between writer and reader configuration.
    #[error("corrupt composite key: {0}")]
    CorruptKey(String),

    /// A value serializer rejected its byte span.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl CoreError {
    /// Creates a [`CoreError::CorruptKey`] from any displayable message.
    #[must_use]
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::CorruptKey(msg.into())
    }

    /// Creates a [`CoreError::Serialization`] from any displayable message.
    #[must_use]
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }
}
