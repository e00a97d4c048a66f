//! Error types for the keyed-state layer.

use thiserror::Error;

use statedb_core::CoreError;

use crate::engine::StorageError;

/// Errors that can occur in keyed-state operations.
///
/// Codec and storage failures are propagated unchanged: a key that fails
/// to decode is surfaced to the caller rather than skipped, since skipping
/// would silently drop state from scans.
#[derive(Debug, Error)]
pub enum StateError {
    /// A key hashed to a key group outside this store instance's range.
    #[error("key group {key_group} is not owned by this store instance")]
    UnownedKeyGroup {
        /// The key group the key was assigned to.
        key_group: u16,
    },

    /// A composite key failed to encode or decode.
    #[error("key codec error: {0}")]
    Codec(#[from] CoreError),

    /// The storage engine failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
