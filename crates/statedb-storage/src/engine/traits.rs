//! Core storage engine traits.
//!
//! Backends expose an ordered byte-string keyspace partitioned into named
//! logical tables. Keys within a table are ordered lexicographically over
//! their raw bytes; the keyed-state layer depends on that ordering for
//! its prefix scans, so backends must never reorder or transform keys.
//!
//! Cursors iterate forward only. Every scan the state layer performs is a
//! bounded ascending prefix scan, so reverse iteration is deliberately not
//! part of the contract.

use std::ops::Bound;
use std::sync::Arc;

use super::StorageError;

/// A key-value pair returned by cursor operations.
pub type KeyValue = (Vec<u8>, Vec<u8>);

/// Result type for cursor operations that yield a key-value pair.
pub type CursorResult = Result<Option<KeyValue>, StorageError>;

/// A storage engine that provides transactional key-value operations.
///
/// Implementations must be thread-safe (`Send + Sync`); transactions
/// themselves are single-threaded.
pub trait StorageEngine: Send + Sync {
    /// The transaction type for this engine.
    type Transaction<'a>: Transaction
    where
        Self: 'a;

    /// Begin a read-only transaction.
    ///
    /// Read transactions see a consistent snapshot; any number may run
    /// concurrently.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Transaction`] if the transaction cannot be
    /// started.
    fn begin_read(&self) -> Result<Self::Transaction<'_>, StorageError>;

    /// Begin a read-write transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Transaction`] if the transaction cannot be
    /// started.
    fn begin_write(&self) -> Result<Self::Transaction<'_>, StorageError>;
}

/// A transaction over the engine's logical tables.
///
/// Write transactions must be committed explicitly; dropping one without
/// committing rolls its changes back.
pub trait Transaction {
    /// The cursor type for iteration.
    type Cursor<'a>: Cursor
    where
        Self: 'a;

    /// Get a value by key from a table.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn get(&self, table: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    /// Put a key-value pair into a table, replacing any existing value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ReadOnly`] on a read-only transaction, or
    /// another error if the write fails.
    fn put(&mut self, table: &str, key: &[u8], value: &[u8]) -> Result<(), StorageError>;

    /// Delete a key from a table.
    ///
    /// # Returns
    ///
    /// `Ok(true)` if the key existed, `Ok(false)` otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ReadOnly`] on a read-only transaction, or
    /// another error if the delete fails.
    fn delete(&mut self, table: &str, key: &[u8]) -> Result<bool, StorageError>;

    /// Create a cursor over a key range of a table, in ascending byte
    /// order.
    ///
    /// The cursor starts unpositioned; advance it with [`Cursor::next`] or
    /// position it with [`Cursor::seek`].
    ///
    /// # Errors
    ///
    /// Returns an error if the scan cannot be started.
    fn range(
        &self,
        table: &str,
        start: Bound<&[u8]>,
        end: Bound<&[u8]>,
    ) -> Result<Self::Cursor<'_>, StorageError>;

    /// Commit the transaction, making all changes durable.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Transaction`] if the commit fails.
    fn commit(self) -> Result<(), StorageError>;

    /// Roll the transaction back, discarding all changes.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Transaction`] if the rollback fails.
    fn rollback(self) -> Result<(), StorageError>;

    /// Whether this is a read-only transaction.
    fn is_read_only(&self) -> bool;
}

/// A cursor for forward iteration over key-value pairs.
///
/// # Iteration Pattern
///
/// ```ignore
/// let mut cursor = tx.range("table", start, end)?;
/// while let Some((key, value)) = cursor.next()? {
///     // process the pair
/// }
/// ```
pub trait Cursor {
    /// Position at the first key greater than or equal to `key` (within
    /// the cursor's range) and return that entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying scan fails.
    fn seek(&mut self, key: &[u8]) -> CursorResult;

    /// Position at the first entry of the range and return it.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying scan fails.
    fn seek_first(&mut self) -> CursorResult;

    /// Advance to the next entry and return it, or `None` at the end.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying scan fails.
    fn next(&mut self) -> CursorResult;

    /// The entry the cursor is positioned on, without advancing.
    fn current(&self) -> Option<(&[u8], &[u8])>;
}

/// Implement `StorageEngine` for `Arc<E>` to allow shared ownership of
/// engines across components.
impl<E: StorageEngine> StorageEngine for Arc<E> {
    type Transaction<'a>
        = E::Transaction<'a>
    where
        Self: 'a;

    fn begin_read(&self) -> Result<Self::Transaction<'_>, StorageError> {
        (**self).begin_read()
    }

    fn begin_write(&self) -> Result<Self::Transaction<'_>, StorageError> {
        (**self).begin_write()
    }
}
