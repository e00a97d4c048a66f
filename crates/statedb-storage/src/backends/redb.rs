//! Redb storage backend.
//!
//! Implements the storage engine traits on top of the Redb embedded
//! database. Redb requires static table names, so logical tables are
//! realized by prefixing every key with its table name inside one physical
//! table; a logical table then occupies one contiguous key range, which
//! keeps logical-table scans plain physical range scans.
//!
//! Cursors stream forward in batches: at most [`BATCH_SIZE`] entries are
//! held in memory at a time, and the next batch is fetched on demand from
//! the key after the last one seen.

use std::collections::VecDeque;
use std::ops::Bound;
use std::path::Path;

use redb::{Database, ReadTransaction, ReadableTable, TableDefinition, WriteTransaction};

use crate::engine::{Cursor, CursorResult, KeyValue, StorageEngine, StorageError, Transaction};

/// The physical table that stores all key-value pairs.
const DATA_TABLE: TableDefinition<'static, &[u8], &[u8]> = TableDefinition::new("statedb_data");

/// Separator byte between table name and key in the encoded key.
const KEY_SEPARATOR: u8 = 0x00;

/// Maximum entries a cursor holds in memory at a time.
const BATCH_SIZE: usize = 1000;

/// Encode a logical table name and key into a physical key:
/// `<table name><separator><key>`.
fn encode_table_key(table: &str, key: &[u8]) -> Vec<u8> {
    let mut encoded = Vec::with_capacity(table.len() + 1 + key.len());
    encoded.extend_from_slice(table.as_bytes());
    encoded.push(KEY_SEPARATOR);
    encoded.extend_from_slice(key);
    encoded
}

/// Decode a physical key back into its logical table name and key.
///
/// Returns `None` if the key is malformed (missing separator).
fn decode_table_key(encoded: &[u8]) -> Option<(&str, &[u8])> {
    let sep_pos = encoded.iter().position(|&b| b == KEY_SEPARATOR)?;
    let table = std::str::from_utf8(&encoded[..sep_pos]).ok()?;
    Some((table, &encoded[sep_pos + 1..]))
}

/// The smallest physical key of a logical table.
fn table_start_key(table: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(table.len() + 1);
    key.extend_from_slice(table.as_bytes());
    key.push(KEY_SEPARATOR);
    key
}

/// The first physical key past a logical table.
fn table_end_key(table: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(table.len() + 1);
    key.extend_from_slice(table.as_bytes());
    key.push(KEY_SEPARATOR + 1);
    key
}

/// Configuration options for the Redb storage engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedbConfig {
    /// Cache size in bytes. If not set, uses Redb's default.
    pub cache_size: Option<usize>,
}

impl RedbConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cache size.
    #[must_use]
    pub const fn cache_size(mut self, size: usize) -> Self {
        self.cache_size = Some(size);
        self
    }
}

/// A storage engine backed by Redb.
pub struct RedbEngine {
    db: Database,
}

impl RedbEngine {
    /// Open or create a database at the given path with default
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the database cannot be opened or
    /// created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::open_with_config(path, RedbConfig::default())
    }

    /// Open or create a database at the given path with custom
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the database cannot be opened or
    /// created.
    pub fn open_with_config(
        path: impl AsRef<Path>,
        config: RedbConfig,
    ) -> Result<Self, StorageError> {
        let mut builder = Database::builder();
        if let Some(cache_size) = config.cache_size {
            builder.set_cache_size(cache_size);
        }
        let db = builder.create(path.as_ref()).map_err(|e| StorageError::Open(e.to_string()))?;
        Ok(Self { db })
    }

    /// Create an in-memory database for testing.
    ///
    /// The data is lost when the engine is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the database cannot be created.
    pub fn in_memory() -> Result<Self, StorageError> {
        let db = Database::builder()
            .create_with_backend(redb::backends::InMemoryBackend::new())
            .map_err(|e| StorageError::Open(e.to_string()))?;
        Ok(Self { db })
    }
}

impl StorageEngine for RedbEngine {
    type Transaction<'a> = RedbTransaction;

    fn begin_read(&self) -> Result<Self::Transaction<'_>, StorageError> {
        let tx = self.db.begin_read().map_err(|e| StorageError::Transaction(e.to_string()))?;
        Ok(RedbTransaction::Read(tx))
    }

    fn begin_write(&self) -> Result<Self::Transaction<'_>, StorageError> {
        let tx = self.db.begin_write().map_err(|e| StorageError::Transaction(e.to_string()))?;
        Ok(RedbTransaction::Write(tx))
    }
}

/// A transaction for the Redb storage engine.
///
/// Wraps both read-only and read-write Redb transactions behind the
/// unified [`Transaction`] trait. Boxing the write transaction would add
/// indirection on every operation, so the size difference between the
/// variants is accepted.
#[allow(clippy::large_enum_variant)]
pub enum RedbTransaction {
    /// A read-only transaction.
    Read(ReadTransaction),
    /// A read-write transaction.
    Write(WriteTransaction),
}

/// Look up one physical key in an open table.
fn get_in<T>(table: &T, encoded_key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    match table.get(encoded_key) {
        Ok(Some(value)) => Ok(Some(value.value().to_vec())),
        Ok(None) => Ok(None),
        Err(e) => Err(StorageError::Internal(e.to_string())),
    }
}

/// Collect up to `limit` logical entries from a physical key range.
fn scan_in<T>(
    table: &T,
    start: &[u8],
    end: &[u8],
    limit: usize,
) -> Result<Vec<KeyValue>, StorageError>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    let mut entries = Vec::new();
    if start >= end {
        return Ok(entries);
    }
    let range = table.range(start..end).map_err(|e| StorageError::Internal(e.to_string()))?;
    for item in range {
        if entries.len() >= limit {
            break;
        }
        let (k, v) = item.map_err(|e| StorageError::Internal(e.to_string()))?;
        if let Some((_, key)) = decode_table_key(k.value()) {
            entries.push((key.to_vec(), v.value().to_vec()));
        }
    }
    Ok(entries)
}

impl RedbTransaction {
    /// Fetch up to `limit` entries of `table` from the physical range
    /// `[start, end)`.
    fn fetch(
        &self,
        start: &[u8],
        end: &[u8],
        limit: usize,
    ) -> Result<Vec<KeyValue>, StorageError> {
        match self {
            Self::Read(tx) => match tx.open_table(DATA_TABLE) {
                Ok(t) => scan_in(&t, start, end, limit),
                // No data table yet means no data.
                Err(redb::TableError::TableDoesNotExist(_)) => Ok(Vec::new()),
                Err(e) => Err(StorageError::Internal(e.to_string())),
            },
            Self::Write(tx) => match tx.open_table(DATA_TABLE) {
                Ok(t) => scan_in(&t, start, end, limit),
                Err(redb::TableError::TableDoesNotExist(_)) => Ok(Vec::new()),
                Err(e) => Err(StorageError::Internal(e.to_string())),
            },
        }
    }
}

impl Transaction for RedbTransaction {
    type Cursor<'a>
        = RedbCursor<'a>
    where
        Self: 'a;

    fn get(&self, table: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let encoded = encode_table_key(table, key);
        match self {
            Self::Read(tx) => match tx.open_table(DATA_TABLE) {
                Ok(t) => get_in(&t, &encoded),
                Err(redb::TableError::TableDoesNotExist(_)) => Ok(None),
                Err(e) => Err(StorageError::Internal(e.to_string())),
            },
            Self::Write(tx) => match tx.open_table(DATA_TABLE) {
                Ok(t) => get_in(&t, &encoded),
                Err(redb::TableError::TableDoesNotExist(_)) => Ok(None),
                Err(e) => Err(StorageError::Internal(e.to_string())),
            },
        }
    }

    fn put(&mut self, table: &str, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        match self {
            Self::Read(_) => Err(StorageError::ReadOnly),
            Self::Write(tx) => {
                let encoded = encode_table_key(table, key);
                let mut t =
                    tx.open_table(DATA_TABLE).map_err(|e| StorageError::Internal(e.to_string()))?;
                t.insert(encoded.as_slice(), value)
                    .map_err(|e| StorageError::Internal(e.to_string()))?;
                Ok(())
            }
        }
    }

    fn delete(&mut self, table: &str, key: &[u8]) -> Result<bool, StorageError> {
        match self {
            Self::Read(_) => Err(StorageError::ReadOnly),
            Self::Write(tx) => {
                let encoded = encode_table_key(table, key);
                match tx.open_table(DATA_TABLE) {
                    Ok(mut t) => match t.remove(encoded.as_slice()) {
                        Ok(Some(_)) => Ok(true),
                        Ok(None) => Ok(false),
                        Err(e) => Err(StorageError::Internal(e.to_string())),
                    },
                    Err(redb::TableError::TableDoesNotExist(_)) => Ok(false),
                    Err(e) => Err(StorageError::Internal(e.to_string())),
                }
            }
        }
    }

    fn range(
        &self,
        table: &str,
        start: Bound<&[u8]>,
        end: Bound<&[u8]>,
    ) -> Result<Self::Cursor<'_>, StorageError> {
        Ok(RedbCursor::new(self, table, start, end))
    }

    fn commit(self) -> Result<(), StorageError> {
        match self {
            // Read transactions need no explicit commit.
            Self::Read(_) => Ok(()),
            Self::Write(tx) => tx.commit().map_err(|e| StorageError::Transaction(e.to_string())),
        }
    }

    fn rollback(self) -> Result<(), StorageError> {
        match self {
            Self::Read(_) => Ok(()),
            Self::Write(tx) => {
                tx.abort().map_err(|e| StorageError::Transaction(e.to_string()))?;
                Ok(())
            }
        }
    }

    fn is_read_only(&self) -> bool {
        matches!(self, Self::Read(_))
    }
}

/// A forward streaming cursor over one logical table's key range.
///
/// At most [`BATCH_SIZE`] entries are resident at a time; iterating a
/// million-entry range uses the same memory as iterating a thousand.
pub struct RedbCursor<'a> {
    tx: &'a RedbTransaction,
    table: String,
    /// Logical lower bound supplied by the caller.
    start: Bound<Vec<u8>>,
    /// Logical upper bound supplied by the caller.
    end: Bound<Vec<u8>>,
    /// Extra inclusive lower clamp installed by `seek`.
    seek_floor: Option<Vec<u8>>,
    /// Logical key of the last entry handed out; continuation point for
    /// the next batch fetch.
    last_key: Option<Vec<u8>>,
    batch: VecDeque<KeyValue>,
    exhausted: bool,
    current: Option<KeyValue>,
}

impl<'a> RedbCursor<'a> {
    fn new(
        tx: &'a RedbTransaction,
        table: &str,
        start: Bound<&[u8]>,
        end: Bound<&[u8]>,
    ) -> Self {
        Self {
            tx,
            table: table.to_owned(),
            start: bound_to_owned(start),
            end: bound_to_owned(end),
            seek_floor: None,
            last_key: None,
            batch: VecDeque::new(),
            exhausted: false,
            current: None,
        }
    }

    /// The physical key the next fetch starts from (inclusive).
    fn physical_start(&self) -> Vec<u8> {
        // Continue strictly after the last yielded key: appending a zero
        // byte yields the immediate successor in byte order.
        if let Some(last) = &self.last_key {
            let mut key = encode_table_key(&self.table, last);
            key.push(0x00);
            return key;
        }

        let mut start = match &self.start {
            Bound::Included(k) => encode_table_key(&self.table, k),
            Bound::Excluded(k) => {
                let mut key = encode_table_key(&self.table, k);
                key.push(0x00);
                key
            }
            Bound::Unbounded => table_start_key(&self.table),
        };

        if let Some(floor) = &self.seek_floor {
            let floor_key = encode_table_key(&self.table, floor);
            if floor_key > start {
                start = floor_key;
            }
        }
        start
    }

    /// The physical key the fetch stops before (exclusive).
    fn physical_end(&self) -> Vec<u8> {
        match &self.end {
            // Include k itself but nothing after it: stop before its
            // immediate successor.
            Bound::Included(k) => {
                let mut key = encode_table_key(&self.table, k);
                key.push(0x00);
                key
            }
            Bound::Excluded(k) => encode_table_key(&self.table, k),
            Bound::Unbounded => table_end_key(&self.table),
        }
    }

    fn fetch_batch(&mut self) -> Result<(), StorageError> {
        let start = self.physical_start();
        let end = self.physical_end();
        let entries = self.tx.fetch(&start, &end, BATCH_SIZE)?;
        if entries.len() < BATCH_SIZE {
            self.exhausted = true;
        }
        self.batch = entries.into();
        Ok(())
    }
}

impl Cursor for RedbCursor<'_> {
    fn seek(&mut self, key: &[u8]) -> CursorResult {
        self.seek_floor = Some(key.to_vec());
        self.last_key = None;
        self.batch.clear();
        self.exhausted = false;
        self.next()
    }

    fn seek_first(&mut self) -> CursorResult {
        self.seek_floor = None;
        self.last_key = None;
        self.batch.clear();
        self.exhausted = false;
        self.next()
    }

    fn next(&mut self) -> CursorResult {
        if self.batch.is_empty() && !self.exhausted {
            self.fetch_batch()?;
        }
        match self.batch.pop_front() {
            Some((key, value)) => {
                self.last_key = Some(key.clone());
                self.current = Some((key, value));
                Ok(self.current.clone())
            }
            None => {
                self.current = None;
                Ok(None)
            }
        }
    }

    fn current(&self) -> Option<(&[u8], &[u8])> {
        self.current.as_ref().map(|(k, v)| (k.as_slice(), v.as_slice()))
    }
}

/// Convert a `Bound<&[u8]>` to `Bound<Vec<u8>>`.
fn bound_to_owned(bound: Bound<&[u8]>) -> Bound<Vec<u8>> {
    match bound {
        Bound::Included(b) => Bound::Included(b.to_vec()),
        Bound::Excluded(b) => Bound::Excluded(b.to_vec()),
        Bound::Unbounded => Bound::Unbounded,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn table_key_roundtrip() {
        let encoded = encode_table_key("state_counters", b"user:123");
        let (table, key) = decode_table_key(&encoded).unwrap();
        assert_eq!(table, "state_counters");
        assert_eq!(key, b"user:123");
    }

    #[test]
    fn table_key_roundtrip_empty_key() {
        let encoded = encode_table_key("config", b"");
        let (table, key) = decode_table_key(&encoded).unwrap();
        assert_eq!(table, "config");
        assert_eq!(key, b"");
    }

    #[test]
    fn table_key_ordering_keeps_tables_contiguous() {
        let key_a = encode_table_key("alpha", b"b");
        let key_b = encode_table_key("alpha", b"c");
        let other = encode_table_key("beta", b"a");
        assert!(key_a < key_b);
        assert!(key_b < other);

        let start = table_start_key("alpha");
        let end = table_end_key("alpha");
        assert!(key_a.as_slice() >= start.as_slice());
        assert!(key_b.as_slice() < end.as_slice());
        assert!(other.as_slice() >= end.as_slice());
    }

    #[test]
    fn in_memory_write_and_read() {
        let engine = RedbEngine::in_memory().expect("failed to create in-memory db");

        {
            let mut tx = engine.begin_write().expect("begin write");
            tx.put("test", b"key", b"value").expect("put");
            tx.commit().expect("commit");
        }
        {
            let tx = engine.begin_read().expect("begin read");
            assert!(tx.is_read_only());
            assert_eq!(tx.get("test", b"key").expect("get"), Some(b"value".to_vec()));
            assert_eq!(tx.get("test", b"missing").expect("get"), None);
            assert_eq!(tx.get("other", b"key").expect("get"), None);
        }
    }

    #[test]
    fn read_only_transaction_rejects_writes() {
        let engine = RedbEngine::in_memory().unwrap();
        let mut tx = engine.begin_read().unwrap();
        assert!(matches!(tx.put("t", b"k", b"v"), Err(StorageError::ReadOnly)));
        assert!(matches!(tx.delete("t", b"k"), Err(StorageError::ReadOnly)));
    }

    #[test]
    fn delete_reports_existence() {
        let engine = RedbEngine::in_memory().unwrap();
        let mut tx = engine.begin_write().unwrap();
        tx.put("t", b"k", b"v").unwrap();
        assert!(tx.delete("t", b"k").unwrap());
        assert!(!tx.delete("t", b"k").unwrap());
        tx.commit().unwrap();
    }

    #[test]
    fn rollback_discards_changes() {
        let engine = RedbEngine::in_memory().unwrap();
        {
            let mut tx = engine.begin_write().unwrap();
            tx.put("t", b"k", b"v").unwrap();
            tx.rollback().unwrap();
        }
        let tx = engine.begin_read().unwrap();
        assert_eq!(tx.get("t", b"k").unwrap(), None);
    }

    #[test]
    fn range_scan_respects_bounds_and_tables() {
        let engine = RedbEngine::in_memory().unwrap();
        {
            let mut tx = engine.begin_write().unwrap();
            for key in [&b"a"[..], b"b", b"c", b"d"] {
                tx.put("first", key, b"1").unwrap();
            }
            tx.put("second", b"b", b"2").unwrap();
            tx.commit().unwrap();
        }

        let tx = engine.begin_read().unwrap();
        let mut cursor = tx
            .range("first", Bound::Included(&b"b"[..]), Bound::Excluded(&b"d"[..]))
            .unwrap();

        let mut seen = Vec::new();
        while let Some((key, _)) = cursor.next().unwrap() {
            seen.push(key);
        }
        assert_eq!(seen, vec![b"b".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn included_end_bound_excludes_extensions() {
        let engine = RedbEngine::in_memory().unwrap();
        {
            let mut tx = engine.begin_write().unwrap();
            tx.put("t", &[1], b"x").unwrap();
            tx.put("t", &[1, 0], b"y").unwrap();
            tx.commit().unwrap();
        }

        let tx = engine.begin_read().unwrap();
        let mut cursor =
            tx.range("t", Bound::Unbounded, Bound::Included(&[1u8][..])).unwrap();
        assert_eq!(cursor.next().unwrap(), Some((vec![1], b"x".to_vec())));
        assert_eq!(cursor.next().unwrap(), None);
    }

    #[test]
    fn cursor_seek_positions_at_first_matching_key() {
        let engine = RedbEngine::in_memory().unwrap();
        {
            let mut tx = engine.begin_write().unwrap();
            for key in [&b"aa"[..], b"ab", b"ba"] {
                tx.put("t", key, b"v").unwrap();
            }
            tx.commit().unwrap();
        }

        let tx = engine.begin_read().unwrap();
        let mut cursor = tx.range("t", Bound::Unbounded, Bound::Unbounded).unwrap();

        let entry = cursor.seek(b"ab").unwrap();
        assert_eq!(entry.map(|(k, _)| k), Some(b"ab".to_vec()));
        assert_eq!(cursor.current().map(|(k, _)| k.to_vec()), Some(b"ab".to_vec()));

        let entry = cursor.next().unwrap();
        assert_eq!(entry.map(|(k, _)| k), Some(b"ba".to_vec()));
        assert_eq!(cursor.next().unwrap(), None);
        assert!(cursor.current().is_none());

        // Seek backwards repositions from the start of the range.
        let entry = cursor.seek(b"a").unwrap();
        assert_eq!(entry.map(|(k, _)| k), Some(b"aa".to_vec()));

        cursor.seek(b"b").unwrap();
        let entry = cursor.seek_first().unwrap();
        assert_eq!(entry.map(|(k, _)| k), Some(b"aa".to_vec()));
    }

    #[test]
    fn cursor_streams_across_batches() {
        let engine = RedbEngine::in_memory().unwrap();
        let total = BATCH_SIZE * 2 + 50;
        {
            let mut tx = engine.begin_write().unwrap();
            for i in 0..total {
                let key = u32::try_from(i).unwrap().to_be_bytes();
                tx.put("t", &key, b"v").unwrap();
            }
            tx.commit().unwrap();
        }

        let tx = engine.begin_read().unwrap();
        let mut cursor = tx.range("t", Bound::Unbounded, Bound::Unbounded).unwrap();
        let mut count = 0usize;
        let mut previous: Option<Vec<u8>> = None;
        while let Some((key, _)) = cursor.next().unwrap() {
            if let Some(prev) = &previous {
                assert!(*prev < key, "cursor must yield ascending keys");
            }
            previous = Some(key);
            count += 1;
        }
        assert_eq!(count, total);
    }

    #[test]
    fn reopen_from_disk_preserves_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.redb");

        {
            let engine = RedbEngine::open(&path).unwrap();
            let mut tx = engine.begin_write().unwrap();
            tx.put("t", b"k", b"v").unwrap();
            tx.commit().unwrap();
        }
        {
            let engine = RedbEngine::open(&path).unwrap();
            let tx = engine.begin_read().unwrap();
            assert_eq!(tx.get("t", b"k").unwrap(), Some(b"v".to_vec()));
        }
    }
}
