//! Keyed-state tables over a storage engine.

use std::ops::Bound;

use tracing::{debug, info};

use statedb_core::encoding::composite::{
    deserialize_composite_key, is_ambiguous_key_possible, key_group_scan_prefix, key_scan_prefix,
    serialize_composite_key,
};
use statedb_core::{KeyGroup, KeyGroupPrefix, TypeSerializer};

use crate::engine::{Cursor, StorageEngine, Transaction};

use super::config::KeyedStateConfig;
use super::error::StateError;

/// One decoded state entry, as returned by scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateEntry<K, N> {
    /// The application key.
    pub key: K,
    /// The namespace scoping the entry under its key.
    pub namespace: N,
    /// The stored value bytes.
    pub value: Vec<u8>,
}

/// A named keyed-state table bound to a storage engine.
///
/// Each table owns one logical table in the engine and fixes its composite
/// encoding at construction: the key-group prefix width comes from the
/// store configuration, and length markers are used exactly when the
/// key/namespace serializer pairing is ambiguous. Entries written by one
/// table instance are readable by any instance constructed with the same
/// name, serializers and configuration.
pub struct KeyedStateTable<'e, E, KS, NS> {
    engine: &'e E,
    table: String,
    key_serializer: KS,
    namespace_serializer: NS,
    config: KeyedStateConfig,
    prefix: KeyGroupPrefix,
    ambiguous_key_possible: bool,
}

/// The logical engine table backing a named state.
fn state_table_name(name: &str) -> String {
    format!("state_{name}")
}

impl<'e, E, KS, NS> KeyedStateTable<'e, E, KS, NS>
where
    E: StorageEngine,
    KS: TypeSerializer,
    NS: TypeSerializer,
{
    /// Bind a named state to `engine`.
    pub fn new(
        engine: &'e E,
        name: &str,
        key_serializer: KS,
        namespace_serializer: NS,
        config: KeyedStateConfig,
    ) -> Self {
        let prefix = config.key_group_prefix();
        let ambiguous_key_possible =
            is_ambiguous_key_possible(&key_serializer, &namespace_serializer);
        debug!(
            state = name,
            prefix_bytes = prefix.bytes(),
            ambiguous_key_possible,
            "opened keyed state table"
        );
        Self {
            engine,
            table: state_table_name(name),
            key_serializer,
            namespace_serializer,
            config,
            prefix,
            ambiguous_key_possible,
        }
    }

    /// Whether this table frames its key and namespace spans with length
    /// markers.
    #[must_use]
    pub const fn ambiguous_key_possible(&self) -> bool {
        self.ambiguous_key_possible
    }

    /// Assign the key group for `key`, rejecting groups this instance does
    /// not own.
    fn key_group_of(&self, key: &KS::Value) -> Result<KeyGroup, StateError> {
        let mut key_bytes = Vec::new();
        self.key_serializer.serialize(key, &mut key_bytes)?;
        let group = KeyGroup::for_key(&key_bytes, self.config.max_parallelism());
        if !self.config.key_group_range().contains(group) {
            return Err(StateError::UnownedKeyGroup { key_group: group.as_u16() });
        }
        Ok(group)
    }

    /// Build the composite storage key for `(key, namespace)`.
    fn composite_key(&self, key: &KS::Value, namespace: &NS::Value) -> Result<Vec<u8>, StateError> {
        let group = self.key_group_of(key)?;
        let bytes = serialize_composite_key(
            group,
            self.prefix,
            key,
            &self.key_serializer,
            namespace,
            &self.namespace_serializer,
            self.ambiguous_key_possible,
        )?;
        Ok(bytes)
    }

    /// Store `value` under `(key, namespace)`, replacing any previous
    /// value.
    ///
    /// # Errors
    ///
    /// Fails if the key encodes to an unowned key group, or on codec or
    /// storage failure.
    pub fn put(
        &self,
        key: &KS::Value,
        namespace: &NS::Value,
        value: &[u8],
    ) -> Result<(), StateError> {
        let composite = self.composite_key(key, namespace)?;
        let mut tx = self.engine.begin_write()?;
        tx.put(&self.table, &composite, value)?;
        tx.commit()?;
        Ok(())
    }

    /// Fetch the value under `(key, namespace)`.
    ///
    /// # Errors
    ///
    /// Fails if the key encodes to an unowned key group, or on codec or
    /// storage failure.
    pub fn get(
        &self,
        key: &KS::Value,
        namespace: &NS::Value,
    ) -> Result<Option<Vec<u8>>, StateError> {
        let composite = self.composite_key(key, namespace)?;
        let tx = self.engine.begin_read()?;
        Ok(tx.get(&self.table, &composite)?)
    }

    /// Remove the entry under `(key, namespace)`.
    ///
    /// Returns whether an entry existed.
    ///
    /// # Errors
    ///
    /// Fails if the key encodes to an unowned key group, or on codec or
    /// storage failure.
    pub fn delete(&self, key: &KS::Value, namespace: &NS::Value) -> Result<bool, StateError> {
        let composite = self.composite_key(key, namespace)?;
        let mut tx = self.engine.begin_write()?;
        let existed = tx.delete(&self.table, &composite)?;
        tx.commit()?;
        Ok(existed)
    }

    /// All entries of one key group, in composite-key order.
    ///
    /// This is the rebalancing/snapshot path: the group's entries form one
    /// contiguous byte range, so the scan is a single prefix scan.
    ///
    /// # Errors
    ///
    /// Fails if `group` is not owned by this instance, or on codec or
    /// storage failure. A key that fails to decode aborts the scan rather
    /// than being skipped.
    pub fn entries_in_key_group(
        &self,
        group: KeyGroup,
    ) -> Result<Vec<StateEntry<KS::Value, NS::Value>>, StateError> {
        if !self.config.key_group_range().contains(group) {
            return Err(StateError::UnownedKeyGroup { key_group: group.as_u16() });
        }
        let start = key_group_scan_prefix(group, self.prefix)?;
        self.scan_prefix(&start)
    }

    /// All entries this instance owns, across its whole key-group range.
    ///
    /// # Errors
    ///
    /// Fails on codec or storage failure.
    pub fn entries(&self) -> Result<Vec<StateEntry<KS::Value, NS::Value>>, StateError> {
        let range = self.config.key_group_range();
        let start = key_group_scan_prefix(range.start(), self.prefix)?;
        let last = key_group_scan_prefix(range.end(), self.prefix)?;
        let tx = self.engine.begin_read()?;
        let mut cursor = self.range_cursor(&tx, &start, &last)?;

        let mut entries = Vec::new();
        while let Some((composite, value)) = cursor.next()? {
            entries.push(self.decode_entry(&composite, value)?);
        }
        Ok(entries)
    }

    /// All namespaces currently holding state for `key`, in composite-key
    /// order.
    ///
    /// # Errors
    ///
    /// Fails if the key encodes to an unowned key group, or on codec or
    /// storage failure.
    pub fn namespaces_for_key(&self, key: &KS::Value) -> Result<Vec<NS::Value>, StateError> {
        let group = self.key_group_of(key)?;
        let prefix =
            key_scan_prefix(group, self.prefix, key, &self.key_serializer, self.ambiguous_key_possible)?;
        let entries = self.scan_prefix(&prefix)?;
        Ok(entries.into_iter().map(|entry| entry.namespace).collect())
    }

    /// Drop every namespace's state for `key`, returning how many entries
    /// were removed.
    ///
    /// # Errors
    ///
    /// Fails if the key encodes to an unowned key group, or on codec or
    /// storage failure.
    pub fn clear_key(&self, key: &KS::Value) -> Result<usize, StateError> {
        let group = self.key_group_of(key)?;
        let prefix =
            key_scan_prefix(group, self.prefix, key, &self.key_serializer, self.ambiguous_key_possible)?;

        let mut tx = self.engine.begin_write()?;
        let doomed = {
            let mut cursor = self.range_cursor(&tx, &prefix, &prefix)?;
            let mut keys = Vec::new();
            while let Some((composite, _)) = cursor.next()? {
                keys.push(composite);
            }
            keys
        };
        for composite in &doomed {
            tx.delete(&self.table, composite)?;
        }
        tx.commit()?;

        info!(state = self.table.as_str(), removed = doomed.len(), "cleared all namespaces for key");
        Ok(doomed.len())
    }

    /// Open a cursor over `[start_prefix, successor(end_prefix))` in the
    /// backing table.
    fn range_cursor<'t, T: Transaction>(
        &self,
        tx: &'t T,
        start_prefix: &[u8],
        end_prefix: &[u8],
    ) -> Result<T::Cursor<'t>, StateError> {
        let end = prefix_successor(end_prefix);
        let end_bound = match &end {
            Some(key) => Bound::Excluded(key.as_slice()),
            None => Bound::Unbounded,
        };
        Ok(tx.range(&self.table, Bound::Included(start_prefix), end_bound)?)
    }

    /// Scan every entry whose composite key starts with `prefix`.
    fn scan_prefix(
        &self,
        prefix: &[u8],
    ) -> Result<Vec<StateEntry<KS::Value, NS::Value>>, StateError> {
        let tx = self.engine.begin_read()?;
        let mut cursor = self.range_cursor(&tx, prefix, prefix)?;

        let mut entries = Vec::new();
        while let Some((composite, value)) = cursor.next()? {
            entries.push(self.decode_entry(&composite, value)?);
        }
        Ok(entries)
    }

    fn decode_entry(
        &self,
        composite: &[u8],
        value: Vec<u8>,
    ) -> Result<StateEntry<KS::Value, NS::Value>, StateError> {
        let (_, key, namespace) = deserialize_composite_key(
            self.prefix,
            composite,
            &self.key_serializer,
            &self.namespace_serializer,
            self.ambiguous_key_possible,
        )?;
        Ok(StateEntry { key, namespace, value })
    }
}

/// The smallest byte string greater than every string starting with
/// `prefix`, or `None` if no such bound exists (all bytes are `0xFF`).
fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut bound = prefix.to_vec();
    while let Some(last) = bound.last_mut() {
        if *last < 0xFF {
            *last += 1;
            return Some(bound);
        }
        bound.pop();
    }
    None
}
