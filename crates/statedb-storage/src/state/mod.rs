//! The keyed-state layer.
//!
//! State entries are addressed by an application key and a namespace, and
//! sharded across key groups. This module binds the composite-key codec
//! from `statedb-core` to a storage engine: every entry is stored under
//! its composite byte-string key, in one logical table per named state, so
//! the two bulk access paths are prefix scans:
//!
//! - all entries of one key group, for rebalancing and snapshot handoff
//!   ([`KeyedStateTable::entries_in_key_group`]);
//! - all namespaces of one key, for per-key clearing
//!   ([`KeyedStateTable::clear_key`]).
//!
//! The composite encoding for a table (key-group prefix width, length
//! markers) is fixed at construction from the store configuration and the
//! serializer pairing, and applied identically to every write and read.

mod config;
mod error;
mod table;

pub use config::KeyedStateConfig;
pub use error::StateError;
pub use table::{KeyedStateTable, StateEntry};
