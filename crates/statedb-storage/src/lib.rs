//! StateDB Storage
//!
//! This crate provides the ordered storage engine abstraction and the
//! keyed-state layer of StateDB.
//!
//! # Overview
//!
//! The storage layer has two halves. The [`engine`] module defines a
//! transactional key-value interface over an ordered byte-string store:
//! backends implement [`StorageEngine`], [`Transaction`] and [`Cursor`],
//! and the [`backends`] module ships a [redb](https://docs.rs/redb)
//! implementation. The [`state`] module builds the keyed-state model on
//! top: state entries addressed by `(key, namespace)` are packed into
//! composite byte-string keys (see `statedb-core`) so that key-group
//! handoff and per-key clearing are plain prefix scans against the engine.
//!
//! # Example
//!
//! ```
//! use statedb_core::encoding::{I64Serializer, StringSerializer};
//! use statedb_storage::backends::RedbEngine;
//! use statedb_storage::state::{KeyedStateConfig, KeyedStateTable};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = RedbEngine::in_memory()?;
//! let table = KeyedStateTable::new(
//!     &engine,
//!     "counters",
//!     I64Serializer,
//!     StringSerializer,
//!     KeyedStateConfig::new(128),
//! );
//!
//! table.put(&7, &"window-1".to_owned(), b"42")?;
//! assert_eq!(table.get(&7, &"window-1".to_owned())?, Some(b"42".to_vec()));
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`engine`] - Storage engine traits and error types
//! - [`backends`] - Concrete storage backend implementations
//! - [`state`] - The keyed-state layer

// Deny unwrap in library code to ensure proper error handling
#![deny(clippy::unwrap_used)]

pub mod backends;
pub mod engine;
pub mod state;

pub use engine::{Cursor, CursorResult, KeyValue, StorageEngine, StorageError, StorageResult, Transaction};
pub use state::{KeyedStateConfig, KeyedStateTable, StateEntry, StateError};
