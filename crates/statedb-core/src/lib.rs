//! StateDB Core
//!
//! This crate provides the shared types and the composite state-key encoding
//! used by the StateDB keyed-state backend.
//!
//! # Overview
//!
//! StateDB addresses every piece of keyed state by three parts: a key group
//! (the partition the entry belongs to), an application key, and a namespace
//! scoping state under that key. To store an entry in an ordered key-value
//! engine, the three parts are packed into one byte string
//!
//! ```text
//! [key-group prefix][key span][namespace span]
//! ```
//!
//! whose lexicographic ordering makes key-group rebalancing scans and
//! per-key namespace clearing plain prefix scans. The [`composite`]
//! module (under [`encoding`]) implements this packing so that the span
//! boundaries are always recoverable from the bytes alone, even when the
//! key and namespace serializers produce variable-length output.
//!
//! # Example
//!
//! ```
//! use statedb_core::encoding::composite::{
//!     deserialize_composite_key, is_ambiguous_key_possible, serialize_composite_key,
//! };
//! use statedb_core::encoding::{I64Serializer, StringSerializer};
//! use statedb_core::{KeyGroup, KeyGroupPrefix};
//!
//! let key_serializer = I64Serializer;
//! let namespace_serializer = StringSerializer;
//! let ambiguous = is_ambiguous_key_possible(&key_serializer, &namespace_serializer);
//! assert!(!ambiguous);
//!
//! let bytes = serialize_composite_key(
//!     KeyGroup::new(7),
//!     KeyGroupPrefix::One,
//!     &42i64,
//!     &key_serializer,
//!     &"window-1".to_owned(),
//!     &namespace_serializer,
//!     ambiguous,
//! )
//! .unwrap();
//!
//! let (group, key, namespace) = deserialize_composite_key(
//!     KeyGroupPrefix::One,
//!     &bytes,
//!     &key_serializer,
//!     &namespace_serializer,
//!     ambiguous,
//! )
//! .unwrap();
//!
//! assert_eq!(group, KeyGroup::new(7));
//! assert_eq!(key, 42);
//! assert_eq!(namespace, "window-1");
//! ```
//!
//! # Modules
//!
//! - [`types`] - Key-group types ([`KeyGroup`], [`KeyGroupRange`], [`KeyGroupPrefix`])
//! - [`encoding`] - The serializer capability and the composite-key codec
//! - [`error`] - Error types ([`CoreError`])
//!
//! [`composite`]: encoding::composite

// Deny unwrap in library code to ensure proper error handling
#![deny(clippy::unwrap_used)]

pub mod encoding;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use encoding::{ByteReader, TypeSerializer};
pub use error::CoreError;
pub use types::{KeyGroup, KeyGroupPrefix, KeyGroupRange};
