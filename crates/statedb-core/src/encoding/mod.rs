//! Serialization capability and composite state-key encoding.
//!
//! This module defines the pluggable per-type serialization capability
//! ([`TypeSerializer`]) consumed by the composite-key codec, a forward
//! cursor over borrowed bytes ([`ByteReader`]), serializers for common
//! value types, and the [`composite`] module that packs
//! `(key group, key, namespace)` into a single ordered byte string.
//!
//! # Encoding Traits
//!
//! - [`TypeSerializer`] - Serialize values to bytes and back, with a
//!   runtime-queried fixed-length property
//!
//! # Composite Keys
//!
//! The [`composite`] module provides the key-group prefix codec, the
//! ambiguity analysis over serializer pairings, and the length-marking
//! protocol that keeps span boundaries recoverable when both the key and
//! the namespace serializer produce variable-length output.

pub mod composite;
mod primitives;
mod reader;
mod traits;

#[cfg(test)]
mod proptest_tests;

pub use primitives::{
    I32Serializer, I64Serializer, RawBytesSerializer, StringSerializer, U64Serializer,
    UnitSerializer,
};
pub use reader::ByteReader;
pub use traits::TypeSerializer;
