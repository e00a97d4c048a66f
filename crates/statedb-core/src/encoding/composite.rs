//! Composite state-key encoding.
//!
//! Every keyed-state entry is stored under a single ordered byte string
//!
//! ```text
//! [key-group prefix][key span][namespace span]
//! ```
//!
//! so the ordered store's native range scans cover both access paths: all
//! entries of one key group are contiguous (rebalancing and snapshot
//! scans), and all namespaces of one key are contiguous within its group
//! (per-key clearing). The encoding must also be unambiguous on its own:
//! given only the bytes, the boundary between the key span and the
//! namespace span has to be recoverable without external metadata.
//!
//! # Ambiguity
//!
//! Serializers are pluggable and need not delimit their own output. If
//! either serializer of a pairing produces statically fixed-width bytes,
//! the split point is always recoverable: the fixed side consumes exactly
//! its declared width and the other side consumes the rest. Only when BOTH
//! sides are variable-length can two different `(key, namespace)` pairs
//! concatenate to identical bytes with different split points.
//! [`is_ambiguous_key_possible`] flags exactly that case, from the
//! serializers' static properties alone.
//!
//! # Length markers
//!
//! For an ambiguous pairing, each span is framed with a 4-byte big-endian
//! `u32` length written before it:
//!
//! ```text
//! [key-group prefix][len][key bytes][len][namespace bytes]
//! ```
//!
//! The writer reserves the 4 bytes, serializes the value, then backpatches
//! the actual span length; if the serializer fails, the reserved region is
//! rolled back before the error propagates. The reader uses the marker to
//! bound the serializer to exactly its span, and repositions the cursor to
//! the span end no matter how many bytes the serializer consumed, so a
//! buggy serializer cannot desynchronize the fields that follow.
//!
//! Whether markers are used is decided once per store instance from the
//! serializer pairing and passed identically to every write and read; a
//! store must never mix marked and unmarked encodings in one table.
//!
//! # Errors
//!
//! Decoding never guesses: a marker that overruns the remaining buffer is
//! [`CoreError::CorruptKey`], a serializer rejecting its span is
//! [`CoreError::Serialization`], and both abort the read of that entry.

use crate::error::CoreError;
use crate::types::{KeyGroup, KeyGroupPrefix};

use super::reader::ByteReader;
use super::traits::TypeSerializer;

/// Byte width of the length marker framing a span of an ambiguous pairing.
const LENGTH_MARKER_BYTES: usize = 4;

/// Write `group` as a big-endian prefix of exactly `prefix.bytes()` bytes.
///
/// # Errors
///
/// Returns [`CoreError::KeyGroupOutOfRange`] if the group id does not fit
/// the width. Callers must validate the width against the configured
/// maximum parallelism before writing any key.
pub fn write_key_group(
    group: KeyGroup,
    prefix: KeyGroupPrefix,
    buf: &mut Vec<u8>,
) -> Result<(), CoreError> {
    let id = group.as_u16();
    match prefix {
        KeyGroupPrefix::One => {
            let byte = u8::try_from(id).map_err(|_| CoreError::KeyGroupOutOfRange {
                key_group: id,
                prefix_bytes: prefix.bytes(),
            })?;
            buf.push(byte);
        }
        KeyGroupPrefix::Two => buf.extend_from_slice(&id.to_be_bytes()),
    }
    Ok(())
}

/// Read a key-group prefix of exactly `prefix.bytes()` bytes.
///
/// Symmetric with [`write_key_group`]: advances the cursor by the prefix
/// width and nothing else.
///
/// # Errors
///
/// Returns [`CoreError::CorruptKey`] if the input is shorter than the
/// prefix width.
pub fn read_key_group(
    prefix: KeyGroupPrefix,
    reader: &mut ByteReader<'_>,
) -> Result<KeyGroup, CoreError> {
    let id = match prefix {
        KeyGroupPrefix::One => u16::from(reader.read_u8()?),
        KeyGroupPrefix::Two => reader.read_u16_be()?,
    };
    Ok(KeyGroup::new(id))
}

/// Whether a key/namespace serializer pairing can produce colliding
/// concatenations.
///
/// True if and only if both serializers report variable-length output. A
/// pure predicate over the serializers' static properties; serialized
/// values are never inspected.
#[must_use]
pub fn is_ambiguous_key_possible<KS, NS>(key_serializer: &KS, namespace_serializer: &NS) -> bool
where
    KS: TypeSerializer,
    NS: TypeSerializer,
{
    key_serializer.fixed_length().is_none() && namespace_serializer.fixed_length().is_none()
}

/// Write the key span, framing it with a length marker when
/// `ambiguous_key_possible` is set.
///
/// # Errors
///
/// Propagates serializer failures as [`CoreError::Serialization`]; on
/// failure the output buffer is restored to its length before the call.
pub fn write_key<S: TypeSerializer>(
    key: &S::Value,
    serializer: &S,
    buf: &mut Vec<u8>,
    ambiguous_key_possible: bool,
) -> Result<(), CoreError> {
    write_span(key, serializer, buf, ambiguous_key_possible)
}

/// Write the namespace span; identical mechanics to [`write_key`].
///
/// # Errors
///
/// Propagates serializer failures as [`CoreError::Serialization`]; on
/// failure the output buffer is restored to its length before the call.
pub fn write_namespace<S: TypeSerializer>(
    namespace: &S::Value,
    serializer: &S,
    buf: &mut Vec<u8>,
    ambiguous_key_possible: bool,
) -> Result<(), CoreError> {
    write_span(namespace, serializer, buf, ambiguous_key_possible)
}

/// Read the key span written by [`write_key`] with the same verdict.
///
/// Without a marker the serializer reads directly from the shared cursor
/// and must consume exactly the bytes it wrote. With a marker the
/// serializer is bounded to the marked span, and the cursor lands on the
/// first byte after the span regardless of the serializer's own consumption.
///
/// # Errors
///
/// Returns [`CoreError::CorruptKey`] if the marker overruns the remaining
/// buffer, or [`CoreError::Serialization`] if the serializer rejects the
/// span.
pub fn read_key<S: TypeSerializer>(
    serializer: &S,
    reader: &mut ByteReader<'_>,
    ambiguous_key_possible: bool,
) -> Result<S::Value, CoreError> {
    read_span(serializer, reader, ambiguous_key_possible)
}

/// Read the namespace span; mirrors [`read_key`].
///
/// # Errors
///
/// Returns [`CoreError::CorruptKey`] if the marker overruns the remaining
/// buffer, or [`CoreError::Serialization`] if the serializer rejects the
/// span.
pub fn read_namespace<S: TypeSerializer>(
    serializer: &S,
    reader: &mut ByteReader<'_>,
    ambiguous_key_possible: bool,
) -> Result<S::Value, CoreError> {
    read_span(serializer, reader, ambiguous_key_possible)
}

fn write_span<S: TypeSerializer>(
    value: &S::Value,
    serializer: &S,
    buf: &mut Vec<u8>,
    marked: bool,
) -> Result<(), CoreError> {
    if !marked {
        return serializer.serialize(value, buf);
    }

    let marker_at = buf.len();
    buf.extend_from_slice(&[0u8; LENGTH_MARKER_BYTES]);

    let span_len = serializer.serialize(value, buf).and_then(|()| {
        u32::try_from(buf.len() - marker_at - LENGTH_MARKER_BYTES)
            .map_err(|_| CoreError::serialization("serialized span exceeds u32 length"))
    });

    match span_len {
        Ok(len) => {
            buf[marker_at..marker_at + LENGTH_MARKER_BYTES].copy_from_slice(&len.to_be_bytes());
            Ok(())
        }
        Err(e) => {
            // Roll back the reserved marker and any partial span.
            buf.truncate(marker_at);
            Err(e)
        }
    }
}

fn read_span<S: TypeSerializer>(
    serializer: &S,
    reader: &mut ByteReader<'_>,
    marked: bool,
) -> Result<S::Value, CoreError> {
    if !marked {
        return serializer.deserialize(reader);
    }

    let len = reader.read_u32_be()? as usize;
    let span = reader.read_exact(len)?;
    let mut span_reader = ByteReader::new(span);
    serializer.deserialize(&mut span_reader)
}

/// Serialize a full composite key: prefix, key span, namespace span.
///
/// The returned bytes are handed to the ordered store as its native key;
/// their lexicographic ordering is what the key-group and per-key scans
/// rely on.
///
/// # Errors
///
/// Any failure from [`write_key_group`], [`write_key`] or
/// [`write_namespace`].
pub fn serialize_composite_key<KS, NS>(
    group: KeyGroup,
    prefix: KeyGroupPrefix,
    key: &KS::Value,
    key_serializer: &KS,
    namespace: &NS::Value,
    namespace_serializer: &NS,
    ambiguous_key_possible: bool,
) -> Result<Vec<u8>, CoreError>
where
    KS: TypeSerializer,
    NS: TypeSerializer,
{
    let mut buf = Vec::with_capacity(prefix.bytes() + 16);
    write_key_group(group, prefix, &mut buf)?;
    write_key(key, key_serializer, &mut buf, ambiguous_key_possible)?;
    write_namespace(namespace, namespace_serializer, &mut buf, ambiguous_key_possible)?;
    Ok(buf)
}

/// Decode a full composite key back into `(group, key, namespace)`.
///
/// Consumes the same bytes in the same order as
/// [`serialize_composite_key`] produced them; trailing garbage after the
/// namespace span is rejected.
///
/// # Errors
///
/// Any failure from [`read_key_group`], [`read_key`] or
/// [`read_namespace`]; [`CoreError::CorruptKey`] if bytes remain after the
/// namespace span.
pub fn deserialize_composite_key<KS, NS>(
    prefix: KeyGroupPrefix,
    bytes: &[u8],
    key_serializer: &KS,
    namespace_serializer: &NS,
    ambiguous_key_possible: bool,
) -> Result<(KeyGroup, KS::Value, NS::Value), CoreError>
where
    KS: TypeSerializer,
    NS: TypeSerializer,
{
    let mut reader = ByteReader::new(bytes);
    let group = read_key_group(prefix, &mut reader)?;
    let key = read_key(key_serializer, &mut reader, ambiguous_key_possible)?;
    let namespace = read_namespace(namespace_serializer, &mut reader, ambiguous_key_possible)?;
    if reader.has_remaining() {
        return Err(CoreError::corrupt(format!(
            "{} trailing bytes after namespace span",
            reader.remaining()
        )));
    }
    Ok((group, key, namespace))
}

/// The scan prefix covering every entry of one key group.
///
/// # Errors
///
/// Returns [`CoreError::KeyGroupOutOfRange`] if the group id does not fit
/// the prefix width.
pub fn key_group_scan_prefix(
    group: KeyGroup,
    prefix: KeyGroupPrefix,
) -> Result<Vec<u8>, CoreError> {
    let mut buf = Vec::with_capacity(prefix.bytes());
    write_key_group(group, prefix, &mut buf)?;
    Ok(buf)
}

/// The scan prefix covering every namespace of one key: prefix plus key
/// span, exactly as [`serialize_composite_key`] lays them out.
///
/// # Errors
///
/// Any failure from [`write_key_group`] or [`write_key`].
pub fn key_scan_prefix<KS>(
    group: KeyGroup,
    prefix: KeyGroupPrefix,
    key: &KS::Value,
    key_serializer: &KS,
    ambiguous_key_possible: bool,
) -> Result<Vec<u8>, CoreError>
where
    KS: TypeSerializer,
{
    let mut buf = Vec::with_capacity(prefix.bytes() + 16);
    write_key_group(group, prefix, &mut buf)?;
    write_key(key, key_serializer, &mut buf, ambiguous_key_possible)?;
    Ok(buf)
}
