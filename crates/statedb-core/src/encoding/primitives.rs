//! Serializers for common key and namespace types.
//!
//! Integers are encoded big-endian at their natural width and report a
//! fixed length. Strings are self-delimiting (u32 length prefix + UTF-8)
//! but still variable-length, so a string/string pairing is treated as
//! ambiguous by the composite-key codec. Raw byte spans carry no framing
//! at all and rely entirely on the codec's length markers.

use crate::error::CoreError;

use super::reader::ByteReader;
use super::traits::TypeSerializer;

/// Big-endian `i32`, 4 bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct I32Serializer;

impl TypeSerializer for I32Serializer {
    type Value = i32;

    fn serialize(&self, value: &i32, buf: &mut Vec<u8>) -> Result<(), CoreError> {
        buf.extend_from_slice(&value.to_be_bytes());
        Ok(())
    }

    fn deserialize(&self, reader: &mut ByteReader<'_>) -> Result<i32, CoreError> {
        reader.read_i32_be()
    }

    fn fixed_length(&self) -> Option<usize> {
        Some(4)
    }
}

/// Big-endian `i64`, 8 bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct I64Serializer;

impl TypeSerializer for I64Serializer {
    type Value = i64;

    fn serialize(&self, value: &i64, buf: &mut Vec<u8>) -> Result<(), CoreError> {
        buf.extend_from_slice(&value.to_be_bytes());
        Ok(())
    }

    fn deserialize(&self, reader: &mut ByteReader<'_>) -> Result<i64, CoreError> {
        reader.read_i64_be()
    }

    fn fixed_length(&self) -> Option<usize> {
        Some(8)
    }
}

/// Big-endian `u64`, 8 bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct U64Serializer;

impl TypeSerializer for U64Serializer {
    type Value = u64;

    fn serialize(&self, value: &u64, buf: &mut Vec<u8>) -> Result<(), CoreError> {
        buf.extend_from_slice(&value.to_be_bytes());
        Ok(())
    }

    fn deserialize(&self, reader: &mut ByteReader<'_>) -> Result<u64, CoreError> {
        reader.read_u64_be()
    }

    fn fixed_length(&self) -> Option<usize> {
        Some(8)
    }
}

/// UTF-8 string with a u32 big-endian length prefix.
///
/// Self-delimiting, so it is safe on unmarked decode paths, but its output
/// width varies with the value.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringSerializer;

impl TypeSerializer for StringSerializer {
    type Value = String;

    fn serialize(&self, value: &String, buf: &mut Vec<u8>) -> Result<(), CoreError> {
        let bytes = value.as_bytes();
        let len = u32::try_from(bytes.len())
            .map_err(|_| CoreError::serialization("string too long"))?;
        buf.extend_from_slice(&len.to_be_bytes());
        buf.extend_from_slice(bytes);
        Ok(())
    }

    fn deserialize(&self, reader: &mut ByteReader<'_>) -> Result<String, CoreError> {
        let len = reader.read_u32_be()? as usize;
        let bytes = reader.read_exact(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| CoreError::serialization(format!("invalid UTF-8: {e}")))
    }

    fn fixed_length(&self) -> Option<usize> {
        None
    }
}

/// Raw bytes with no framing of their own.
///
/// `deserialize` consumes the remainder of its input, so this serializer
/// cannot delimit its own output: it is only usable where the codec bounds
/// the span with a length marker, or as the final field of an encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawBytesSerializer;

impl TypeSerializer for RawBytesSerializer {
    type Value = Vec<u8>;

    fn serialize(&self, value: &Vec<u8>, buf: &mut Vec<u8>) -> Result<(), CoreError> {
        buf.extend_from_slice(value);
        Ok(())
    }

    fn deserialize(&self, reader: &mut ByteReader<'_>) -> Result<Vec<u8>, CoreError> {
        Ok(reader.read_to_end().to_vec())
    }

    fn fixed_length(&self) -> Option<usize> {
        None
    }
}

/// The zero-byte serializer for un-namespaced state.
///
/// State that needs no namespace scoping uses `()` as its namespace type;
/// the serialized span is empty and the composite key ends with the key
/// span.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitSerializer;

impl TypeSerializer for UnitSerializer {
    type Value = ();

    fn serialize(&self, (): &(), _buf: &mut Vec<u8>) -> Result<(), CoreError> {
        Ok(())
    }

    fn deserialize(&self, _reader: &mut ByteReader<'_>) -> Result<(), CoreError> {
        Ok(())
    }

    fn fixed_length(&self) -> Option<usize> {
        Some(0)
    }
}
