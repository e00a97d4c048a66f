//! The pluggable per-type serialization capability.

use crate::error::CoreError;

use super::reader::ByteReader;

/// Serializes and deserializes values of one type for state storage.
///
/// Implementations are supplied by the caller at configuration time and
/// passed to the codec by reference; the codec never stores or mutates
/// them. Beyond the encode/decode pair, a serializer declares one static
/// property: whether every serialized value occupies the same, statically
/// known number of bytes. The composite-key codec uses that property alone
/// to decide whether a serializer pairing needs explicit length markers;
/// it never inspects serialized values.
///
/// # Contract
///
/// Serialization must be deterministic: equal values produce equal bytes.
/// When a serializer is used on an unmarked decode path (see
/// [`composite::read_key`](super::composite::read_key)), `deserialize`
/// must consume exactly the bytes that `serialize` produced for the value;
/// a serializer that cannot delimit its own output (such as
/// [`RawBytesSerializer`](super::RawBytesSerializer)) is only usable where
/// the codec bounds its span with a length marker.
pub trait TypeSerializer {
    /// The value type this serializer handles.
    type Value;

    /// Serialize `value`, appending its bytes to `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Serialization`] if the value cannot be encoded.
    fn serialize(&self, value: &Self::Value, buf: &mut Vec<u8>) -> Result<(), CoreError>;

    /// Deserialize one value from `reader`, advancing it past the bytes
    /// consumed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Serialization`] if the bytes are malformed for
    /// this type, or [`CoreError::CorruptKey`] if the input ends early.
    fn deserialize(&self, reader: &mut ByteReader<'_>) -> Result<Self::Value, CoreError>;

    /// The byte width of every serialized value, if statically known.
    ///
    /// `Some(n)` declares that every value this serializer produces is
    /// exactly `n` bytes; `None` declares variable-length output.
    fn fixed_length(&self) -> Option<usize>;
}
