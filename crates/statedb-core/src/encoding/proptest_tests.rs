//! Property-based tests for composite-key round-trips.

#![allow(clippy::expect_used)]

use proptest::prelude::*;

use crate::encoding::composite::{
    deserialize_composite_key, is_ambiguous_key_possible, serialize_composite_key,
};
use crate::encoding::{I64Serializer, RawBytesSerializer, StringSerializer};
use crate::types::{KeyGroup, KeyGroupPrefix};

/// Strategy for key groups addressable with a one-byte prefix.
fn arb_small_group() -> impl Strategy<Value = KeyGroup> {
    (0..=255u16).prop_map(KeyGroup::new)
}

/// Strategy for the full two-byte-prefix group space.
fn arb_group() -> impl Strategy<Value = KeyGroup> {
    (0..=32766u16).prop_map(KeyGroup::new)
}

proptest! {
    #[test]
    fn unambiguous_composite_roundtrip(
        group in arb_small_group(),
        key in any::<i64>(),
        namespace in ".*",
    ) {
        let ambiguous = is_ambiguous_key_possible(&I64Serializer, &StringSerializer);
        prop_assert!(!ambiguous);

        let bytes = serialize_composite_key(
            group,
            KeyGroupPrefix::One,
            &key,
            &I64Serializer,
            &namespace,
            &StringSerializer,
            ambiguous,
        )
        .expect("encoding should succeed");

        let (decoded_group, decoded_key, decoded_namespace) = deserialize_composite_key(
            KeyGroupPrefix::One,
            &bytes,
            &I64Serializer,
            &StringSerializer,
            ambiguous,
        )
        .expect("decoding should succeed");

        prop_assert_eq!(decoded_group, group);
        prop_assert_eq!(decoded_key, key);
        prop_assert_eq!(decoded_namespace, namespace);
    }

    #[test]
    fn ambiguous_composite_roundtrip(
        group in arb_group(),
        key in prop::collection::vec(any::<u8>(), 0..64),
        namespace in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        let ambiguous = is_ambiguous_key_possible(&RawBytesSerializer, &RawBytesSerializer);
        prop_assert!(ambiguous);

        let bytes = serialize_composite_key(
            group,
            KeyGroupPrefix::Two,
            &key,
            &RawBytesSerializer,
            &namespace,
            &RawBytesSerializer,
            ambiguous,
        )
        .expect("encoding should succeed");

        let (decoded_group, decoded_key, decoded_namespace) = deserialize_composite_key(
            KeyGroupPrefix::Two,
            &bytes,
            &RawBytesSerializer,
            &RawBytesSerializer,
            ambiguous,
        )
        .expect("decoding should succeed");

        prop_assert_eq!(decoded_group, group);
        prop_assert_eq!(decoded_key, key);
        prop_assert_eq!(decoded_namespace, namespace);
    }

    #[test]
    fn marked_encoding_is_injective(
        group in arb_small_group(),
        first_key in prop::collection::vec(any::<u8>(), 0..32),
        first_namespace in prop::collection::vec(any::<u8>(), 0..32),
        second_key in prop::collection::vec(any::<u8>(), 0..32),
        second_namespace in prop::collection::vec(any::<u8>(), 0..32),
    ) {
        prop_assume!((&first_key, &first_namespace) != (&second_key, &second_namespace));

        let encode = |key: &Vec<u8>, namespace: &Vec<u8>| {
            serialize_composite_key(
                group,
                KeyGroupPrefix::One,
                key,
                &RawBytesSerializer,
                namespace,
                &RawBytesSerializer,
                true,
            )
            .expect("encoding should succeed")
        };

        prop_assert_ne!(
            encode(&first_key, &first_namespace),
            encode(&second_key, &second_namespace)
        );
    }
}
