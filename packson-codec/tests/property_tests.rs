//! Property-based tests for the codec

use packson_codec::{decode, decode_with, encode, encode_with, DecodeOptions, EncodeOptions, Limits};
use proptest::prelude::*;
use serde_json::{Map, Number, Value};

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        any::<u64>().prop_map(Value::from),
        (-1_000i64..1_000).prop_map(Value::from),
        any::<f64>()
            .prop_filter_map("finite", Number::from_f64)
            .prop_map(Value::Number),
        "[a-z]{0,6}".prop_map(Value::String),
        "\\PC{0,12}".prop_map(Value::String),
    ]
}

fn json_value() -> impl Strategy<Value = Value> {
    leaf().prop_recursive(5, 96, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..8).prop_map(Value::Array),
            prop::collection::btree_map("[a-e]{1,3}", inner.clone(), 0..6)
                .prop_map(|map| Value::Object(map.into_iter().collect::<Map<_, _>>())),
            // same keys across records exercises the columnar path
            prop::collection::vec(
                prop::collection::btree_map("[a-d]", inner, 0..4)
                    .prop_map(|map| Value::Object(map.into_iter().collect::<Map<_, _>>())),
                2..6,
            )
            .prop_map(Value::Array),
        ]
    })
}

fn small_limits() -> DecodeOptions {
    DecodeOptions {
        limits: Limits {
            max_array_len: 1_024,
            max_total_elements: 4_096,
            max_strings: 1_024,
            max_string_refs: 4_096,
            max_string_bytes: 1 << 20,
        },
    }
}

proptest! {
    #[test]
    fn test_round_trip(value in json_value()) {
        let bytes = encode(&value).unwrap();
        prop_assert_eq!(decode(&bytes).unwrap(), value);
    }

    #[test]
    fn test_chunk_size_independence(value in json_value(), chunk_size in 1usize..256) {
        let reference = encode(&value).unwrap();
        let chunked = encode_with(&value, &EncodeOptions::with_chunk_size(chunk_size)).unwrap();
        prop_assert_eq!(chunked, reference);
    }

    #[test]
    fn test_integer_runs(values in prop::collection::vec(any::<i64>(), 1..64)) {
        let value = Value::Array(values.into_iter().map(Value::from).collect());
        let bytes = encode(&value).unwrap();
        prop_assert_eq!(decode(&bytes).unwrap(), value);
    }

    #[test]
    fn test_progressions(start in -1_000_000i64..1_000_000, step in -1_000i64..1_000, len in 1usize..500) {
        let value = Value::Array((0..len as i64).map(|i| Value::from(start + i * step)).collect());
        let bytes = encode(&value).unwrap();
        prop_assert!(bytes.len() <= 16);
        prop_assert_eq!(decode(&bytes).unwrap(), value);
    }

    #[test]
    fn test_truncation_is_an_error(value in json_value(), cut in any::<prop::sample::Index>()) {
        let bytes = encode(&value).unwrap();
        let cut = cut.index(bytes.len());
        prop_assert!(decode(&bytes[..cut]).is_err());
    }

    #[test]
    fn test_random_bytes_never_panic(data in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = decode_with(&data, &small_limits());
    }

    #[test]
    fn test_corrupted_streams_never_panic(
        value in json_value(),
        flip in any::<prop::sample::Index>(),
        byte in any::<u8>(),
    ) {
        let mut bytes = encode(&value).unwrap();
        let at = flip.index(bytes.len());
        bytes[at] = byte;
        let _ = decode_with(&bytes, &small_limits());
    }
}
