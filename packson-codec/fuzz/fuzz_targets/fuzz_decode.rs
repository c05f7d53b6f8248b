#![no_main]

use libfuzzer_sys::fuzz_target;
use packson_codec::{decode_with, DecodeOptions, Limits};

fuzz_target!(|data: &[u8]| {
    let opts = DecodeOptions {
        limits: Limits {
            max_array_len: 1 << 16,
            max_total_elements: 1 << 18,
            max_strings: 1 << 16,
            max_string_refs: 1 << 18,
            max_string_bytes: 1 << 24,
        },
    };
    // Arbitrary bytes must produce an error or a value, never a panic
    let _ = decode_with(data, &opts);
});
