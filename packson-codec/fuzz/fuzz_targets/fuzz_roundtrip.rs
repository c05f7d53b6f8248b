#![no_main]

use libfuzzer_sys::fuzz_target;
use serde_json::Value;

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<Value>(data) else {
        return;
    };
    let bytes = packson_codec::encode(&value).expect("encode");
    let decoded = packson_codec::decode(&bytes).expect("decode");
    assert_eq!(decoded, value);
});
