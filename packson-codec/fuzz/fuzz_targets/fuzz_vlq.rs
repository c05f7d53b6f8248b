#![no_main]

use libfuzzer_sys::fuzz_target;
use packson_format::varint::decode_uleb128;
use packson_format::vlq::{decode_vlq, encode_vlq};

fuzz_target!(|data: &[u8]| {
    let _ = decode_uleb128(data);
    if let Ok((value, used)) = decode_vlq(data) {
        let canonical = encode_vlq(value);
        // short forms may be wider than needed; long forms are always canonical
        if canonical.len() == used || used >= 4 {
            assert_eq!(&canonical[..], &data[..used]);
        }
    }
});
