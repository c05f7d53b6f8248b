//! Continuation-bit variable-length integers (ULEB128 / ZigZag)
//!
//! Object entry codes, number payloads of the `VarUint`/`VarInt` kinds and
//! numeric run parameters use this encoding. The tail of a 5-byte-or-longer
//! VLQ is also a ULEB128.

use smallvec::SmallVec;

use crate::error::PacksonError;

/// Longest ULEB128 encoding of a `u64`
pub const MAX_ULEB128_LEN: usize = 10;

/// Encode a u64 as ULEB128
pub fn encode_uleb128(val: u64) -> SmallVec<[u8; MAX_ULEB128_LEN]> {
    let mut out = SmallVec::new();
    let mut rest = val;
    loop {
        let low = (rest & 0x7F) as u8;
        rest >>= 7;
        if rest == 0 {
            out.push(low);
            return out;
        }
        out.push(low | 0x80);
    }
}

/// Decode ULEB128 from the front of `bytes`, returning the value and bytes consumed
///
/// Encodings that overflow 64 bits are rejected rather than truncated.
pub fn decode_uleb128(bytes: &[u8]) -> Result<(u64, usize), PacksonError> {
    let mut value = 0u64;
    for (i, &byte) in bytes.iter().enumerate() {
        let payload = (byte & 0x7F) as u64;
        let shift = 7 * i as u32;
        if (i == MAX_ULEB128_LEN - 1 && payload > 1) || i >= MAX_ULEB128_LEN {
            return Err(PacksonError::InvalidHeader(
                "varint overflows 64 bits".to_string(),
            ));
        }
        value |= payload << shift;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(PacksonError::UnexpectedEof)
}

/// Encoded length of `val` as ULEB128
pub fn uleb128_len(val: u64) -> usize {
    let bits = (u64::BITS - val.leading_zeros()).max(1) as usize;
    (bits + 6) / 7
}

/// Encoded length of a signed value (ZigZag then ULEB128)
pub fn int_var_len(val: i64) -> usize {
    uleb128_len(zigzag_encode(val))
}

/// ZigZag encode a signed integer
pub fn zigzag_encode(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

/// ZigZag decode to signed integer
pub fn zigzag_decode(u: u64) -> i64 {
    ((u >> 1) as i64) ^ -((u & 1) as i64)
}
