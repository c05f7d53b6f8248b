//! Self-describing variable-length quantity
//!
//! The low bits of the first byte announce the width, so a reader knows how
//! many bytes to take (or, for the long form, that a continuation follows)
//! after inspecting a single byte:
//!
//! | first byte   | width      | payload bits                      |
//! |--------------|------------|-----------------------------------|
//! | `xxxx_xxx0`  | 1 byte     | 7                                 |
//! | `xxxx_xx01`  | 2 bytes    | 14                                |
//! | `xxxx_x011`  | 3 bytes    | 21                                |
//! | `xxxx_0111`  | ≥ 4 bytes  | 4, then a ULEB128 of `value >> 4` |
//!
//! The long form is only used from 2^21 upwards, so its tail is at least
//! three bytes: 4 bytes hold 25 bits, 5 bytes hold 32, and so on.

use smallvec::SmallVec;

use crate::error::PacksonError;
use crate::varint::{decode_uleb128, encode_uleb128, uleb128_len};

/// Longest VLQ encoding of a `u64`
pub const MAX_VLQ_LEN: usize = 10;

const LIMIT_1: u64 = 1 << 7;
const LIMIT_2: u64 = 1 << 14;
const LIMIT_3: u64 = 1 << 21;

const TAG_LONG: u8 = 0b0111;
const TAG_MASK: u8 = 0b1111;

/// Width in bytes announced by a VLQ first byte
///
/// For the long form this is the minimum width; the continuation decides the rest.
pub fn vlq_width(first: u8) -> usize {
    (first.trailing_ones() as usize).min(3) + 1
}

/// Encoded length of `val`
pub fn vlq_len(val: u64) -> usize {
    match val {
        v if v < LIMIT_1 => 1,
        v if v < LIMIT_2 => 2,
        v if v < LIMIT_3 => 3,
        v => 1 + uleb128_len(v >> 4),
    }
}

/// Encode `val` as a VLQ
pub fn encode_vlq(val: u64) -> SmallVec<[u8; MAX_VLQ_LEN]> {
    let mut out = SmallVec::new();
    if val < LIMIT_1 {
        out.push((val << 1) as u8);
    } else if val < LIMIT_2 {
        out.extend_from_slice(&((val << 2 | 0b01) as u16).to_le_bytes());
    } else if val < LIMIT_3 {
        out.extend_from_slice(&((val << 3 | 0b011) as u32).to_le_bytes()[..3]);
    } else {
        out.push(((val & 0xF) as u8) << 4 | TAG_LONG);
        out.extend_from_slice(&encode_uleb128(val >> 4));
    }
    out
}

/// Decode a VLQ, returning the value and bytes consumed
///
/// Long forms must be canonical: a value below 2^21, a padded tail or a
/// `1111` tag is rejected.
pub fn decode_vlq(bytes: &[u8]) -> Result<(u64, usize), PacksonError> {
    let first = *bytes.first().ok_or(PacksonError::UnexpectedEof)?;
    let width = vlq_width(first);
    if width == 4 {
        return decode_long(first, &bytes[1..]);
    }

    let head = bytes.get(..width).ok_or(PacksonError::UnexpectedEof)?;
    let mut raw = [0u8; 4];
    raw[..width].copy_from_slice(head);
    let raw = u32::from_le_bytes(raw);
    Ok(((raw >> width) as u64, width))
}

fn decode_long(first: u8, tail: &[u8]) -> Result<(u64, usize), PacksonError> {
    if first & TAG_MASK != TAG_LONG {
        return Err(PacksonError::InvalidHeader(format!(
            "reserved VLQ tag {:#04x}",
            first & TAG_MASK
        )));
    }
    let (high, used) = decode_uleb128(tail)?;
    if high >> 60 != 0 {
        return Err(PacksonError::InvalidHeader("VLQ overflow".to_string()));
    }
    let value = high << 4 | (first >> 4) as u64;
    if value < LIMIT_3 || used != uleb128_len(high) {
        return Err(PacksonError::InvalidHeader(format!(
            "non-canonical VLQ for {value}"
        )));
    }
    Ok((value, 1 + used))
}
