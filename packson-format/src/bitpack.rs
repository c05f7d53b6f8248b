//! Bit packing for type indexes, nibbles and fixed-width integer runs

use bitvec::prelude::*;

use crate::error::{PacksonError, Result};
use crate::types::TypeBitmap;

/// Bytes needed for `count` values of `width` bits
pub fn packed_len(count: usize, width: u32) -> usize {
    (count * width as usize + 7) >> 3
}

/// Pack `values` at `width` bits each, LSB-first
///
/// Bits above `width` in each value are ignored.
pub fn pack_bits(values: &[u64], width: u32) -> Vec<u8> {
    if width == 0 || values.is_empty() {
        return Vec::new();
    }
    let width = width as usize;
    let mut bits: BitVec<u8, Lsb0> = BitVec::with_capacity(values.len() * width);
    for value in values {
        bits.extend_from_bitslice(&value.view_bits::<Lsb0>()[..width]);
    }
    bits.into_vec()
}

/// Unpack `count` values of `width` bits from `bytes`
pub fn unpack_bits(bytes: &[u8], count: usize, width: u32) -> Result<Vec<u64>> {
    if width == 0 {
        return Ok(vec![0; count]);
    }
    if width > u64::BITS {
        return Err(PacksonError::InvalidHeader(format!(
            "bit width {width} exceeds 64"
        )));
    }
    if bytes.len() < packed_len(count, width) {
        return Err(PacksonError::UnexpectedEof);
    }
    let width = width as usize;
    let bits = bytes.view_bits::<Lsb0>();
    Ok(bits
        .chunks_exact(width)
        .take(count)
        .map(|slot| slot.load_le::<u64>())
        .collect())
}

/// Byte length of a type index over `count` elements
pub fn type_index_len(count: usize, bitmap: TypeBitmap) -> usize {
    packed_len(count, bitmap.index_bits())
}

/// Pack one dense code per element; `codes` hold raw codes present in `bitmap`
pub fn pack_type_index(codes: &[u8], bitmap: TypeBitmap) -> Vec<u8> {
    let width = bitmap.index_bits();
    let dense: Vec<u64> = codes
        .iter()
        .map(|code| bitmap.dense_code(*code) as u64)
        .collect();
    pack_bits(&dense, width)
}

/// Unpack `count` raw codes from a type index over `bitmap`
pub fn unpack_type_index(bytes: &[u8], count: usize, bitmap: TypeBitmap) -> Result<Vec<u8>> {
    let width = bitmap.index_bits();
    if width == 0 {
        let only = bitmap
            .single()
            .ok_or_else(|| PacksonError::InvalidHeader("empty type bitmap".to_string()))?;
        return Ok(vec![only; count]);
    }
    unpack_bits(bytes, count, width)?
        .into_iter()
        .map(|dense| {
            bitmap
                .code_at(dense as u8)
                .ok_or(PacksonError::DictionaryError)
        })
        .collect()
}
