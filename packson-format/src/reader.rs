//! Cursor-based byte reader

use crate::bitpack::{packed_len, type_index_len, unpack_bits, unpack_type_index};
use crate::error::{PacksonError, Result};
use crate::types::TypeBitmap;
use crate::varint::{decode_uleb128, zigzag_decode};
use crate::vlq::decode_vlq;

/// Reader over a borrowed byte slice
///
/// Every read checks bounds and reports [`PacksonError::UnexpectedEof`]
/// rather than panicking.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Create a reader positioned at the start of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current position
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Whether the whole input has been consumed
    pub fn is_at_end(&self) -> bool {
        self.pos == self.data.len()
    }

    /// Fail with `TrailingBytes` unless the whole input has been consumed
    pub fn expect_end(&self) -> Result<()> {
        if self.is_at_end() {
            Ok(())
        } else {
            Err(PacksonError::TrailingBytes {
                consumed: self.pos,
                len: self.data.len(),
            })
        }
    }

    /// Take the next `len` bytes
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(PacksonError::UnexpectedEof)?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Take the next `len` bytes as UTF-8
    pub fn read_str(&mut self, len: usize) -> Result<&'a str> {
        let bytes = self.read_bytes(len)?;
        std::str::from_utf8(bytes).map_err(|_| PacksonError::InvalidUtf8)
    }

    /// Read an unsigned 8-bit integer
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Read a signed 8-bit integer
    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(i8::from_le_bytes(self.read_array()?))
    }

    /// Read an unsigned 16-bit integer
    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    /// Read a signed 16-bit integer
    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::from_le_bytes(self.read_array()?))
    }

    /// Read an unsigned 24-bit integer
    pub fn read_u24(&mut self) -> Result<u32> {
        let [a, b, c] = self.read_array()?;
        Ok(u32::from_le_bytes([a, b, c, 0]))
    }

    /// Read a signed 24-bit integer, sign-extended
    pub fn read_i24(&mut self) -> Result<i32> {
        let raw = self.read_u24()?;
        Ok(((raw << 8) as i32) >> 8)
    }

    /// Read an unsigned 32-bit integer
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// Read a signed 32-bit integer
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    /// Read an unsigned 64-bit integer
    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Read a signed 64-bit integer
    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    /// Read a 32-bit float
    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    /// Read a 64-bit float
    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.read_array()?))
    }

    /// Read a self-describing VLQ
    pub fn read_vlq(&mut self) -> Result<u64> {
        let (value, used) = decode_vlq(&self.data[self.pos..])?;
        self.pos += used;
        Ok(value)
    }

    /// Read a VLQ that must fit `usize` (lengths and counts)
    pub fn read_len(&mut self) -> Result<usize> {
        let raw = self.read_vlq()?;
        usize::try_from(raw).map_err(|_| PacksonError::InvalidHeader(format!("length {raw}")))
    }

    /// Read an unsigned continuation-bit varint
    pub fn read_uint_var(&mut self) -> Result<u64> {
        let (value, used) = decode_uleb128(&self.data[self.pos..])?;
        self.pos += used;
        Ok(value)
    }

    /// Read a zig-zagged signed varint
    pub fn read_int_var(&mut self) -> Result<i64> {
        Ok(zigzag_decode(self.read_uint_var()?))
    }

    /// Read a type index over `count` elements, returning raw codes
    pub fn read_type_index(&mut self, count: usize, bitmap: TypeBitmap) -> Result<Vec<u8>> {
        let bytes = self.read_bytes(type_index_len(count, bitmap))?;
        unpack_type_index(bytes, count, bitmap)
    }

    /// Read `count` values of `width` bits each
    pub fn read_bits(&mut self, count: usize, width: u32) -> Result<Vec<u64>> {
        let bytes = self.read_bytes(packed_len(count, width))?;
        unpack_bits(bytes, count, width)
    }
}
