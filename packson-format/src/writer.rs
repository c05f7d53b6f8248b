//! Append-only chunked byte writer

use std::mem;

use crate::bitpack::{pack_bits, pack_type_index};
use crate::constants::{DEFAULT_CHUNK_SIZE, MIN_CHUNK_SIZE};
use crate::types::TypeBitmap;
use crate::varint::{encode_uleb128, zigzag_encode};
use crate::vlq::encode_vlq;

/// Append-only buffer built from fixed-size chunks
///
/// Scalars never straddle a chunk: a write that does not fit the active
/// chunk closes it and opens a new one. Byte runs and strings are split
/// across chunks (strings only on `char` boundaries). [`ByteWriter::finish`]
/// concatenates everything into one contiguous buffer.
///
/// ```
/// use packson_format::ByteWriter;
///
/// let mut writer = ByteWriter::with_chunk_size(8);
/// writer.write_u8(0x01);
/// writer.write_u16(0x0302);
/// writer.write_str("héllo wörld");
/// let bytes = writer.finish();
/// assert_eq!(&bytes[..3], &[0x01, 0x02, 0x03]);
/// assert_eq!(&bytes[3..], "héllo wörld".as_bytes());
/// ```
#[derive(Debug)]
pub struct ByteWriter {
    chunks: Vec<Vec<u8>>,
    current: Vec<u8>,
    chunk_size: usize,
    flushed_len: usize,
}

impl Default for ByteWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteWriter {
    /// Create a writer with the default 64 KiB chunk size
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    /// Create a writer with a custom chunk size (at least 8 bytes)
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(MIN_CHUNK_SIZE);
        Self {
            chunks: Vec::new(),
            current: Vec::with_capacity(chunk_size),
            chunk_size,
            flushed_len: 0,
        }
    }

    /// Chunk size in use
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Total bytes written so far
    pub fn len(&self) -> usize {
        self.flushed_len + self.current.len()
    }

    /// Whether nothing has been written
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of chunks closed so far
    pub fn closed_chunks(&self) -> usize {
        self.chunks.len()
    }

    fn room(&self) -> usize {
        self.chunk_size - self.current.len()
    }

    fn flush_chunk(&mut self) {
        if self.current.is_empty() {
            return;
        }
        let full = mem::replace(&mut self.current, Vec::with_capacity(self.chunk_size));
        self.flushed_len += full.len();
        self.chunks.push(full);
    }

    fn write_scalar(&mut self, bytes: &[u8]) {
        if self.room() < bytes.len() {
            self.flush_chunk();
        }
        self.current.extend_from_slice(bytes);
    }

    /// Write raw bytes, splitting across chunks as needed
    pub fn write_bytes(&mut self, mut data: &[u8]) {
        while !data.is_empty() {
            if self.room() == 0 {
                self.flush_chunk();
            }
            let take = self.room().min(data.len());
            self.current.extend_from_slice(&data[..take]);
            data = &data[take..];
        }
    }

    /// Write the UTF-8 bytes of `s`, never splitting a code point across chunks
    pub fn write_str(&mut self, s: &str) {
        let mut rest = s;
        while !rest.is_empty() {
            let (consumed, written) = encode_utf8_into(rest, self.room());
            if consumed == 0 {
                self.flush_chunk();
                continue;
            }
            debug_assert_eq!(consumed, written);
            self.current.extend_from_slice(&rest.as_bytes()[..written]);
            rest = &rest[consumed..];
        }
    }

    /// Write an unsigned 8-bit integer
    pub fn write_u8(&mut self, val: u8) {
        self.write_scalar(&[val]);
    }

    /// Write a signed 8-bit integer
    pub fn write_i8(&mut self, val: i8) {
        self.write_scalar(&val.to_le_bytes());
    }

    /// Write an unsigned 16-bit integer (little-endian)
    pub fn write_u16(&mut self, val: u16) {
        self.write_scalar(&val.to_le_bytes());
    }

    /// Write a signed 16-bit integer (little-endian)
    pub fn write_i16(&mut self, val: i16) {
        self.write_scalar(&val.to_le_bytes());
    }

    /// Write the low 24 bits of `val` (little-endian)
    pub fn write_u24(&mut self, val: u32) {
        self.write_scalar(&val.to_le_bytes()[..3]);
    }

    /// Write a signed 24-bit integer (little-endian, two's complement)
    pub fn write_i24(&mut self, val: i32) {
        self.write_scalar(&val.to_le_bytes()[..3]);
    }

    /// Write an unsigned 32-bit integer (little-endian)
    pub fn write_u32(&mut self, val: u32) {
        self.write_scalar(&val.to_le_bytes());
    }

    /// Write a signed 32-bit integer (little-endian)
    pub fn write_i32(&mut self, val: i32) {
        self.write_scalar(&val.to_le_bytes());
    }

    /// Write an unsigned 64-bit integer (little-endian)
    pub fn write_u64(&mut self, val: u64) {
        self.write_scalar(&val.to_le_bytes());
    }

    /// Write a signed 64-bit integer (little-endian)
    pub fn write_i64(&mut self, val: i64) {
        self.write_scalar(&val.to_le_bytes());
    }

    /// Write a 32-bit float (little-endian)
    pub fn write_f32(&mut self, val: f32) {
        self.write_scalar(&val.to_le_bytes());
    }

    /// Write a 64-bit float (little-endian)
    pub fn write_f64(&mut self, val: f64) {
        self.write_scalar(&val.to_le_bytes());
    }

    /// Write a self-describing VLQ
    pub fn write_vlq(&mut self, val: u64) {
        self.write_bytes(&encode_vlq(val));
    }

    /// Write an unsigned continuation-bit varint
    pub fn write_uint_var(&mut self, val: u64) {
        self.write_bytes(&encode_uleb128(val));
    }

    /// Write a zig-zagged signed varint
    pub fn write_int_var(&mut self, val: i64) {
        self.write_uint_var(zigzag_encode(val));
    }

    /// Write one dense code per element at `ceil(log2(bitmap.count()))` bits
    pub fn write_type_index(&mut self, codes: &[u8], bitmap: TypeBitmap) {
        let packed = pack_type_index(codes, bitmap);
        self.write_bytes(&packed);
    }

    /// Write `values` at `width` bits each, LSB-first without padding between values
    pub fn write_bits(&mut self, values: &[u64], width: u32) {
        let packed = pack_bits(values, width);
        self.write_bytes(&packed);
    }

    /// Move every chunk of `other` to the end of this writer
    pub fn append(&mut self, other: ByteWriter) {
        self.flush_chunk();
        for chunk in other.into_chunks() {
            self.flushed_len += chunk.len();
            self.chunks.push(chunk);
        }
    }

    fn into_chunks(mut self) -> Vec<Vec<u8>> {
        self.flush_chunk();
        self.chunks
    }

    /// Concatenate all chunks into one buffer
    pub fn finish(self) -> Vec<u8> {
        let total = self.len();
        let mut chunks = self.into_chunks();
        if chunks.len() == 1 {
            return chunks.pop().unwrap_or_default();
        }
        let mut out = Vec::with_capacity(total);
        for chunk in &chunks {
            out.extend_from_slice(chunk);
        }
        out
    }
}

/// Encode as much of `src` as fits in `room` bytes without splitting a code point
///
/// Returns `(consumed, written)`: source bytes consumed and destination bytes
/// produced. A caller seeing `consumed == 0` must retry into a fresh chunk.
pub fn encode_utf8_into(src: &str, room: usize) -> (usize, usize) {
    if src.len() <= room {
        return (src.len(), src.len());
    }
    let mut cut = room;
    while cut > 0 && !src.is_char_boundary(cut) {
        cut -= 1;
    }
    (cut, cut)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_size_clamped() {
        let writer = ByteWriter::with_chunk_size(1);
        assert_eq!(writer.chunk_size(), MIN_CHUNK_SIZE);
    }

    #[test]
    fn test_scalar_does_not_straddle_chunks() {
        let mut writer = ByteWriter::with_chunk_size(8);
        writer.write_u32(0xAABBCCDD);
        writer.write_u8(1);
        writer.write_u64(42);
        assert_eq!(writer.closed_chunks(), 1);
        assert_eq!(writer.len(), 13);
        let bytes = writer.finish();
        assert_eq!(&bytes[..4], &0xAABBCCDDu32.to_le_bytes());
        assert_eq!(bytes[4], 1);
        assert_eq!(&bytes[5..], &42u64.to_le_bytes());
    }

    #[test]
    fn test_multibyte_string_across_chunks() {
        let text = "ααααα€€€€😀😀";
        for chunk_size in [8, 9, 10, 11, 64] {
            let mut writer = ByteWriter::with_chunk_size(chunk_size);
            writer.write_u8(0xFF);
            writer.write_str(text);
            let bytes = writer.finish();
            assert_eq!(bytes[0], 0xFF);
            assert_eq!(&bytes[1..], text.as_bytes(), "chunk size {chunk_size}");
        }
    }

    #[test]
    fn test_encode_utf8_into_reports_boundary() {
        assert_eq!(encode_utf8_into("abc", 10), (3, 3));
        assert_eq!(encode_utf8_into("a€", 2), (1, 1));
        assert_eq!(encode_utf8_into("€", 2), (0, 0));
        assert_eq!(encode_utf8_into("a€b", 4), (4, 4));
    }

    #[test]
    fn test_output_independent_of_chunk_size() {
        let fill = |writer: &mut ByteWriter| {
            writer.write_vlq(300);
            writer.write_int_var(-5);
            writer.write_bytes(&[7; 40]);
            writer.write_i24(-2);
            writer.write_f64(1.5);
        };
        let mut small = ByteWriter::with_chunk_size(8);
        let mut large = ByteWriter::new();
        fill(&mut small);
        fill(&mut large);
        assert_eq!(small.finish(), large.finish());
    }

    #[test]
    fn test_append_preserves_order() {
        let mut head = ByteWriter::with_chunk_size(8);
        head.write_bytes(b"head");
        let mut body = ByteWriter::with_chunk_size(8);
        body.write_bytes(b"body-bytes");
        head.append(body);
        assert_eq!(head.len(), 14);
        assert_eq!(head.finish(), b"headbody-bytes");
    }

    #[test]
    fn test_empty_finish() {
        assert!(ByteWriter::new().finish().is_empty());
    }
}
