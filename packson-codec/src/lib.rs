//! Packson Codec - Encoder/decoder engines
//!
//! This crate turns a [`serde_json::Value`] tree into a Packson byte stream
//! and back:
//!
//! - Value classification into packed types
//! - Adaptive numeric run encodings with lowering
//! - String interning with prefix/suffix sharing
//! - Array header and object entry dictionaries
//! - Columnar layout for arrays of objects
//!
//! ```
//! use serde_json::json;
//!
//! let value = json!([{"x": 1, "y": 2}, {"x": 3, "y": 4}]);
//! let bytes = packson_codec::encode(&value).unwrap();
//! assert_eq!(packson_codec::decode(&bytes).unwrap(), value);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod classify;
pub mod decoder;
pub mod encoder;
pub mod numeric;
pub mod strings;
pub mod structure;

use serde_json::Value;
use tracing::debug;

// Re-export commonly used types
pub use packson_format::{
    Kind, Limits, NumberKind, PackedType, PacksonError, Result, TypeBitmap,
};

// Re-export our own types
pub use classify::{array_shape, classify_f64, number_kind, value_type, ArrayShape, Num};
pub use decoder::{DecodeSummary, Decoder};
pub use encoder::{EncodeSummary, Encoder};
pub use numeric::{
    decode_numeric_run, encode_numeric_run, select_encoding, Lowering, Method, NumericEncoding,
};

/// Encoding options
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    /// Growth granularity of the output buffer; never changes the output bytes
    pub chunk_size: usize,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            chunk_size: packson_format::constants::DEFAULT_CHUNK_SIZE,
        }
    }
}

impl EncodeOptions {
    /// Options with the given chunk size
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self { chunk_size }
    }
}

/// Decoding options
#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    /// Allocation bounds
    pub limits: Limits,
}

/// Read-only summary of an encoded stream
pub type StreamStats = DecodeSummary;

/// Encode `value` with default options
pub fn encode(value: &Value) -> Result<Vec<u8>> {
    encode_with(value, &EncodeOptions::default())
}

/// Encode `value`
pub fn encode_with(value: &Value, opts: &EncodeOptions) -> Result<Vec<u8>> {
    let mut encoder = Encoder::new(opts.chunk_size);
    encoder.encode_root(value)?;
    let summary = encoder.summary();
    let bytes = encoder.finish();
    debug!(
        output_len = bytes.len(),
        body_len = summary.body_len,
        strings = summary.strings,
        references = summary.references,
        headers = summary.headers,
        entries = summary.entries,
        "encoded value"
    );
    Ok(bytes)
}

/// Decode a stream produced by [`encode`]
///
/// Fails with [`PacksonError::TrailingBytes`] unless the stream is consumed
/// exactly.
pub fn decode(bytes: &[u8]) -> Result<Value> {
    decode_with(bytes, &DecodeOptions::default())
}

/// Decode a stream under the given limits
pub fn decode_with(bytes: &[u8], opts: &DecodeOptions) -> Result<Value> {
    Ok(decode_with_summary(bytes, opts)?.0)
}

/// Decode a stream and report what it contained
pub fn stats(bytes: &[u8]) -> Result<StreamStats> {
    Ok(decode_with_summary(bytes, &DecodeOptions::default())?.1)
}

fn decode_with_summary(bytes: &[u8], opts: &DecodeOptions) -> Result<(Value, DecodeSummary)> {
    let mut decoder = Decoder::new(bytes, &opts.limits)?;
    let value = decoder.decode_root()?;
    let summary = decoder.summary();
    debug!(
        input_len = bytes.len(),
        table_len = summary.table_len,
        strings = summary.strings,
        headers = summary.headers,
        entries = summary.entries,
        "decoded value"
    );
    Ok((value, summary))
}
