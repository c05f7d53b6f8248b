//! Packson Format - Core primitives for the Packson binary codec
//!
//! This crate provides the low-level building blocks shared by the encoder
//! and decoder, with no knowledge of JSON value trees:
//!
//! - Chunked byte writer and bounds-checked byte reader
//! - Self-describing VLQ and continuation-bit varints (ULEB128/ZigZag)
//! - Bit packing for type indexes and fixed-width integer runs
//! - Type tags, numeric subkinds and packed types
//! - Error types and decode limits
//! - Wire constants

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod bitpack;
pub mod constants;
pub mod error;
pub mod limits;
pub mod reader;
pub mod types;
pub mod varint;
pub mod vlq;
pub mod writer;

// Re-export commonly used types
pub use error::{PacksonError, Result};
pub use limits::Limits;
pub use reader::ByteReader;
pub use types::{Kind, NumberKind, PackedType, TypeBitmap};
pub use writer::ByteWriter;
