//! Error types for the Packson format

use thiserror::Error;

/// Packson error types
#[derive(Debug, Error)]
pub enum PacksonError {
    /// A read ran past the end of the input.
    #[error("Unexpected end of input")]
    UnexpectedEof,
    /// Decoding finished before consuming the whole input.
    #[error("End of input not reached: consumed {consumed} of {len} bytes")]
    TrailingBytes {
        /// Reader position when the root value was complete
        consumed: usize,
        /// Total input length
        len: usize,
    },
    /// String bytes in the table blob are not valid UTF-8.
    #[error("Invalid UTF-8 in string table")]
    InvalidUtf8,
    /// A packed type byte does not name a known kind/subkind pair.
    #[error("Invalid type tag: {0:#04x}")]
    InvalidTypeTag(u8),
    /// An array header or numeric run header is inconsistent.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
    /// A configured decode limit was exceeded.
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),
    /// A backreference named a dictionary entry that was never defined.
    #[error("Dictionary index out of range")]
    DictionaryError,
    /// Internal invariant was violated.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, PacksonError>;
