//! Decode limits

use crate::error::{PacksonError, Result};

/// Bounds applied while decoding, so that a short stream cannot announce
/// unbounded allocations
#[derive(Debug, Clone)]
pub struct Limits {
    /// Maximum elements in one array (default: 16 Mi)
    pub max_array_len: usize,
    /// Maximum array elements across the whole stream (default: 64 Mi)
    pub max_total_elements: usize,
    /// Maximum distinct strings in the string table (default: 16 Mi)
    pub max_strings: usize,
    /// Maximum string use-sites (default: 64 Mi)
    pub max_string_refs: usize,
    /// Maximum bytes across all rebuilt strings (default: 256 MiB)
    pub max_string_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_array_len: 16 * 1024 * 1024,
            max_total_elements: 64 * 1024 * 1024,
            max_strings: 16 * 1024 * 1024,
            max_string_refs: 64 * 1024 * 1024,
            max_string_bytes: 256 * 1024 * 1024,
        }
    }
}

impl Limits {
    /// No bounds at all
    pub fn unlimited() -> Self {
        Self {
            max_array_len: usize::MAX,
            max_total_elements: usize::MAX,
            max_strings: usize::MAX,
            max_string_refs: usize::MAX,
            max_string_bytes: usize::MAX,
        }
    }

    /// Fail with `LimitExceeded` when `value > max`
    pub fn check(what: &str, value: usize, max: usize) -> Result<()> {
        if value > max {
            return Err(PacksonError::LimitExceeded(format!(
                "{what} {value} exceeds limit {max}"
            )));
        }
        Ok(())
    }
}
