//! Constants for the Packson wire format

/// Default writer chunk size (64 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;
/// Smallest chunk the writer will allocate; fits any fixed-width scalar.
pub const MIN_CHUNK_SIZE: usize = 8;

/// Number of bits a kind occupies in a packed type byte.
pub const KIND_BITS: u8 = 3;
/// Mask selecting the kind from a packed type byte.
pub const KIND_MASK: u8 = (1 << KIND_BITS) - 1;

/// Object subkind for objects with at least one member.
pub const OBJECT_SUB_FILLED: u8 = 0;
/// Object subkind for objects without members.
pub const OBJECT_SUB_EMPTY: u8 = 1;
/// Array subkind for arrays mixing element types.
pub const ARRAY_SUB_MIXED: u8 = 0;
/// Array subkind for arrays without elements.
pub const ARRAY_SUB_EMPTY: u8 = 1;
/// Array subkind for arrays whose elements all share one scalar type.
pub const ARRAY_SUB_TYPED: u8 = 2;

/// Bits of the numeric code holding the base method.
pub const NUMERIC_METHOD_BITS: u32 = 3;
/// Bits of the array header holding the numeric code (method + lowering).
pub const NUMERIC_CODE_BITS: u32 = 5;
/// Bit offset of the element kind bitmap in an array header.
pub const HEADER_BITMAP_SHIFT: u32 = NUMERIC_CODE_BITS;
/// Bit offset of the array flags in an array header.
pub const HEADER_FLAGS_SHIFT: u32 = HEADER_BITMAP_SHIFT + 8;

/// Array flag: object elements carry shared keys as columns.
pub const ARRAY_FLAG_COLUMNS: u64 = 1 << 0;
/// Array flag: object elements carry per-object inline entries.
pub const ARRAY_FLAG_INLINE: u64 = 1 << 1;
/// Array flag: sub-arrays are written as lengths plus one flattened array.
pub const ARRAY_FLAG_FLATTENED: u64 = 1 << 2;
/// Mask of all defined array flags.
pub const ARRAY_FLAGS_MASK: u64 = ARRAY_FLAG_COLUMNS | ARRAY_FLAG_INLINE | ARRAY_FLAG_FLATTENED;

/// Minimum number of sub-arrays before they are flattened.
pub const FLATTEN_MIN_SUBARRAYS: usize = 2;
/// Minimum number of object elements before columns are considered.
pub const COLUMN_MIN_OBJECTS: usize = 2;

/// String definition flag: a prefix run is shared with the previous string.
pub const STRING_FLAG_PREFIX: u64 = 1 << 1;
/// String definition flag: a suffix run is shared with the previous string.
pub const STRING_FLAG_SUFFIX: u64 = 1 << 0;
/// Bits of a string definition record taken by the sharing flags.
pub const STRING_FLAG_BITS: u32 = 2;
/// Shortest shared run worth recording; shorter runs cost as much as they save.
pub const MIN_SHARED_RUN: usize = 2;

/// Object entry code terminating an object.
pub const OBJECT_END: u64 = 0;
