//! Type tags, numeric subkinds, packed types and kind bitmaps

use crate::constants::{
    ARRAY_SUB_TYPED, KIND_BITS, KIND_MASK, OBJECT_SUB_EMPTY,
};
use crate::error::{PacksonError, Result};

/// Coarse value kind (3 bits)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Kind {
    /// `null`
    Null = 0,
    /// `true`
    True = 1,
    /// `false`
    False = 2,
    /// UTF-8 string
    String = 3,
    /// Number with a [`NumberKind`] subkind
    Number = 4,
    /// Object, possibly empty
    Object = 5,
    /// Array, possibly empty
    Array = 6,
    /// Column slot whose object lacks the column key. Never a user value.
    Hole = 7,
}

impl Kind {
    /// Convert from u8
    pub fn from_u8(val: u8) -> Result<Self> {
        match val {
            0 => Ok(Kind::Null),
            1 => Ok(Kind::True),
            2 => Ok(Kind::False),
            3 => Ok(Kind::String),
            4 => Ok(Kind::Number),
            5 => Ok(Kind::Object),
            6 => Ok(Kind::Array),
            7 => Ok(Kind::Hole),
            other => Err(PacksonError::InvalidTypeTag(other)),
        }
    }

    /// Kind for a boolean
    pub fn from_bool(b: bool) -> Self {
        if b {
            Kind::True
        } else {
            Kind::False
        }
    }
}

/// Numeric subkind: the smallest lossless representation of a number (4 bits)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum NumberKind {
    /// 0..=255
    UInt8 = 0,
    /// 256..=65535
    UInt16 = 1,
    /// up to 2^24 - 1
    UInt24 = 2,
    /// up to 2^32 - 1
    UInt32 = 3,
    /// Non-negative beyond 32 bits (ULEB128)
    VarUint = 4,
    /// -128..=-1
    Int8 = 5,
    /// down to -32768
    Int16 = 6,
    /// down to -2^23
    Int24 = 7,
    /// down to -2^31
    Int32 = 8,
    /// Negative beyond 32 bits (zig-zag ULEB128)
    VarInt = 9,
    /// Float that survives an f32 round trip
    Float32 = 10,
    /// Any other finite float
    Float64 = 11,
}

impl NumberKind {
    /// Number of numeric subkinds
    pub const COUNT: u8 = 12;

    /// Convert from u8
    pub fn from_u8(val: u8) -> Result<Self> {
        Ok(match val {
            0 => NumberKind::UInt8,
            1 => NumberKind::UInt16,
            2 => NumberKind::UInt24,
            3 => NumberKind::UInt32,
            4 => NumberKind::VarUint,
            5 => NumberKind::Int8,
            6 => NumberKind::Int16,
            7 => NumberKind::Int24,
            8 => NumberKind::Int32,
            9 => NumberKind::VarInt,
            10 => NumberKind::Float32,
            11 => NumberKind::Float64,
            other => return Err(PacksonError::InvalidTypeTag(other)),
        })
    }

    /// Smallest unsigned kind holding `value`
    pub fn for_unsigned(value: u64) -> Self {
        match value {
            0..=0xFF => NumberKind::UInt8,
            0x100..=0xFFFF => NumberKind::UInt16,
            0x1_0000..=0xFF_FFFF => NumberKind::UInt24,
            0x100_0000..=0xFFFF_FFFF => NumberKind::UInt32,
            _ => NumberKind::VarUint,
        }
    }

    /// Smallest kind holding `value`; non-negative values are always unsigned
    pub fn for_signed(value: i64) -> Self {
        if value >= 0 {
            return Self::for_unsigned(value as u64);
        }
        match value {
            -0x80..=-1 => NumberKind::Int8,
            -0x8000..=-0x81 => NumberKind::Int16,
            -0x80_0000..=-0x8001 => NumberKind::Int24,
            -0x8000_0000..=-0x80_0001 => NumberKind::Int32,
            _ => NumberKind::VarInt,
        }
    }

    /// Encoded width in bytes, `None` for variable-width kinds
    pub fn byte_width(self) -> Option<usize> {
        match self {
            NumberKind::UInt8 | NumberKind::Int8 => Some(1),
            NumberKind::UInt16 | NumberKind::Int16 => Some(2),
            NumberKind::UInt24 | NumberKind::Int24 => Some(3),
            NumberKind::UInt32 | NumberKind::Int32 | NumberKind::Float32 => Some(4),
            NumberKind::Float64 => Some(8),
            NumberKind::VarUint | NumberKind::VarInt => None,
        }
    }
}

/// Kind and subkind combined into one byte: `subkind << 3 | kind`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PackedType(u8);

impl PackedType {
    /// Pack a kind with its subkind
    pub const fn new(kind: Kind, sub: u8) -> Self {
        Self(sub << KIND_BITS | kind as u8)
    }

    /// Packed type for a number of the given subkind
    pub const fn number(kind: NumberKind) -> Self {
        Self::new(Kind::Number, kind as u8)
    }

    /// Validate and wrap a raw packed type byte
    pub fn from_u8(raw: u8) -> Result<Self> {
        let kind = Kind::from_u8(raw & KIND_MASK)?;
        let sub = raw >> KIND_BITS;
        let valid = match kind {
            Kind::Number => sub < NumberKind::COUNT,
            Kind::Object => sub <= OBJECT_SUB_EMPTY,
            Kind::Array => sub <= ARRAY_SUB_TYPED,
            Kind::Hole => false,
            _ => sub == 0,
        };
        if valid {
            Ok(Self(raw))
        } else {
            Err(PacksonError::InvalidTypeTag(raw))
        }
    }

    /// Coarse kind
    pub fn kind(self) -> Kind {
        match self.0 & KIND_MASK {
            0 => Kind::Null,
            1 => Kind::True,
            2 => Kind::False,
            3 => Kind::String,
            4 => Kind::Number,
            5 => Kind::Object,
            6 => Kind::Array,
            _ => Kind::Hole,
        }
    }

    /// Subkind bits
    pub fn sub(self) -> u8 {
        self.0 >> KIND_BITS
    }

    /// Numeric subkind when the kind is `Number`
    pub fn number_kind(self) -> Option<NumberKind> {
        match self.kind() {
            Kind::Number => NumberKind::from_u8(self.sub()).ok(),
            _ => None,
        }
    }

    /// Raw byte
    pub fn as_u8(self) -> u8 {
        self.0
    }
}

/// Bitmask over small type codes (element kinds or numeric subkinds)
///
/// Codes present in the bitmap receive a dense code in ascending bit order,
/// which is what the bit-packed type index stores per element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TypeBitmap(u16);

impl TypeBitmap {
    /// Empty bitmap
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Wrap raw bits
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// Raw bits
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Mark `code` present
    pub fn insert(&mut self, code: u8) {
        self.0 |= 1 << code;
    }

    /// Whether `code` is present
    pub fn contains(self, code: u8) -> bool {
        self.0 & (1 << code) != 0
    }

    /// Number of distinct codes
    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Whether no code is present
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The single code when exactly one is present
    pub fn single(self) -> Option<u8> {
        if self.count() == 1 {
            Some(self.0.trailing_zeros() as u8)
        } else {
            None
        }
    }

    /// Bits per element in a type index: `ceil(log2(count))`
    pub fn index_bits(self) -> u32 {
        match self.count() {
            0 | 1 => 0,
            n => u32::BITS - (n - 1).leading_zeros(),
        }
    }

    /// Dense code of `code`: its rank among the present codes
    pub fn dense_code(self, code: u8) -> u8 {
        let below = self.0 & ((1u16 << code) - 1);
        below.count_ones() as u8
    }

    /// Present code with the given dense rank
    pub fn code_at(self, dense: u8) -> Option<u8> {
        self.codes().nth(dense as usize)
    }

    /// Present codes in ascending order
    pub fn codes(self) -> impl Iterator<Item = u8> {
        (0..16u8).filter(move |code| self.contains(*code))
    }
}
