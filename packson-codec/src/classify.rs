//! Value classification: kinds, numeric subkinds and packed entry types

use packson_format::constants::{
    ARRAY_SUB_EMPTY, ARRAY_SUB_MIXED, ARRAY_SUB_TYPED, OBJECT_SUB_EMPTY, OBJECT_SUB_FILLED,
};
use packson_format::{Kind, NumberKind, PackedType};
use serde_json::{Number, Value};

/// A number as carried through numeric runs
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Num {
    /// Integer within `i64`
    Int(i64),
    /// Integer above `i64::MAX`
    UInt(u64),
    /// Finite float
    Float(f64),
}

impl Num {
    /// Convert a JSON number; `None` when it is not finite
    pub fn from_number(number: &Number) -> Option<Self> {
        if let Some(int) = number.as_i64() {
            Some(Num::Int(int))
        } else if let Some(uint) = number.as_u64() {
            Some(Num::UInt(uint))
        } else {
            number.as_f64().and_then(Self::from_f64)
        }
    }

    /// Wrap a float; `None` for NaN and infinities
    pub fn from_f64(value: f64) -> Option<Self> {
        value.is_finite().then_some(Num::Float(value))
    }

    /// Smallest lossless subkind
    pub fn kind(self) -> NumberKind {
        match self {
            Num::Int(int) => NumberKind::for_signed(int),
            Num::UInt(uint) => NumberKind::for_unsigned(uint),
            Num::Float(float) => {
                if (float as f32) as f64 == float {
                    NumberKind::Float32
                } else {
                    NumberKind::Float64
                }
            }
        }
    }

    /// Integer value when the number is an `i64`
    pub fn as_int(self) -> Option<i64> {
        match self {
            Num::Int(int) => Some(int),
            _ => None,
        }
    }

    /// Back to a JSON value
    pub fn to_value(self) -> Value {
        match self {
            Num::Int(int) => Value::from(int),
            Num::UInt(uint) => Value::from(uint),
            Num::Float(float) => Number::from_f64(float)
                .map(Value::Number)
                .unwrap_or(Value::Null),
        }
    }
}

/// Element shape of an array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayShape {
    /// No elements
    Empty,
    /// Every element has this scalar type (string or one numeric subkind)
    Typed(PackedType),
    /// Anything else
    Mixed,
}

/// Coarse kind of a value, without inspecting containers
pub fn kind_of(value: &Value) -> Kind {
    match value {
        Value::Null => Kind::Null,
        Value::Bool(b) => Kind::from_bool(*b),
        Value::String(_) => Kind::String,
        Value::Number(number) => match Num::from_number(number) {
            Some(_) => Kind::Number,
            None => Kind::Null,
        },
        Value::Object(_) => Kind::Object,
        Value::Array(_) => Kind::Array,
    }
}

/// Numeric subkind of a JSON number, `None` when it classifies as `Null`
pub fn number_kind(number: &Number) -> Option<NumberKind> {
    Num::from_number(number).map(Num::kind)
}

/// Packed type of a raw float: non-finite values become `Null`
pub fn classify_f64(value: f64) -> PackedType {
    match Num::from_f64(value) {
        Some(num) => PackedType::number(num.kind()),
        None => PackedType::new(Kind::Null, 0),
    }
}

/// Full packed type of a value, including container subkinds
pub fn value_type(value: &Value) -> PackedType {
    match value {
        Value::Number(number) => match number_kind(number) {
            Some(kind) => PackedType::number(kind),
            None => PackedType::new(Kind::Null, 0),
        },
        Value::Object(map) => {
            let sub = if map.is_empty() {
                OBJECT_SUB_EMPTY
            } else {
                OBJECT_SUB_FILLED
            };
            PackedType::new(Kind::Object, sub)
        }
        Value::Array(items) => {
            let sub = match array_shape(items) {
                ArrayShape::Empty => ARRAY_SUB_EMPTY,
                ArrayShape::Typed(_) => ARRAY_SUB_TYPED,
                ArrayShape::Mixed => ARRAY_SUB_MIXED,
            };
            PackedType::new(Kind::Array, sub)
        }
        other => PackedType::new(kind_of(other), 0),
    }
}

fn typed_element(value: &Value) -> Option<PackedType> {
    match value {
        Value::String(_) => Some(PackedType::new(Kind::String, 0)),
        Value::Number(number) => number_kind(number).map(PackedType::number),
        _ => None,
    }
}

/// Classify an array as empty, typed or mixed
///
/// No numeric widening happens: `[1, 300]` mixes `UInt8` and `UInt16` and is
/// therefore mixed.
pub fn array_shape(items: &[Value]) -> ArrayShape {
    let Some(first) = items.first() else {
        return ArrayShape::Empty;
    };
    let Some(first_type) = typed_element(first) else {
        return ArrayShape::Mixed;
    };
    if items[1..]
        .iter()
        .all(|item| typed_element(item) == Some(first_type))
    {
        ArrayShape::Typed(first_type)
    } else {
        ArrayShape::Mixed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn number(value: Value) -> Number {
        match value {
            Value::Number(number) => number,
            other => panic!("not a number: {other}"),
        }
    }

    #[test]
    fn test_scalar_types() {
        assert_eq!(value_type(&json!(null)).kind(), Kind::Null);
        assert_eq!(value_type(&json!(true)).kind(), Kind::True);
        assert_eq!(value_type(&json!(false)).kind(), Kind::False);
        assert_eq!(value_type(&json!("x")).kind(), Kind::String);
        assert_eq!(
            value_type(&json!(7)),
            PackedType::number(NumberKind::UInt8)
        );
    }

    #[test]
    fn test_empty_container_variants() {
        assert_eq!(value_type(&json!({})).sub(), OBJECT_SUB_EMPTY);
        assert_eq!(value_type(&json!({"a": 1})).sub(), OBJECT_SUB_FILLED);
        assert_eq!(value_type(&json!([])).sub(), ARRAY_SUB_EMPTY);
    }

    #[test]
    fn test_integer_boundaries() {
        let cases = [
            (json!(127), NumberKind::UInt8),
            (json!(128), NumberKind::UInt8),
            (json!(255), NumberKind::UInt8),
            (json!(256), NumberKind::UInt16),
            (json!(32_767), NumberKind::UInt16),
            (json!(32_768), NumberKind::UInt16),
            (json!(16_777_215), NumberKind::UInt24),
            (json!(16_777_216), NumberKind::UInt32),
            (json!(2_147_483_647), NumberKind::UInt32),
            (json!(2_147_483_648_u64), NumberKind::UInt32),
            (json!(4_294_967_296u64), NumberKind::VarUint),
            (json!(-128), NumberKind::Int8),
            (json!(-129), NumberKind::Int16),
            (json!(-2_147_483_649i64), NumberKind::VarInt),
            (json!(u64::MAX), NumberKind::VarUint),
        ];
        for (value, expected) in cases {
            assert_eq!(number_kind(&number(value.clone())), Some(expected), "{value}");
        }
    }

    #[test]
    fn test_float_precision() {
        assert_eq!(number_kind(&number(json!(0.5))), Some(NumberKind::Float32));
        assert_eq!(number_kind(&number(json!(1.0))), Some(NumberKind::Float32));
        assert_eq!(number_kind(&number(json!(0.1))), Some(NumberKind::Float64));
        assert_eq!(number_kind(&number(json!(1e300))), Some(NumberKind::Float64));
    }

    #[test]
    fn test_non_finite_is_null() {
        assert_eq!(classify_f64(f64::NAN).kind(), Kind::Null);
        assert_eq!(classify_f64(f64::INFINITY).kind(), Kind::Null);
        assert_eq!(classify_f64(f64::NEG_INFINITY).kind(), Kind::Null);
        assert_eq!(
            classify_f64(2.5),
            PackedType::number(NumberKind::Float32)
        );
    }

    #[test]
    fn test_array_shapes() {
        assert_eq!(array_shape(&[]), ArrayShape::Empty);
        assert_eq!(
            array_shape(&[json!("a"), json!("b")]),
            ArrayShape::Typed(PackedType::new(Kind::String, 0))
        );
        assert_eq!(
            array_shape(&[json!(1), json!(2)]),
            ArrayShape::Typed(PackedType::number(NumberKind::UInt8))
        );
        assert_eq!(array_shape(&[json!(1), json!(300)]), ArrayShape::Mixed);
        assert_eq!(array_shape(&[json!(true), json!(true)]), ArrayShape::Mixed);
        assert_eq!(array_shape(&[json!({"a": 1})]), ArrayShape::Mixed);
        assert_eq!(array_shape(&[json!(1), json!("1")]), ArrayShape::Mixed);
    }

    #[test]
    fn test_num_to_value_roundtrip() {
        for value in [json!(0), json!(-5), json!(u64::MAX), json!(1.5), json!(-0.25)] {
            let num = Num::from_number(&number(value.clone())).unwrap();
            assert_eq!(num.to_value(), value);
        }
    }
}
