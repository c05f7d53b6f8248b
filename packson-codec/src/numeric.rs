//! Adaptive encodings for runs of numbers
//!
//! A run is every number inside one array, in element order. Integer runs
//! are scored against each (method, lowering) pair using closed-form size
//! estimates; the cheapest pair is written. Runs holding floats or integers
//! above `i64::MAX` always use per-value kinds.

use packson_format::bitpack::packed_len;
use packson_format::constants::NUMERIC_METHOD_BITS;
use packson_format::varint::{int_var_len, uleb128_len, zigzag_encode};
use packson_format::vlq::vlq_len;
use packson_format::{ByteReader, ByteWriter, NumberKind, PacksonError, Result, TypeBitmap};
use tracing::trace;

use crate::classify::Num;

/// Base encoding of a numeric run (3 bits)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Method {
    /// Per-value [`NumberKind`] via kind bitmap + type index, then fixed-width values
    Kinds = 0,
    /// One VLQ per value (non-negative runs)
    Vlq = 1,
    /// One zig-zag varint per value
    Varint = 2,
    /// 4-bit slots holding values up to 7, larger values spill to trailing VLQs
    Nibble = 3,
    /// 4-bit slots of 3 magnitude bits and a sign bit, with spills
    SignedNibble = 4,
    /// Every value at the bit length of the maximum
    BitPacked = 5,
    /// First value and constant step
    Progression = 6,
}

impl Method {
    /// Candidate order; earlier entries win ties
    pub const SELECTION_ORDER: [Method; 7] = [
        Method::Progression,
        Method::BitPacked,
        Method::Nibble,
        Method::SignedNibble,
        Method::Vlq,
        Method::Varint,
        Method::Kinds,
    ];

    fn from_u8(val: u8) -> Result<Self> {
        Ok(match val {
            0 => Method::Kinds,
            1 => Method::Vlq,
            2 => Method::Varint,
            3 => Method::Nibble,
            4 => Method::SignedNibble,
            5 => Method::BitPacked,
            6 => Method::Progression,
            other => {
                return Err(PacksonError::InvalidHeader(format!(
                    "unknown numeric method {other}"
                )))
            }
        })
    }
}

/// Value transform applied before the base method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Lowering {
    /// Values as they are
    None = 0,
    /// First value, then differences from the predecessor
    Delta = 1,
    /// Minimum written once, then every value minus the minimum
    Min = 2,
}

impl Lowering {
    /// Candidate order; earlier entries win ties
    pub const SELECTION_ORDER: [Lowering; 3] = [Lowering::None, Lowering::Delta, Lowering::Min];

    fn from_u8(val: u8) -> Result<Self> {
        Ok(match val {
            0 => Lowering::None,
            1 => Lowering::Delta,
            2 => Lowering::Min,
            other => {
                return Err(PacksonError::InvalidHeader(format!(
                    "unknown numeric lowering {other}"
                )))
            }
        })
    }
}

/// Method and lowering chosen for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NumericEncoding {
    /// Base method
    pub method: Method,
    /// Lowering applied before the method
    pub lowering: Lowering,
}

impl NumericEncoding {
    /// Per-value kinds without lowering; the only choice for float runs
    pub const KINDS: Self = Self::new(Method::Kinds, Lowering::None);

    /// Combine a method and a lowering
    pub const fn new(method: Method, lowering: Lowering) -> Self {
        Self { method, lowering }
    }

    /// Packed code: `method | lowering << 3`
    pub fn code(self) -> u64 {
        self.method as u64 | (self.lowering as u64) << NUMERIC_METHOD_BITS
    }

    /// Parse a packed code
    pub fn from_code(code: u64) -> Result<Self> {
        let method_mask = (1u64 << NUMERIC_METHOD_BITS) - 1;
        let lowering = u8::try_from(code >> NUMERIC_METHOD_BITS)
            .map_err(|_| PacksonError::InvalidHeader(format!("numeric code {code}")))?;
        let encoding = Self::new(
            Method::from_u8((code & method_mask) as u8)?,
            Lowering::from_u8(lowering)?,
        );
        if encoding.method == Method::Progression && encoding.lowering != Lowering::None {
            return Err(PacksonError::InvalidHeader(
                "progression cannot be lowered".to_string(),
            ));
        }
        Ok(encoding)
    }
}

/// Closed-form properties of a (possibly lowered) integer run
#[derive(Debug, Clone, Copy)]
struct RunStats {
    len: usize,
    min: i64,
    max: i64,
    /// Values above 7 (unsigned nibble spills)
    over_seven: usize,
    /// Values with magnitude of at least 7 (signed nibble spills)
    magnitude_seven: usize,
    kinds: TypeBitmap,
    /// Sum of per-value widths under `Method::Kinds`
    kind_bytes: usize,
}

impl RunStats {
    /// Scan a run; `None` when a value leaves `i64` range
    fn collect(values: impl Iterator<Item = i128>) -> Option<Self> {
        let mut stats = RunStats {
            len: 0,
            min: i64::MAX,
            max: i64::MIN,
            over_seven: 0,
            magnitude_seven: 0,
            kinds: TypeBitmap::empty(),
            kind_bytes: 0,
        };
        for wide in values {
            let value = i64::try_from(wide).ok()?;
            stats.len += 1;
            stats.min = stats.min.min(value);
            stats.max = stats.max.max(value);
            if value > 7 {
                stats.over_seven += 1;
            }
            if value.unsigned_abs() >= 7 {
                stats.magnitude_seven += 1;
            }
            let kind = NumberKind::for_signed(value);
            stats.kinds.insert(kind as u8);
            stats.kind_bytes += int_width(value, kind);
        }
        Some(stats)
    }

    fn non_negative(&self) -> bool {
        self.min >= 0
    }

    fn max_magnitude(&self) -> u64 {
        self.min.unsigned_abs().max(self.max.unsigned_abs())
    }

    /// Estimated payload size of `method`, `None` when it cannot hold the run
    fn estimate(&self, method: Method, progression: Option<(i64, i64)>) -> Option<usize> {
        let n = self.len;
        let nibbles = (n + 1) / 2;
        match method {
            Method::Progression => progression.map(|(first, step)| {
                int_var_len(first) + int_var_len(step)
            }),
            Method::BitPacked => self
                .non_negative()
                .then(|| 1 + packed_len(n, bit_length(self.max as u64))),
            Method::Nibble => self
                .non_negative()
                .then(|| nibbles + self.over_seven * vlq_len((self.max as u64) >> 3)),
            Method::SignedNibble => Some(
                nibbles + self.magnitude_seven * vlq_len(self.max_magnitude().saturating_sub(7)),
            ),
            Method::Vlq => self
                .non_negative()
                .then(|| n * vlq_len(self.max as u64)),
            Method::Varint => {
                let widest = zigzag_encode(self.min).max(zigzag_encode(self.max));
                Some(n * uleb128_len(widest))
            }
            Method::Kinds => Some(
                vlq_len(self.kinds.raw() as u64)
                    + packed_len(n, self.kinds.index_bits())
                    + self.kind_bytes,
            ),
        }
    }
}

fn int_width(value: i64, kind: NumberKind) -> usize {
    match kind.byte_width() {
        Some(width) => width,
        None if value >= 0 => uleb128_len(value as u64),
        None => int_var_len(value),
    }
}

fn bit_length(value: u64) -> u32 {
    u64::BITS - value.leading_zeros()
}

fn lowered_stats(values: &[i64], lowering: Lowering) -> Option<RunStats> {
    match lowering {
        Lowering::None => RunStats::collect(values.iter().map(|v| *v as i128)),
        Lowering::Delta => RunStats::collect(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| match i {
                    0 => *v as i128,
                    _ => *v as i128 - values[i - 1] as i128,
                }),
        ),
        Lowering::Min => {
            let min = *values.iter().min()? as i128;
            RunStats::collect(values.iter().map(|v| *v as i128 - min))
        }
    }
}

/// `(first, step)` when the run is an arithmetic progression of at least two values
fn progression_of(values: &[i64]) -> Option<(i64, i64)> {
    if values.len() < 2 {
        return None;
    }
    let step = values[1].checked_sub(values[0])?;
    values
        .windows(2)
        .all(|pair| pair[1].checked_sub(pair[0]) == Some(step))
        .then_some((values[0], step))
}

/// Pick the cheapest encoding for a run
pub fn select_encoding(run: &[Num]) -> NumericEncoding {
    let values: Option<Vec<i64>> = run.iter().map(|num| num.as_int()).collect();
    match values {
        Some(values) if !values.is_empty() => select_int_encoding(&values),
        _ => NumericEncoding::KINDS,
    }
}

/// Pick the cheapest encoding for an integer run
pub fn select_int_encoding(values: &[i64]) -> NumericEncoding {
    let mut best: Option<(usize, NumericEncoding)> = None;

    for lowering in Lowering::SELECTION_ORDER {
        let Some(stats) = lowered_stats(values, lowering) else {
            continue;
        };
        let (overhead, progression) = match lowering {
            Lowering::None => (0, progression_of(values)),
            Lowering::Delta => (0, None),
            Lowering::Min => (int_var_len(stats_min(values)), None),
        };

        for method in Method::SELECTION_ORDER {
            let Some(cost) = stats.estimate(method, progression) else {
                continue;
            };
            let total = cost + overhead;
            if best.map_or(true, |(best_cost, _)| total < best_cost) {
                best = Some((total, NumericEncoding::new(method, lowering)));
            }
        }
    }

    let (cost, encoding) = best.unwrap_or((0, NumericEncoding::KINDS));
    trace!(len = values.len(), ?encoding, cost, "selected numeric encoding");
    encoding
}

fn stats_min(values: &[i64]) -> i64 {
    values.iter().copied().min().unwrap_or(0)
}

/// Write one number at the fixed width of `kind`
pub fn write_number(writer: &mut ByteWriter, num: Num, kind: NumberKind) -> Result<()> {
    let mismatch = || {
        PacksonError::Internal(format!("number {num:?} cannot be written as {kind:?}"))
    };
    match num {
        Num::Float(float) => match kind {
            NumberKind::Float32 => writer.write_f32(float as f32),
            NumberKind::Float64 => writer.write_f64(float),
            _ => return Err(mismatch()),
        },
        Num::UInt(uint) => match kind {
            NumberKind::VarUint => writer.write_uint_var(uint),
            _ => return Err(mismatch()),
        },
        Num::Int(int) => match kind {
            NumberKind::UInt8 => writer.write_u8(int as u8),
            NumberKind::UInt16 => writer.write_u16(int as u16),
            NumberKind::UInt24 => writer.write_u24(int as u32),
            NumberKind::UInt32 => writer.write_u32(int as u32),
            NumberKind::VarUint => writer.write_uint_var(int as u64),
            NumberKind::Int8 => writer.write_i8(int as i8),
            NumberKind::Int16 => writer.write_i16(int as i16),
            NumberKind::Int24 => writer.write_i24(int as i32),
            NumberKind::Int32 => writer.write_i32(int as i32),
            NumberKind::VarInt => writer.write_int_var(int),
            NumberKind::Float32 | NumberKind::Float64 => return Err(mismatch()),
        },
    }
    Ok(())
}

/// Read one number written at the fixed width of `kind`
pub fn read_number(reader: &mut ByteReader<'_>, kind: NumberKind) -> Result<Num> {
    Ok(match kind {
        NumberKind::UInt8 => Num::Int(reader.read_u8()? as i64),
        NumberKind::UInt16 => Num::Int(reader.read_u16()? as i64),
        NumberKind::UInt24 => Num::Int(reader.read_u24()? as i64),
        NumberKind::UInt32 => Num::Int(reader.read_u32()? as i64),
        NumberKind::VarUint => {
            let uint = reader.read_uint_var()?;
            match i64::try_from(uint) {
                Ok(int) => Num::Int(int),
                Err(_) => Num::UInt(uint),
            }
        }
        NumberKind::Int8 => Num::Int(reader.read_i8()? as i64),
        NumberKind::Int16 => Num::Int(reader.read_i16()? as i64),
        NumberKind::Int24 => Num::Int(reader.read_i24()? as i64),
        NumberKind::Int32 => Num::Int(reader.read_i32()? as i64),
        NumberKind::VarInt => Num::Int(reader.read_int_var()?),
        NumberKind::Float32 => Num::Float(reader.read_f32()? as f64),
        NumberKind::Float64 => Num::Float(reader.read_f64()?),
    })
}

/// Write a run with a previously selected encoding
///
/// The encoding code itself is not written; it travels in the array header.
pub fn encode_numeric_run(
    writer: &mut ByteWriter,
    run: &[Num],
    encoding: NumericEncoding,
) -> Result<()> {
    if encoding == NumericEncoding::KINDS {
        return write_kinds(writer, run);
    }

    let values: Vec<i64> = run
        .iter()
        .map(|num| num.as_int())
        .collect::<Option<_>>()
        .ok_or_else(|| {
            PacksonError::Internal(format!("{encoding:?} requires an integer run"))
        })?;

    match encoding.lowering {
        Lowering::None => write_method(writer, &values, encoding.method),
        Lowering::Delta => {
            let lowered = lower_delta(&values)?;
            write_method(writer, &lowered, encoding.method)
        }
        Lowering::Min => {
            let min = stats_min(&values);
            writer.write_int_var(min);
            let lowered = lower_min(&values, min)?;
            write_method(writer, &lowered, encoding.method)
        }
    }
}

/// Read `count` numbers written with `encoding`
pub fn decode_numeric_run(
    reader: &mut ByteReader<'_>,
    count: usize,
    encoding: NumericEncoding,
) -> Result<Vec<Num>> {
    if encoding == NumericEncoding::KINDS {
        return read_kinds(reader, count);
    }

    let min = match encoding.lowering {
        Lowering::Min => Some(reader.read_int_var()?),
        _ => None,
    };
    let mut values = read_method(reader, count, encoding.method)?;

    match (encoding.lowering, min) {
        (Lowering::Delta, _) => {
            for i in 1..values.len() {
                values[i] = values[i]
                    .checked_add(values[i - 1])
                    .ok_or_else(|| overflow("delta"))?;
            }
        }
        (Lowering::Min, Some(min)) => {
            for value in &mut values {
                *value = value.checked_add(min).ok_or_else(|| overflow("min"))?;
            }
        }
        _ => {}
    }

    Ok(values.into_iter().map(Num::Int).collect())
}

fn overflow(what: &str) -> PacksonError {
    PacksonError::InvalidHeader(format!("{what} lowering overflows i64"))
}

fn lower_delta(values: &[i64]) -> Result<Vec<i64>> {
    let mut lowered = Vec::with_capacity(values.len());
    for (i, value) in values.iter().enumerate() {
        lowered.push(match i {
            0 => *value,
            _ => value
                .checked_sub(values[i - 1])
                .ok_or_else(|| overflow("delta"))?,
        });
    }
    Ok(lowered)
}

fn lower_min(values: &[i64], min: i64) -> Result<Vec<i64>> {
    values
        .iter()
        .map(|value| value.checked_sub(min).ok_or_else(|| overflow("min")))
        .collect()
}

fn unsigned(value: i64, method: Method) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| PacksonError::Internal(format!("{method:?} cannot hold {value}")))
}

fn signed(value: u64) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| PacksonError::InvalidHeader(format!("value {value} exceeds i64")))
}

fn write_kinds(writer: &mut ByteWriter, run: &[Num]) -> Result<()> {
    let kinds: Vec<NumberKind> = run.iter().map(|num| num.kind()).collect();
    let codes: Vec<u8> = kinds.iter().map(|kind| *kind as u8).collect();
    let mut bitmap = TypeBitmap::empty();
    for code in &codes {
        bitmap.insert(*code);
    }

    writer.write_vlq(bitmap.raw() as u64);
    writer.write_type_index(&codes, bitmap);
    for (num, kind) in run.iter().zip(kinds) {
        write_number(writer, *num, kind)?;
    }
    Ok(())
}

fn read_kinds(reader: &mut ByteReader<'_>, count: usize) -> Result<Vec<Num>> {
    let raw = reader.read_vlq()?;
    let bitmap = u16::try_from(raw)
        .ok()
        .filter(|bits| *bits != 0 && bits >> NumberKind::COUNT == 0)
        .map(TypeBitmap::from_raw)
        .ok_or_else(|| PacksonError::InvalidHeader(format!("number kind bitmap {raw:#x}")))?;

    let codes = reader.read_type_index(count, bitmap)?;
    codes
        .into_iter()
        .map(|code| read_number(reader, NumberKind::from_u8(code)?))
        .collect()
}

fn write_method(writer: &mut ByteWriter, values: &[i64], method: Method) -> Result<()> {
    match method {
        Method::Kinds => {
            let run: Vec<Num> = values.iter().map(|v| Num::Int(*v)).collect();
            write_kinds(writer, &run)?;
        }
        Method::Vlq => {
            for value in values {
                writer.write_vlq(unsigned(*value, method)?);
            }
        }
        Method::Varint => {
            for value in values {
                writer.write_int_var(*value);
            }
        }
        Method::Nibble => {
            let mut nibbles = Vec::with_capacity(values.len());
            let mut spills = Vec::new();
            for value in values {
                let value = unsigned(*value, method)?;
                if value > 7 {
                    nibbles.push(value & 7 | 8);
                    spills.push(value >> 3);
                } else {
                    nibbles.push(value);
                }
            }
            writer.write_bits(&nibbles, 4);
            for spill in spills {
                writer.write_vlq(spill);
            }
        }
        Method::SignedNibble => {
            let mut nibbles = Vec::with_capacity(values.len());
            let mut spills = Vec::new();
            for value in values {
                let magnitude = value.unsigned_abs();
                let sign = if *value < 0 { 8 } else { 0 };
                nibbles.push(magnitude.min(7) | sign);
                if magnitude >= 7 {
                    spills.push(magnitude - 7);
                }
            }
            writer.write_bits(&nibbles, 4);
            for spill in spills {
                writer.write_vlq(spill);
            }
        }
        Method::BitPacked => {
            let unsigned_values = values
                .iter()
                .map(|value| unsigned(*value, method))
                .collect::<Result<Vec<u64>>>()?;
            let max = unsigned_values.iter().copied().max().unwrap_or(0);
            let width = bit_length(max);
            writer.write_u8(width as u8);
            writer.write_bits(&unsigned_values, width);
        }
        Method::Progression => {
            let (first, step) = match values {
                [] => (0, 0),
                [only] => (*only, 0),
                _ => progression_of(values).ok_or_else(|| {
                    PacksonError::Internal("run is not an arithmetic progression".to_string())
                })?,
            };
            writer.write_int_var(first);
            writer.write_int_var(step);
        }
    }
    Ok(())
}

fn read_method(reader: &mut ByteReader<'_>, count: usize, method: Method) -> Result<Vec<i64>> {
    match method {
        Method::Kinds => read_kinds(reader, count)?
            .into_iter()
            .map(|num| {
                num.as_int().ok_or_else(|| {
                    PacksonError::InvalidHeader("lowered run holds a non-integer".to_string())
                })
            })
            .collect(),
        Method::Vlq => (0..count).map(|_| signed(reader.read_vlq()?)).collect(),
        Method::Varint => (0..count).map(|_| reader.read_int_var()).collect(),
        Method::Nibble => {
            let nibbles = reader.read_bits(count, 4)?;
            nibbles
                .into_iter()
                .map(|nibble| {
                    let low = nibble & 7;
                    if nibble & 8 == 0 {
                        return Ok(low as i64);
                    }
                    let spill = reader.read_vlq()?;
                    let value = spill
                        .checked_mul(8)
                        .ok_or_else(|| overflow("nibble"))?;
                    signed(value | low)
                })
                .collect()
        }
        Method::SignedNibble => {
            let nibbles = reader.read_bits(count, 4)?;
            nibbles
                .into_iter()
                .map(|nibble| {
                    let mut magnitude = nibble & 7;
                    if magnitude == 7 {
                        magnitude = reader
                            .read_vlq()?
                            .checked_add(7)
                            .ok_or_else(|| overflow("signed nibble"))?;
                    }
                    if nibble & 8 == 0 {
                        signed(magnitude)
                    } else if magnitude <= i64::MIN.unsigned_abs() {
                        Ok((magnitude as i64).wrapping_neg())
                    } else {
                        Err(overflow("signed nibble"))
                    }
                })
                .collect()
        }
        Method::BitPacked => {
            let width = reader.read_u8()? as u32;
            reader
                .read_bits(count, width)?
                .into_iter()
                .map(signed)
                .collect()
        }
        Method::Progression => {
            let first = reader.read_int_var()?;
            let step = reader.read_int_var()?;
            let mut values = Vec::with_capacity(count.min(1 << 16));
            let mut current = first;
            for i in 0..count {
                if i > 0 {
                    current = current
                        .checked_add(step)
                        .ok_or_else(|| overflow("progression"))?;
                }
                values.push(current);
            }
            Ok(values)
        }
    }
}
