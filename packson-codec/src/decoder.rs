//! Depth-first decoder driver, the mirror of [`crate::encoder`]

use packson_format::constants::{
    ARRAY_FLAG_COLUMNS, ARRAY_FLAG_FLATTENED, ARRAY_FLAG_INLINE, ARRAY_SUB_EMPTY,
    OBJECT_END, OBJECT_SUB_EMPTY,
};
use packson_format::{ByteReader, Kind, Limits, PackedType, PacksonError, Result};
use serde_json::{Map, Value};

use crate::numeric::{decode_numeric_run, read_number, NumericEncoding};
use crate::strings::StringPool;
use crate::structure::{ArrayHeaderDefs, EntryScopes};

/// Counters gathered while decoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeSummary {
    /// Distinct strings in the table
    pub strings: usize,
    /// String use-sites
    pub references: usize,
    /// Bytes of middle segments
    pub blob_len: usize,
    /// Bytes taken by the string table
    pub table_len: usize,
    /// Bytes after the string table
    pub body_len: usize,
    /// Array headers defined
    pub headers: usize,
    /// Object entries defined
    pub entries: usize,
    /// Non-empty arrays read, column arrays included
    pub arrays: usize,
    /// Object payloads read
    pub objects: usize,
}

/// Decoder state for one call
pub struct Decoder<'b> {
    reader: ByteReader<'b>,
    strings: StringPool,
    headers: ArrayHeaderDefs,
    entries: EntryScopes<String>,
    limits: Limits,
    elements: usize,
    arrays: usize,
    objects: usize,
}

impl<'b> Decoder<'b> {
    /// Read the string table at the front of `data`
    pub fn new(data: &'b [u8], limits: &Limits) -> Result<Self> {
        let mut reader = ByteReader::new(data);
        let strings = StringPool::read(&mut reader, limits)?;
        Ok(Self {
            reader,
            strings,
            headers: ArrayHeaderDefs::new(),
            entries: EntryScopes::new(),
            limits: limits.clone(),
            elements: 0,
            arrays: 0,
            objects: 0,
        })
    }

    /// Read the root value and check that the whole input was consumed
    pub fn decode_root(&mut self) -> Result<Value> {
        let ty = PackedType::from_u8(self.reader.read_u8()?)?;
        let value = self.read_payload(ty)?;
        self.reader.expect_end()?;
        if !self.strings.is_exhausted() {
            return Err(PacksonError::DictionaryError);
        }
        Ok(value)
    }

    /// Counters so far
    pub fn summary(&self) -> DecodeSummary {
        DecodeSummary {
            strings: self.strings.strings().len(),
            references: self.strings.reference_count(),
            blob_len: self.strings.blob_len(),
            table_len: self.strings.table_len(),
            body_len: self.reader.position() - self.strings.table_len(),
            headers: self.headers.len(),
            entries: self.entries.definitions(),
            arrays: self.arrays,
            objects: self.objects,
        }
    }

    fn read_payload(&mut self, ty: PackedType) -> Result<Value> {
        Ok(match ty.kind() {
            Kind::Null => Value::Null,
            Kind::True => Value::Bool(true),
            Kind::False => Value::Bool(false),
            Kind::String => Value::String(self.strings.next_string()?),
            Kind::Number => {
                let kind = ty
                    .number_kind()
                    .ok_or(PacksonError::InvalidTypeTag(ty.as_u8()))?;
                read_number(&mut self.reader, kind)?.to_value()
            }
            Kind::Object if ty.sub() == OBJECT_SUB_EMPTY => Value::Object(Map::new()),
            Kind::Object => Value::Object(self.read_object()?),
            Kind::Array if ty.sub() == ARRAY_SUB_EMPTY => Value::Array(Vec::new()),
            Kind::Array => Value::Array(self.read_values()?),
            Kind::Hole => return Err(PacksonError::InvalidTypeTag(ty.as_u8())),
        })
    }

    fn read_object(&mut self) -> Result<Map<String, Value>> {
        self.objects += 1;
        let mut map = Map::new();
        for ordinal in 0.. {
            let code = self.reader.read_uint_var()?;
            if code == OBJECT_END {
                break;
            }
            let defined = self.entries.count(ordinal) as u64;
            let (key, ty) = if code <= defined {
                self.entries
                    .get(ordinal, (code - 1) as usize)
                    .cloned()
                    .ok_or(PacksonError::DictionaryError)?
            } else if code == defined + 1 {
                let ty = PackedType::from_u8(self.reader.read_u8()?)?;
                let key = self.strings.next_string()?;
                self.entries.define(ordinal, key.clone(), ty);
                (key, ty)
            } else {
                return Err(PacksonError::DictionaryError);
            };
            let value = self.read_payload(ty)?;
            map.insert(key, value);
        }
        Ok(map)
    }

    /// Read an array payload that may not contain holes
    fn read_values(&mut self) -> Result<Vec<Value>> {
        self.read_array()?
            .into_iter()
            .map(|cell| cell.ok_or(PacksonError::InvalidTypeTag(Kind::Hole as u8)))
            .collect()
    }

    /// Read an array payload; holes come back as `None`
    fn read_array(&mut self) -> Result<Vec<Option<Value>>> {
        let len = self.reader.read_len()?;
        if len == 0 {
            return Ok(Vec::new());
        }
        Limits::check("Array length", len, self.limits.max_array_len)?;
        self.elements = self.elements.saturating_add(len);
        Limits::check("Total elements", self.elements, self.limits.max_total_elements)?;
        self.arrays += 1;
        let header = self.headers.read(&mut self.reader)?;

        let codes = match header.kinds.single() {
            Some(only) => vec![only; len],
            None => self.reader.read_type_index(len, header.kinds)?,
        };
        let count = |kind: Kind| codes.iter().filter(|code| **code == kind as u8).count();

        let strings = (0..count(Kind::String))
            .map(|_| self.strings.next_string())
            .collect::<Result<Vec<_>>>()?;

        let numbers = match count(Kind::Number) {
            0 => Vec::new(),
            n => decode_numeric_run(&mut self.reader, n, header.numeric)?,
        };

        let array_count = count(Kind::Array);
        let arrays = if header.has(ARRAY_FLAG_FLATTENED) {
            self.read_flattened(array_count)?
        } else {
            (0..array_count)
                .map(|_| self.read_values())
                .collect::<Result<Vec<_>>>()?
        };

        let object_count = count(Kind::Object);
        let mut objects = vec![Map::new(); object_count];
        if header.has(ARRAY_FLAG_COLUMNS) {
            self.read_columns(&mut objects)?;
        }
        if header.has(ARRAY_FLAG_INLINE) {
            self.entries.push_scope();
            for map in &mut objects {
                let inline = self.read_object()?;
                map.extend(inline);
            }
            self.entries.pop_scope();
        } else {
            self.objects += object_count;
        }

        let mut strings = strings.into_iter();
        let mut numbers = numbers.into_iter();
        let mut arrays = arrays.into_iter();
        let mut objects = objects.into_iter();
        let missing = || PacksonError::Internal("array section shorter than its type index".into());

        codes
            .into_iter()
            .map(|code| {
                Ok(match Kind::from_u8(code)? {
                    Kind::Null => Some(Value::Null),
                    Kind::True => Some(Value::Bool(true)),
                    Kind::False => Some(Value::Bool(false)),
                    Kind::String => Some(Value::String(strings.next().ok_or_else(missing)?)),
                    Kind::Number => Some(numbers.next().ok_or_else(missing)?.to_value()),
                    Kind::Array => Some(Value::Array(arrays.next().ok_or_else(missing)?)),
                    Kind::Object => Some(Value::Object(objects.next().ok_or_else(missing)?)),
                    Kind::Hole => None,
                })
            })
            .collect()
    }

    fn read_flattened(&mut self, count: usize) -> Result<Vec<Vec<Value>>> {
        let encoding = NumericEncoding::from_code(self.reader.read_vlq()?)?;
        let lengths = decode_numeric_run(&mut self.reader, count, encoding)?
            .into_iter()
            .map(|num| {
                num.as_int()
                    .and_then(|len| usize::try_from(len).ok())
                    .ok_or_else(|| PacksonError::InvalidHeader(format!("sub-array length {num:?}")))
            })
            .collect::<Result<Vec<usize>>>()?;

        let joined = self.read_values()?;
        let total = lengths
            .iter()
            .try_fold(0usize, |acc, len| acc.checked_add(*len));
        if total != Some(joined.len()) {
            return Err(PacksonError::InvalidHeader(format!(
                "flattened sub-arrays hold {} elements, lengths announce {total:?}",
                joined.len()
            )));
        }

        let mut elements = joined.into_iter();
        Ok(lengths
            .into_iter()
            .map(|len| elements.by_ref().take(len).collect())
            .collect())
    }

    fn read_columns(&mut self, objects: &mut [Map<String, Value>]) -> Result<()> {
        let column_count = self.reader.read_len()?;
        let mut keys = Vec::with_capacity(column_count.min(self.reader.remaining()));
        for _ in 0..column_count {
            keys.push(self.strings.next_string()?);
        }
        for key in keys {
            let cells = self.read_array()?;
            if cells.len() != objects.len() {
                return Err(PacksonError::InvalidHeader(format!(
                    "column {key:?} has {} cells for {} objects",
                    cells.len(),
                    objects.len()
                )));
            }
            for (map, cell) in objects.iter_mut().zip(cells) {
                if let Some(value) = cell {
                    map.insert(key.clone(), value);
                }
            }
        }
        Ok(())
    }
}
