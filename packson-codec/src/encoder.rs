//! Depth-first encoder driver
//!
//! The body is written into its own [`ByteWriter`] while strings are
//! collected; [`Encoder::finish`] renders the string table and appends the
//! body behind it.

use ahash::AHashMap;
use packson_format::constants::{
    ARRAY_FLAG_COLUMNS, ARRAY_FLAG_FLATTENED, ARRAY_FLAG_INLINE, COLUMN_MIN_OBJECTS,
    FLATTEN_MIN_SUBARRAYS, OBJECT_END,
};
use packson_format::{ByteWriter, Kind, Result, TypeBitmap};
use serde_json::{Map, Value};
use tracing::trace;

use crate::classify::{kind_of, value_type, Num};
use crate::numeric::{encode_numeric_run, select_encoding, write_number, NumericEncoding};
use crate::strings::StringTable;
use crate::structure::{ArrayHeader, ArrayHeaderDefs, EntryLookup, EntryScopes};

/// Counters reported once an encode call completes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeSummary {
    /// Distinct strings
    pub strings: usize,
    /// String use-sites
    pub references: usize,
    /// Array headers defined
    pub headers: usize,
    /// Object entries defined
    pub entries: usize,
    /// Body bytes, string table excluded
    pub body_len: usize,
}

/// Encoder state for one call
pub struct Encoder<'a> {
    body: ByteWriter,
    strings: StringTable<'a>,
    headers: ArrayHeaderDefs,
    entries: EntryScopes<&'a str>,
    chunk_size: usize,
}

impl<'a> Encoder<'a> {
    /// Create an encoder whose buffers grow by `chunk_size`
    pub fn new(chunk_size: usize) -> Self {
        Self {
            body: ByteWriter::with_chunk_size(chunk_size),
            strings: StringTable::new(),
            headers: ArrayHeaderDefs::new(),
            entries: EntryScopes::new(),
            chunk_size,
        }
    }

    /// Write the root packed type and its payload
    pub fn encode_root(&mut self, value: &'a Value) -> Result<()> {
        let ty = value_type(value);
        self.body.write_u8(ty.as_u8());
        self.write_payload(value)
    }

    /// Counters so far
    pub fn summary(&self) -> EncodeSummary {
        EncodeSummary {
            strings: self.strings.len(),
            references: self.strings.reference_count(),
            headers: self.headers.len(),
            entries: self.entries.definitions(),
            body_len: self.body.len(),
        }
    }

    /// Render the string table followed by the body
    pub fn finish(self) -> Vec<u8> {
        let mut out = ByteWriter::with_chunk_size(self.chunk_size);
        self.strings.render(&mut out);
        out.append(self.body);
        out.finish()
    }

    fn write_payload(&mut self, value: &'a Value) -> Result<()> {
        match value {
            Value::Null | Value::Bool(_) => {}
            Value::String(s) => {
                self.strings.intern(s);
            }
            Value::Number(number) => {
                if let Some(num) = Num::from_number(number) {
                    write_number(&mut self.body, num, num.kind())?;
                }
            }
            Value::Object(map) => {
                if !map.is_empty() {
                    self.write_object(map.iter().map(|(key, value)| (key.as_str(), value)))?;
                }
            }
            Value::Array(items) => {
                if !items.is_empty() {
                    let cells: Vec<Option<&'a Value>> = items.iter().map(Some).collect();
                    self.write_array(&cells)?;
                }
            }
        }
        Ok(())
    }

    fn write_object<I>(&mut self, entries: I) -> Result<()>
    where
        I: Iterator<Item = (&'a str, &'a Value)>,
    {
        for (ordinal, (key, value)) in entries.enumerate() {
            let ty = value_type(value);
            match self.entries.lookup(ordinal, &key, ty) {
                EntryLookup::Cached(index) => self.body.write_uint_var(index as u64 + 1),
                EntryLookup::Missing { definitions } => {
                    self.body.write_uint_var(definitions as u64 + 1);
                    self.body.write_u8(ty.as_u8());
                    self.strings.intern(key);
                    self.entries.define(ordinal, key, ty);
                }
            }
            self.write_payload(value)?;
        }
        self.body.write_uint_var(OBJECT_END);
        Ok(())
    }

    /// Write an array payload; `None` cells are column holes
    fn write_array(&mut self, cells: &[Option<&'a Value>]) -> Result<()> {
        self.body.write_vlq(cells.len() as u64);
        if cells.is_empty() {
            return Ok(());
        }

        let scan = ArrayScan::new(cells);
        let columns = plan_columns(&scan.objects);

        let mut flags = 0;
        if !columns.is_empty() {
            flags |= ARRAY_FLAG_COLUMNS;
        }
        let has_inline = !scan.objects.is_empty()
            && (columns.is_empty()
                || scan
                    .objects
                    .iter()
                    .any(|map| map.keys().any(|key| !columns.contains(&key.as_str()))));
        if has_inline {
            flags |= ARRAY_FLAG_INLINE;
        }
        let flatten = scan.arrays.len() >= FLATTEN_MIN_SUBARRAYS;
        if flatten {
            flags |= ARRAY_FLAG_FLATTENED;
        }

        let numeric = if scan.numbers.is_empty() {
            NumericEncoding::KINDS
        } else {
            select_encoding(&scan.numbers)
        };
        let header = ArrayHeader {
            kinds: scan.kinds,
            numeric,
            flags,
        };
        trace!(
            len = cells.len(),
            kinds = scan.kinds.raw(),
            flags,
            columns = columns.len(),
            "array header"
        );
        self.headers.write(&mut self.body, header);

        if let Some(codes) = &scan.codes {
            self.body.write_type_index(codes, scan.kinds);
        }

        for s in scan.strings.iter().copied() {
            self.strings.intern(s);
        }

        if !scan.numbers.is_empty() {
            encode_numeric_run(&mut self.body, &scan.numbers, numeric)?;
        }

        if flatten {
            let lengths: Vec<Num> = scan
                .arrays
                .iter()
                .map(|items| Num::Int(items.len() as i64))
                .collect();
            let encoding = select_encoding(&lengths);
            self.body.write_vlq(encoding.code());
            encode_numeric_run(&mut self.body, &lengths, encoding)?;

            let joined: Vec<Option<&'a Value>> = scan
                .arrays
                .iter()
                .copied()
                .flat_map(|items| items.iter().map(Some))
                .collect();
            self.write_array(&joined)?;
        } else {
            for items in scan.arrays.iter().copied() {
                let sub: Vec<Option<&'a Value>> = items.iter().map(Some).collect();
                self.write_array(&sub)?;
            }
        }

        if !columns.is_empty() {
            self.body.write_vlq(columns.len() as u64);
            for key in columns.iter().copied() {
                self.strings.intern(key);
            }
            for key in columns.iter().copied() {
                let column: Vec<Option<&'a Value>> =
                    scan.objects.iter().copied().map(|map| map.get(key)).collect();
                self.write_array(&column)?;
            }
        }

        if has_inline {
            self.entries.push_scope();
            for map in scan.objects.iter().copied() {
                let inline = map
                    .iter()
                    .filter(|(key, _)| !columns.contains(&key.as_str()))
                    .map(|(key, value)| (key.as_str(), value));
                self.write_object(inline)?;
            }
            self.entries.pop_scope();
        }

        Ok(())
    }
}

/// One pass over an array's cells, bucketing elements by kind
struct ArrayScan<'a> {
    kinds: TypeBitmap,
    /// Per-element kind codes, allocated once a second kind shows up
    codes: Option<Vec<u8>>,
    strings: Vec<&'a str>,
    numbers: Vec<Num>,
    arrays: Vec<&'a [Value]>,
    objects: Vec<&'a Map<String, Value>>,
}

impl<'a> ArrayScan<'a> {
    fn new(cells: &[Option<&'a Value>]) -> Self {
        let mut scan = ArrayScan {
            kinds: TypeBitmap::empty(),
            codes: None,
            strings: Vec::new(),
            numbers: Vec::new(),
            arrays: Vec::new(),
            objects: Vec::new(),
        };
        let mut first_code = None;

        for (i, cell) in cells.iter().copied().enumerate() {
            let kind = match cell {
                Some(value) => kind_of(value),
                None => Kind::Hole,
            };
            let code = kind as u8;

            let first = *first_code.get_or_insert(code);
            if first != code && scan.codes.is_none() {
                let mut codes = Vec::with_capacity(cells.len());
                codes.resize(i, first);
                scan.codes = Some(codes);
            }
            if let Some(codes) = scan.codes.as_mut() {
                codes.push(code);
            }
            scan.kinds.insert(code);

            match cell {
                Some(Value::String(s)) => scan.strings.push(s),
                Some(Value::Number(number)) => {
                    if let Some(num) = Num::from_number(number) {
                        scan.numbers.push(num);
                    }
                }
                Some(Value::Array(items)) => scan.arrays.push(items),
                Some(Value::Object(map)) => scan.objects.push(map),
                _ => {}
            }
        }
        scan
    }
}

/// Keys stored key-major across an array's objects, in first-appearance order
///
/// A key qualifies when it appears in at least two objects and in at least
/// half of them.
fn plan_columns<'a>(objects: &[&'a Map<String, Value>]) -> Vec<&'a str> {
    if objects.len() < COLUMN_MIN_OBJECTS {
        return Vec::new();
    }
    let mut order: Vec<(&'a str, usize)> = Vec::new();
    let mut seen: AHashMap<&'a str, usize> = AHashMap::new();
    for map in objects {
        for key in map.keys() {
            match seen.get(key.as_str()) {
                Some(slot) => order[*slot].1 += 1,
                None => {
                    seen.insert(key.as_str(), order.len());
                    order.push((key.as_str(), 1));
                }
            }
        }
    }
    order
        .into_iter()
        .filter(|(_, count)| *count >= COLUMN_MIN_OBJECTS && count * 2 >= objects.len())
        .map(|(key, _)| key)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn objects(value: &Value) -> Vec<&Map<String, Value>> {
        value
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_object)
            .collect()
    }

    #[test]
    fn test_plan_columns_threshold() {
        let value = json!([
            {"id": 1, "name": "a", "rare": true},
            {"id": 2, "name": "b"},
            {"id": 3, "extra": 1},
            {"id": 4, "extra": 2}
        ]);
        // id: 4/4, name: 2/4, rare: 1/4, extra: 2/4; first-appearance order
        assert_eq!(plan_columns(&objects(&value)), vec!["id", "name", "extra"]);
    }

    #[test]
    fn test_plan_columns_needs_two_objects() {
        let value = json!([{"a": 1}]);
        assert!(plan_columns(&objects(&value)).is_empty());
        let value = json!([{"a": 1}, {"b": 1}, {"c": 1}]);
        assert!(plan_columns(&objects(&value)).is_empty());
    }

    #[test]
    fn test_scan_allocates_codes_lazily() {
        let items = [json!(1), json!(2), json!(3)];
        let cells: Vec<Option<&Value>> = items.iter().map(Some).collect();
        let scan = ArrayScan::new(&cells);
        assert!(scan.codes.is_none());
        assert_eq!(scan.kinds.count(), 1);
        assert_eq!(scan.numbers.len(), 3);

        let items = [json!(1), json!(2), json!("x"), json!(null)];
        let mut cells: Vec<Option<&Value>> = items.iter().map(Some).collect();
        cells.push(None);
        let scan = ArrayScan::new(&cells);
        assert_eq!(
            scan.codes,
            Some(vec![
                Kind::Number as u8,
                Kind::Number as u8,
                Kind::String as u8,
                Kind::Null as u8,
                Kind::Hole as u8,
            ])
        );
        assert_eq!(scan.strings, vec!["x"]);
    }

    #[test]
    fn test_summary_counts_definitions() {
        let value = json!([{"a": 1, "b": "x"}, {"a": 2, "b": "x"}, {"a": 3, "b": "y"}]);
        let mut encoder = Encoder::new(64);
        encoder.encode_root(&value).unwrap();
        let summary = encoder.summary();
        // outer array, the numeric column and the string column
        assert_eq!(summary.headers, 3);
        assert_eq!(summary.entries, 0);
        assert_eq!(summary.strings, 4);
        assert_eq!(summary.references, 5);
    }
}
