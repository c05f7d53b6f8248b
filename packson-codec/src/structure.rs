//! Definition-vs-reference dictionaries for array headers and object entries
//!
//! Neither dictionary transmits ids on definition: both sides assign them in
//! traversal order, so the encoder and decoder must register definitions at
//! exactly the same points of the walk.

use std::hash::Hash;

use ahash::AHashMap;
use packson_format::constants::{
    ARRAY_FLAGS_MASK, ARRAY_FLAG_COLUMNS, ARRAY_FLAG_FLATTENED, ARRAY_FLAG_INLINE,
    HEADER_BITMAP_SHIFT, HEADER_FLAGS_SHIFT, NUMERIC_CODE_BITS,
};
use packson_format::{ByteReader, ByteWriter, Kind, PackedType, PacksonError, Result, TypeBitmap};

use crate::numeric::NumericEncoding;

/// Everything an array payload needs to know before its body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArrayHeader {
    /// Kinds present among the elements
    pub kinds: TypeBitmap,
    /// Encoding of the numeric run; [`NumericEncoding::KINDS`] when there is none
    pub numeric: NumericEncoding,
    /// `ARRAY_FLAG_*` bits
    pub flags: u64,
}

impl ArrayHeader {
    /// Pack into one integer: `numeric | kinds << 5 | flags << 13`
    pub fn pack(self) -> u64 {
        self.numeric.code()
            | (self.kinds.raw() as u64) << HEADER_BITMAP_SHIFT
            | self.flags << HEADER_FLAGS_SHIFT
    }

    /// Unpack and validate a header integer
    pub fn unpack(raw: u64) -> Result<Self> {
        let invalid = || PacksonError::InvalidHeader(format!("array header {raw:#x}"));

        let numeric = NumericEncoding::from_code(raw & ((1 << NUMERIC_CODE_BITS) - 1))?;
        let kinds = TypeBitmap::from_raw(((raw >> HEADER_BITMAP_SHIFT) & 0xFF) as u16);
        let flags = raw >> HEADER_FLAGS_SHIFT;

        if kinds.is_empty() || flags & !ARRAY_FLAGS_MASK != 0 {
            return Err(invalid());
        }
        let has_objects = kinds.contains(Kind::Object as u8);
        let object_flags = flags & (ARRAY_FLAG_COLUMNS | ARRAY_FLAG_INLINE);
        if has_objects != (object_flags != 0) {
            return Err(invalid());
        }
        if flags & ARRAY_FLAG_FLATTENED != 0 && !kinds.contains(Kind::Array as u8) {
            return Err(invalid());
        }
        Ok(Self {
            kinds,
            numeric,
            flags,
        })
    }

    /// Whether `flag` is set
    pub fn has(self, flag: u64) -> bool {
        self.flags & flag != 0
    }
}

/// Array header dictionary, one per call
#[derive(Debug, Default)]
pub struct ArrayHeaderDefs {
    ids: AHashMap<u64, u64>,
    headers: Vec<ArrayHeader>,
}

impl ArrayHeaderDefs {
    /// Create an empty dictionary
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of headers defined so far
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Whether no header has been defined
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Write a cached id, or define `header` under the next id
    pub fn write(&mut self, writer: &mut ByteWriter, header: ArrayHeader) {
        let raw = header.pack();
        if let Some(id) = self.ids.get(&raw) {
            writer.write_vlq(*id);
            return;
        }
        let id = self.headers.len() as u64;
        writer.write_vlq(id);
        writer.write_vlq(raw);
        self.ids.insert(raw, id);
        self.headers.push(header);
    }

    /// Read a cached id or a definition
    pub fn read(&mut self, reader: &mut ByteReader<'_>) -> Result<ArrayHeader> {
        let id = reader.read_len()?;
        if let Some(header) = self.headers.get(id) {
            return Ok(*header);
        }
        if id != self.headers.len() {
            return Err(PacksonError::DictionaryError);
        }
        let header = ArrayHeader::unpack(reader.read_vlq()?)?;
        self.headers.push(header);
        Ok(header)
    }
}

/// Result of looking up an object entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryLookup {
    /// Already defined at this ordinal under the given index
    Cached(usize),
    /// Not defined; a definition would take index `definitions`
    Missing {
        /// Definitions currently cached at the ordinal
        definitions: usize,
    },
}

#[derive(Debug)]
struct OrdinalDefs<K> {
    defs: Vec<(K, PackedType)>,
    index: AHashMap<(K, PackedType), usize>,
}

impl<K> Default for OrdinalDefs<K> {
    fn default() -> Self {
        Self {
            defs: Vec::new(),
            index: AHashMap::new(),
        }
    }
}

type Scope<K> = Vec<OrdinalDefs<K>>;

/// Stack of object-entry scopes
///
/// Each scope maps an ordinal (position of an entry within its object) to
/// the `(key, type)` pairs defined at that position. The root scope lives
/// for the whole call; every array's inline-object section pushes a scope
/// for its sibling objects.
#[derive(Debug)]
pub struct EntryScopes<K> {
    scopes: Vec<Scope<K>>,
    total: usize,
}

impl<K: Clone + Eq + Hash> Default for EntryScopes<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone + Eq + Hash> EntryScopes<K> {
    /// Create the stack with its root scope
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new()],
            total: 0,
        }
    }

    /// Enter a sibling group
    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::new());
    }

    /// Leave a sibling group; the root scope is never popped
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Current nesting depth, root included
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Total definitions registered over the whole call
    pub fn definitions(&self) -> usize {
        self.total
    }

    fn top(&self) -> &Scope<K> {
        let last = self.scopes.len() - 1;
        &self.scopes[last]
    }

    fn top_mut(&mut self) -> &mut Scope<K> {
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    /// Look up `(key, ty)` at `ordinal` in the top scope
    pub fn lookup(&self, ordinal: usize, key: &K, ty: PackedType) -> EntryLookup {
        match self.top().get(ordinal) {
            Some(slot) => match slot.index.get(&(key.clone(), ty)) {
                Some(index) => EntryLookup::Cached(*index),
                None => EntryLookup::Missing {
                    definitions: slot.defs.len(),
                },
            },
            None => EntryLookup::Missing { definitions: 0 },
        }
    }

    /// Definitions cached at `ordinal` in the top scope
    pub fn count(&self, ordinal: usize) -> usize {
        self.top().get(ordinal).map_or(0, |slot| slot.defs.len())
    }

    /// Definition `index` at `ordinal` in the top scope
    pub fn get(&self, ordinal: usize, index: usize) -> Option<&(K, PackedType)> {
        self.top().get(ordinal)?.defs.get(index)
    }

    /// Register `(key, ty)` at `ordinal` in the top scope
    pub fn define(&mut self, ordinal: usize, key: K, ty: PackedType) {
        let scope = self.top_mut();
        if scope.len() <= ordinal {
            scope.resize_with(ordinal + 1, OrdinalDefs::default);
        }
        let slot = &mut scope[ordinal];
        slot.index.insert((key.clone(), ty), slot.defs.len());
        slot.defs.push((key, ty));
        self.total += 1;
    }
}
