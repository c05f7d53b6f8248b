//! String interning with prefix/suffix sharing
//!
//! Every string use-site (object key, string value, column key) is routed
//! through [`StringTable`] during encoding and through [`StringPool`] during
//! decoding. Use-sites write nothing into the body; the table rendered in
//! front of the body carries every distinct string once, plus the reference
//! list that replays the use-site order.

use ahash::AHashMap;
use packson_format::constants::{
    MIN_SHARED_RUN, STRING_FLAG_BITS, STRING_FLAG_PREFIX, STRING_FLAG_SUFFIX,
};
use packson_format::{ByteReader, ByteWriter, Limits, PacksonError, Result};

/// Encoder-side string table
///
/// Ids are assigned in first-use order and borrowed from the value tree.
#[derive(Debug, Default)]
pub struct StringTable<'a> {
    ids: AHashMap<&'a str, u32>,
    strings: Vec<&'a str>,
    refs: Vec<u32>,
}

impl<'a> StringTable<'a> {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one use-site of `s`, returning its id
    pub fn intern(&mut self, s: &'a str) -> u32 {
        let id = match self.ids.get(s) {
            Some(id) => *id,
            None => {
                let id = self.strings.len() as u32;
                self.ids.insert(s, id);
                self.strings.push(s);
                id
            }
        };
        self.refs.push(id);
        id
    }

    /// Number of distinct strings
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Whether no string has been interned
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Number of use-sites recorded
    pub fn reference_count(&self) -> usize {
        self.refs.len()
    }

    /// Distinct strings in id order
    pub fn strings(&self) -> &[&'a str] {
        &self.strings
    }

    /// Render the table: counts, definitions, shared-run lengths, middle blob, references
    pub fn render(&self, writer: &mut ByteWriter) {
        writer.write_vlq(self.strings.len() as u64);
        writer.write_vlq(self.refs.len() as u64);

        let mut prev = "";
        let mut pieces = Vec::with_capacity(self.strings.len());
        for s in &self.strings {
            let piece = Piece::split(prev, s);
            let mut def = (piece.middle.len() as u64) << STRING_FLAG_BITS;
            if piece.prefix > 0 {
                def |= STRING_FLAG_PREFIX;
            }
            if piece.suffix > 0 {
                def |= STRING_FLAG_SUFFIX;
            }
            writer.write_vlq(def);
            pieces.push(piece);
            prev = s;
        }

        for piece in &pieces {
            if piece.prefix > 0 {
                writer.write_vlq(piece.prefix as u64);
            }
            if piece.suffix > 0 {
                writer.write_vlq(piece.suffix as u64);
            }
        }

        for piece in &pieces {
            writer.write_str(piece.middle);
        }

        let mut next_new = 0u32;
        for id in &self.refs {
            if *id == next_new {
                writer.write_vlq(0);
                next_new += 1;
            } else {
                writer.write_vlq(*id as u64 + 1);
            }
        }
    }
}

/// A string split against its predecessor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Piece<'a> {
    prefix: usize,
    middle: &'a str,
    suffix: usize,
}

impl<'a> Piece<'a> {
    fn split(prev: &str, cur: &'a str) -> Self {
        let prefix = shared_prefix(prev, cur);
        let suffix = shared_suffix(prev, &cur[prefix..]);
        Self {
            prefix,
            middle: &cur[prefix..cur.len() - suffix],
            suffix,
        }
    }
}

fn shared_prefix(prev: &str, cur: &str) -> usize {
    let mut len = prev
        .bytes()
        .zip(cur.bytes())
        .take_while(|(a, b)| a == b)
        .count();
    while !(prev.is_char_boundary(len) && cur.is_char_boundary(len)) {
        len -= 1;
    }
    if len >= MIN_SHARED_RUN {
        len
    } else {
        0
    }
}

fn shared_suffix(prev: &str, rest: &str) -> usize {
    let mut len = prev
        .bytes()
        .rev()
        .zip(rest.bytes().rev())
        .take_while(|(a, b)| a == b)
        .count();
    while !(prev.is_char_boundary(prev.len() - len) && rest.is_char_boundary(rest.len() - len)) {
        len -= 1;
    }
    if len >= MIN_SHARED_RUN {
        len
    } else {
        0
    }
}

/// Decoder-side string table
#[derive(Debug, Clone, Default)]
pub struct StringPool {
    strings: Vec<String>,
    refs: Vec<u32>,
    cursor: usize,
    blob_len: usize,
    table_len: usize,
}

impl StringPool {
    /// Read a rendered table from the front of the stream
    pub fn read(reader: &mut ByteReader<'_>, limits: &Limits) -> Result<Self> {
        let start = reader.position();
        let count = reader.read_len()?;
        let ref_count = reader.read_len()?;
        Limits::check("String count", count, limits.max_strings)?;
        Limits::check("String references", ref_count, limits.max_string_refs)?;

        let mut defs = Vec::with_capacity(count.min(reader.remaining()));
        for _ in 0..count {
            let def = reader.read_vlq()?;
            let middle = usize::try_from(def >> STRING_FLAG_BITS)
                .map_err(|_| PacksonError::InvalidHeader(format!("string length {def}")))?;
            defs.push((
                middle,
                def & STRING_FLAG_PREFIX != 0,
                def & STRING_FLAG_SUFFIX != 0,
            ));
        }

        let mut slices = Vec::with_capacity(defs.len());
        for (_, has_prefix, has_suffix) in &defs {
            let prefix = if *has_prefix { reader.read_len()? } else { 0 };
            let suffix = if *has_suffix { reader.read_len()? } else { 0 };
            slices.push((prefix, suffix));
        }

        let mut strings: Vec<String> = Vec::with_capacity(defs.len());
        let mut blob_len = 0usize;
        let mut text_len = 0usize;
        for ((middle_len, _, _), (prefix, suffix)) in defs.iter().zip(&slices) {
            let middle = reader.read_str(*middle_len)?;
            blob_len += middle_len;

            let prev = strings.last().map(String::as_str).unwrap_or("");
            let head = prev.get(..*prefix).ok_or(PacksonError::DictionaryError)?;
            let tail = prev
                .len()
                .checked_sub(*suffix)
                .and_then(|at| prev.get(at..))
                .ok_or(PacksonError::DictionaryError)?;

            // shared runs may overlap inside `prev`, so lengths can double
            text_len = text_len.saturating_add(head.len() + middle.len() + tail.len());
            Limits::check("String bytes", text_len, limits.max_string_bytes)?;

            let mut built = String::with_capacity(head.len() + middle.len() + tail.len());
            built.push_str(head);
            built.push_str(middle);
            built.push_str(tail);
            strings.push(built);
        }

        let mut refs = Vec::with_capacity(ref_count.min(reader.remaining()));
        let mut next_new = 0usize;
        for _ in 0..ref_count {
            let code = reader.read_len()?;
            let id = if code == 0 {
                next_new += 1;
                next_new - 1
            } else {
                code - 1
            };
            if id >= next_new || id >= strings.len() {
                return Err(PacksonError::DictionaryError);
            }
            refs.push(id as u32);
        }

        Ok(Self {
            strings,
            refs,
            cursor: 0,
            blob_len,
            table_len: reader.position() - start,
        })
    }

    /// Resolve the next use-site
    pub fn next_string(&mut self) -> Result<String> {
        let id = *self
            .refs
            .get(self.cursor)
            .ok_or(PacksonError::DictionaryError)?;
        self.cursor += 1;
        Ok(self.strings[id as usize].clone())
    }

    /// Whether every reference has been consumed
    pub fn is_exhausted(&self) -> bool {
        self.cursor == self.refs.len()
    }

    /// Distinct strings in id order
    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    /// Number of use-sites
    pub fn reference_count(&self) -> usize {
        self.refs.len()
    }

    /// Bytes in the middle-segment blob
    pub fn blob_len(&self) -> usize {
        self.blob_len
    }

    /// Bytes taken by the whole rendered table
    pub fn table_len(&self) -> usize {
        self.table_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn render(uses: &[&str]) -> Vec<u8> {
        let mut table = StringTable::new();
        for s in uses {
            table.intern(s);
        }
        let mut writer = ByteWriter::new();
        table.render(&mut writer);
        writer.finish()
    }

    fn replay(bytes: &[u8]) -> Vec<String> {
        let mut reader = ByteReader::new(bytes);
        let mut pool = StringPool::read(&mut reader, &Limits::default()).unwrap();
        assert!(reader.is_at_end());
        let mut out = Vec::new();
        while !pool.is_exhausted() {
            out.push(pool.next_string().unwrap());
        }
        out
    }

    #[test]
    fn test_ids_follow_first_use() {
        let mut table = StringTable::new();
        assert_eq!(table.intern("b"), 0);
        assert_eq!(table.intern("a"), 1);
        assert_eq!(table.intern("b"), 0);
        assert_eq!(table.len(), 2);
        assert_eq!(table.reference_count(), 3);
        assert_eq!(table.strings(), &["b", "a"]);
    }

    #[test]
    fn test_shared_prefix() {
        let piece = Piece::split("abcdef", "abcxyz");
        assert_eq!(piece, Piece { prefix: 3, middle: "xyz", suffix: 0 });

        let bytes = render(&["abcdef", "abcxyz"]);
        // counts, two defs, one prefix slice, blob "abcdef" + "xyz", two new refs
        assert_eq!(bytes.len(), 2 + 2 + 1 + 9 + 2);
        assert_eq!(replay(&bytes), vec!["abcdef", "abcxyz"]);
    }

    #[test]
    fn test_shared_suffix() {
        let piece = Piece::split("user_id", "group_id");
        assert_eq!(piece, Piece { prefix: 0, middle: "group", suffix: 3 });
        assert_eq!(
            replay(&render(&["user_id", "group_id"])),
            vec!["user_id", "group_id"]
        );
    }

    #[test]
    fn test_prefix_and_suffix() {
        let piece = Piece::split("item_001.json", "item_002.json");
        assert_eq!(piece.prefix, 7);
        assert_eq!(piece.middle, "2");
        assert_eq!(piece.suffix, 5);
    }

    #[test]
    fn test_short_runs_are_not_shared() {
        assert_eq!(Piece::split("ab", "ax").prefix, 0);
        assert_eq!(Piece::split("xa", "ya").suffix, 0);
        assert_eq!(Piece::split("", "abc").middle, "abc");
    }

    #[test]
    fn test_runs_never_overlap() {
        // "aaaa" after "aaa": prefix takes all of "aaa", suffix sees only "a"
        let piece = Piece::split("aaa", "aaaa");
        assert_eq!(piece.prefix + piece.middle.len() + piece.suffix, 4);
        assert_eq!(replay(&render(&["aaa", "aaaa"])), vec!["aaa", "aaaa"]);

        let piece = Piece::split("abab", "ab");
        assert_eq!(piece.prefix + piece.middle.len() + piece.suffix, 2);
    }

    #[test]
    fn test_char_boundaries() {
        // é = C3 A9, ê = C3 AA: the shared lead byte must not be split off
        let piece = Piece::split("xxé", "xxê");
        assert_eq!(piece.prefix, 2);
        assert_eq!(piece.middle, "ê");
        assert_eq!(
            replay(&render(&["日本語テキスト", "日本語の文字", "ひらがなテキスト"])),
            vec!["日本語テキスト", "日本語の文字", "ひらがなテキスト"]
        );
    }

    #[test]
    fn test_repeated_string_is_defined_once() {
        let uses = vec!["repeat"; 100];
        let bytes = render(&uses);
        let mut reader = ByteReader::new(&bytes);
        let pool = StringPool::read(&mut reader, &Limits::default()).unwrap();
        assert_eq!(pool.strings().len(), 1);
        assert_eq!(pool.reference_count(), 100);
        assert_eq!(pool.blob_len(), "repeat".len());
        assert_eq!(pool.table_len(), bytes.len());
    }

    #[test]
    fn test_empty_string() {
        assert_eq!(replay(&render(&["", "a", ""])), vec!["", "a", ""]);
        assert_eq!(render(&[]), vec![0, 0]);
    }

    #[test]
    fn test_exhausted_pool_errors() {
        let bytes = render(&["x"]);
        let mut reader = ByteReader::new(&bytes);
        let mut pool = StringPool::read(&mut reader, &Limits::default()).unwrap();
        assert_eq!(pool.next_string().unwrap(), "x");
        assert!(matches!(pool.next_string(), Err(PacksonError::DictionaryError)));
    }

    #[test]
    fn test_limits_checked_before_reading() {
        let bytes = render(&["a", "b", "c"]);
        let limits = Limits {
            max_strings: 2,
            ..Limits::default()
        };
        let mut reader = ByteReader::new(&bytes);
        assert!(matches!(
            StringPool::read(&mut reader, &limits),
            Err(PacksonError::LimitExceeded(_))
        ));
    }

    #[test]
    fn test_overlapping_runs_bounded_by_string_bytes() {
        // "ab", then prefix 2 + suffix 2 of the predecessor, twice
        let mut writer = ByteWriter::new();
        writer.write_vlq(3);
        writer.write_vlq(0);
        writer.write_vlq(2 << STRING_FLAG_BITS);
        writer.write_vlq(STRING_FLAG_PREFIX | STRING_FLAG_SUFFIX);
        writer.write_vlq(STRING_FLAG_PREFIX | STRING_FLAG_SUFFIX);
        writer.write_vlq(2);
        writer.write_vlq(2);
        writer.write_vlq(4);
        writer.write_vlq(4);
        writer.write_str("ab");
        let bytes = writer.finish();

        let mut reader = ByteReader::new(&bytes);
        let pool = StringPool::read(&mut reader, &Limits::default()).unwrap();
        assert_eq!(pool.strings(), ["ab", "abab", "abababab"]);

        let limits = Limits {
            max_string_bytes: 8,
            ..Limits::default()
        };
        let mut reader = ByteReader::new(&bytes);
        assert!(matches!(
            StringPool::read(&mut reader, &limits),
            Err(PacksonError::LimitExceeded(_))
        ));
        assert_eq!(replay(&render(&["abab", "ababab"])), vec!["abab", "ababab"]);
    }

    #[test]
    fn test_forward_reference_rejected() {
        let mut writer = ByteWriter::new();
        writer.write_vlq(1);
        writer.write_vlq(1);
        writer.write_vlq(1 << STRING_FLAG_BITS);
        writer.write_str("a");
        // repeat of id 0 before it was introduced
        writer.write_vlq(1);
        let bytes = writer.finish();
        let mut reader = ByteReader::new(&bytes);
        assert!(matches!(
            StringPool::read(&mut reader, &Limits::default()),
            Err(PacksonError::DictionaryError)
        ));
    }

    proptest! {
        #[test]
        fn prop_use_sites_replay(uses in prop::collection::vec("[a-c]{0,6}|[éü]{1,3}", 0..40)) {
            let refs: Vec<&str> = uses.iter().map(String::as_str).collect();
            let bytes = render(&refs);
            prop_assert_eq!(replay(&bytes), uses);
        }
    }
}
