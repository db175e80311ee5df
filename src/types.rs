use crate::blob::Blob;
use crate::codec::{DecodeError, Deserializer, Serializer, Sink};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// One source position: `(file_id, line, column)`.
///
/// Values are serialized little-endian like every other payload integer.
/// When a location is itself a table key (the `symbols` table) it uses
/// `encode_key`, a big-endian form whose byte-wise order equals numeric
/// order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Location {
    pub file_id: u32,
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(file_id: u32, line: u32, column: u32) -> Self {
        Self {
            file_id,
            line,
            column,
        }
    }

    pub fn encode_into<S: Sink>(&self, s: &mut Serializer<'_, S>) {
        s.write_u32(self.file_id)
            .write_u32(self.line)
            .write_u32(self.column);
    }

    pub fn decode_from(d: &mut Deserializer<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            file_id: d.read_u32()?,
            line: d.read_u32()?,
            column: d.read_u32()?,
        })
    }

    /// Order-preserving key form, 12 big-endian bytes.
    pub fn encode_key(&self) -> Blob {
        let mut out = Blob::with_capacity(12);
        out.append(&self.file_id.to_be_bytes())
            .append(&self.line.to_be_bytes())
            .append(&self.column.to_be_bytes());
        out
    }

    pub fn decode_key(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() != 12 {
            return Err(DecodeError::UnexpectedEof {
                wanted: 12,
                remaining: bytes.len(),
            });
        }
        let word = |i: usize| {
            let mut a = [0u8; 4];
            a.copy_from_slice(&bytes[i..i + 4]);
            u32::from_be_bytes(a)
        };
        Ok(Self {
            file_id: word(0),
            line: word(4),
            column: word(8),
        })
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file_id, self.line, self.column)
    }
}

/// Bit set on a packed target code when the reference is a definition.
pub const DEFINITION_BIT: u16 = 0x1000;

/// One reference to a target: a location plus a packed
/// `(cursor kind, is_definition)` code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetRef {
    pub location: Location,
    pub value: u16,
}

impl TargetRef {
    pub fn new(location: Location, kind: u16, is_definition: bool) -> Self {
        Self {
            location,
            value: kind | if is_definition { DEFINITION_BIT } else { 0 },
        }
    }

    pub fn kind(&self) -> u16 {
        self.value & !DEFINITION_BIT
    }

    pub fn is_definition(&self) -> bool {
        self.value & DEFINITION_BIT != 0
    }

    pub fn encode_into<S: Sink>(&self, s: &mut Serializer<'_, S>) {
        self.location.encode_into(s);
        s.write_u16(self.value);
    }

    pub fn decode_from(d: &mut Deserializer<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            location: Location::decode_from(d)?,
            value: d.read_u16()?,
        })
    }
}

/// The rich record stored for the symbol at one location.
///
/// `enum_value` doubles as the definition flag for every cursor kind that
/// is not an enum constant; `is_definition` reads it that way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CursorInfo {
    pub symbol_length: u16,
    pub symbol_name: String,
    pub kind: u16,
    pub type_kind: i32,
    pub enum_value: i64,
    pub start_line: i32,
    pub start_column: i32,
    pub end_line: i32,
    pub end_column: i32,
}

impl CursorInfo {
    pub fn is_empty(&self) -> bool {
        self.symbol_length == 0
    }

    pub fn is_definition(&self) -> bool {
        self.enum_value != 0
    }

    pub fn encode(&self) -> Blob {
        let mut out = Blob::new();
        let mut s = Serializer::new(&mut out);
        s.write_u16(self.symbol_length)
            .write_str(&self.symbol_name)
            .write_u16(self.kind)
            .write_i32(self.type_kind)
            .write_i64(self.enum_value)
            .write_i32(self.start_line)
            .write_i32(self.start_column)
            .write_i32(self.end_line)
            .write_i32(self.end_column);
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut d = Deserializer::new(bytes);
        let info = Self {
            symbol_length: d.read_u16()?,
            symbol_name: d.read_string()?,
            kind: d.read_u16()?,
            type_kind: d.read_i32()?,
            enum_value: d.read_i64()?,
            start_line: d.read_i32()?,
            start_column: d.read_i32()?,
            end_line: d.read_i32()?,
            end_column: d.read_i32()?,
        };
        d.finish()?;
        Ok(info)
    }
}

/// One lexed token of a translation unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Token {
    pub location: Location,
    pub offset: u32,
    pub length: u32,
    pub spelling: String,
}

impl Token {
    pub fn encode(&self) -> Blob {
        let mut out = Blob::new();
        let mut s = Serializer::new(&mut out);
        self.location.encode_into(&mut s);
        s.write_u32(self.offset)
            .write_u32(self.length)
            .write_str(&self.spelling);
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut d = Deserializer::new(bytes);
        let token = Self {
            location: Location::decode_from(&mut d)?,
            offset: d.read_u32()?,
            length: d.read_u32()?,
            spelling: d.read_string()?,
        };
        d.finish()?;
        Ok(token)
    }
}

/// Serialize a set of locations: count followed by sorted elements.
pub fn encode_location_set(set: &BTreeSet<Location>) -> Blob {
    let mut out = Blob::new();
    let mut s = Serializer::new(&mut out);
    s.write_len(set.len());
    for loc in set {
        loc.encode_into(&mut s);
    }
    out
}

pub fn decode_location_set(bytes: &[u8]) -> Result<BTreeSet<Location>, DecodeError> {
    let mut d = Deserializer::new(bytes);
    let count = d.read_u64()?;
    let mut set = BTreeSet::new();
    for _ in 0..count {
        set.insert(Location::decode_from(&mut d)?);
    }
    d.finish()?;
    Ok(set)
}

pub fn encode_target_set(set: &BTreeSet<TargetRef>) -> Blob {
    let mut out = Blob::new();
    let mut s = Serializer::new(&mut out);
    s.write_len(set.len());
    for t in set {
        t.encode_into(&mut s);
    }
    out
}

pub fn decode_target_set(bytes: &[u8]) -> Result<BTreeSet<TargetRef>, DecodeError> {
    let mut d = Deserializer::new(bytes);
    let count = d.read_u64()?;
    let mut set = BTreeSet::new();
    for _ in 0..count {
        set.insert(TargetRef::decode_from(&mut d)?);
    }
    d.finish()?;
    Ok(set)
}

/// Everything one indexed translation unit contributes, one map per table.
///
/// The producer is responsible for deduplication within a bundle; the
/// store replaces, it never merges.
#[derive(Debug, Clone, Default)]
pub struct UnitBundle {
    pub symbol_names: BTreeMap<String, BTreeSet<Location>>,
    pub targets: BTreeMap<String, BTreeSet<TargetRef>>,
    pub usrs: BTreeMap<String, BTreeSet<Location>>,
    pub symbols: BTreeMap<Location, CursorInfo>,
    pub tokens: BTreeMap<u32, Token>,
}

impl UnitBundle {
    pub fn is_empty(&self) -> bool {
        self.symbol_names.is_empty()
            && self.targets.is_empty()
            && self.usrs.is_empty()
            && self.symbols.is_empty()
            && self.tokens.is_empty()
    }

    /// Total number of rows this bundle expands to.
    pub fn row_count(&self) -> usize {
        self.symbol_names.len()
            + self.targets.len()
            + self.usrs.len()
            + self.symbols.len()
            + self.tokens.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(f: u32, l: u32, c: u32) -> Location {
        Location::new(f, l, c)
    }

    #[test]
    fn location_value_roundtrip() {
        let mut out = Blob::new();
        let mut s = Serializer::new(&mut out);
        loc(7, 10, 3).encode_into(&mut s);
        assert_eq!(out.size(), 12);
        let mut d = Deserializer::new(out.data());
        assert_eq!(Location::decode_from(&mut d).unwrap(), loc(7, 10, 3));
    }

    #[test]
    fn location_key_order_matches_numeric_order() {
        let a = loc(1, 200, 1).encode_key();
        let b = loc(2, 1, 1).encode_key();
        let c = loc(2, 1, 2).encode_key();
        assert!(a.data() < b.data());
        assert!(b.data() < c.data());
        assert_eq!(Location::decode_key(b.data()).unwrap(), loc(2, 1, 1));
    }

    #[test]
    fn location_key_wrong_width_rejected() {
        assert!(Location::decode_key(&[0; 11]).is_err());
        assert!(Location::decode_key(&[0; 13]).is_err());
    }

    #[test]
    fn target_ref_packs_definition_bit() {
        let t = TargetRef::new(loc(1, 2, 3), 0x42, true);
        assert_eq!(t.kind(), 0x42);
        assert!(t.is_definition());
        let u = TargetRef::new(loc(1, 2, 3), 0x42, false);
        assert_eq!(u.kind(), 0x42);
        assert!(!u.is_definition());
        assert_ne!(t.value, u.value);
    }

    #[test]
    fn cursor_info_roundtrip() {
        let info = CursorInfo {
            symbol_length: 3,
            symbol_name: "Foobar::Barfoo::foo".to_string(),
            kind: 9,
            type_kind: 17,
            enum_value: -5,
            start_line: 10,
            start_column: 4,
            end_line: 10,
            end_column: 7,
        };
        assert_eq!(CursorInfo::decode(info.encode().data()).unwrap(), info);
    }

    #[test]
    fn cursor_info_truncated_fails() {
        let info = CursorInfo::default();
        let bytes = info.encode();
        assert!(CursorInfo::decode(&bytes.data()[..bytes.size() - 1]).is_err());
    }

    #[test]
    fn token_roundtrip() {
        let token = Token {
            location: loc(4, 8, 15),
            offset: 1600,
            length: 3,
            spelling: "foo".to_string(),
        };
        assert_eq!(Token::decode(token.encode().data()).unwrap(), token);
    }

    #[test]
    fn location_set_roundtrip_sorted() {
        let set: BTreeSet<Location> = [loc(2, 1, 1), loc(1, 9, 9), loc(1, 2, 3)].into();
        let bytes = encode_location_set(&set);
        assert_eq!(decode_location_set(bytes.data()).unwrap(), set);
        // wire order is ascending: first element after the count is (1,2,3)
        let mut d = Deserializer::new(bytes.data());
        d.read_u64().unwrap();
        assert_eq!(Location::decode_from(&mut d).unwrap(), loc(1, 2, 3));
    }

    #[test]
    fn empty_set_roundtrip() {
        let set = BTreeSet::new();
        assert_eq!(
            decode_location_set(encode_location_set(&set).data()).unwrap(),
            set
        );
    }

    #[test]
    fn target_set_roundtrip() {
        let set: BTreeSet<TargetRef> = [
            TargetRef::new(loc(1, 2, 3), 8, false),
            TargetRef::new(loc(1, 2, 3), 8, true),
            TargetRef::new(loc(9, 1, 1), 4, false),
        ]
        .into();
        assert_eq!(
            decode_target_set(encode_target_set(&set).data()).unwrap(),
            set
        );
    }
}
