use crate::blob::Blob;
use redb::{MultimapTableDefinition, TableDefinition};

/// Width of the owning-unit prefix on every primary key.
pub const FILE_ID_PREFIX_LEN: usize = 4;

/// Primary key layout: 4 big-endian `file_id` bytes followed by the raw
/// logical key. Big-endian keeps byte-wise order equal to numeric order,
/// so all rows of one unit form a contiguous range.
pub fn primary_key(file_id: u32, logical_key: &[u8]) -> Blob {
    let mut key = Blob::with_capacity(FILE_ID_PREFIX_LEN + logical_key.len());
    key.append(&file_id.to_be_bytes()).append(logical_key);
    key
}

/// Split a primary key back into `(file_id, logical_key)`.
pub fn split_primary_key(key: &[u8]) -> Option<(u32, &[u8])> {
    if key.len() < FILE_ID_PREFIX_LEN {
        return None;
    }
    let mut prefix = [0u8; FILE_ID_PREFIX_LEN];
    prefix.copy_from_slice(&key[..FILE_ID_PREFIX_LEN]);
    Some((u32::from_be_bytes(prefix), &key[FILE_ID_PREFIX_LEN..]))
}

// Primary tables: FileId-prefixed key (4 big-endian bytes + logical key)
// mapped to the serialized value.
pub const SYMBOL_NAMES_PRIMARY: TableDefinition<&[u8], &[u8]> =
    TableDefinition::new("symbol_names.primary");
pub const TARGETS_PRIMARY: TableDefinition<&[u8], &[u8]> = TableDefinition::new("targets.primary");
pub const USRS_PRIMARY: TableDefinition<&[u8], &[u8]> = TableDefinition::new("usrs.primary");
pub const SYMBOLS_PRIMARY: TableDefinition<&[u8], &[u8]> = TableDefinition::new("symbols.primary");
pub const TOKENS_PRIMARY: TableDefinition<&[u8], &[u8]> = TableDefinition::new("tokens.primary");

// Secondary tables: logical key alone, duplicates allowed and sorted by
// owning FileId. Exactly one secondary entry exists per primary row.
pub const SYMBOL_NAMES_SECONDARY: MultimapTableDefinition<&[u8], u32> =
    MultimapTableDefinition::new("symbol_names.secondary");
pub const TARGETS_SECONDARY: MultimapTableDefinition<&[u8], u32> =
    MultimapTableDefinition::new("targets.secondary");
pub const USRS_SECONDARY: MultimapTableDefinition<&[u8], u32> =
    MultimapTableDefinition::new("usrs.secondary");
pub const SYMBOLS_SECONDARY: MultimapTableDefinition<&[u8], u32> =
    MultimapTableDefinition::new("symbols.secondary");
pub const TOKENS_SECONDARY: MultimapTableDefinition<&[u8], u32> =
    MultimapTableDefinition::new("tokens.secondary");

/// The closed set of logical tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Table {
    SymbolNames,
    Targets,
    Usrs,
    Symbols,
    Tokens,
}

impl Table {
    /// Open/close and full-scan order.
    pub const ALL: [Table; 5] = [
        Table::SymbolNames,
        Table::Targets,
        Table::Usrs,
        Table::Symbols,
        Table::Tokens,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Table::SymbolNames => "symbol_names",
            Table::Targets => "targets",
            Table::Usrs => "usrs",
            Table::Symbols => "symbols",
            Table::Tokens => "tokens",
        }
    }

    pub fn primary(self) -> TableDefinition<'static, &'static [u8], &'static [u8]> {
        match self {
            Table::SymbolNames => SYMBOL_NAMES_PRIMARY,
            Table::Targets => TARGETS_PRIMARY,
            Table::Usrs => USRS_PRIMARY,
            Table::Symbols => SYMBOLS_PRIMARY,
            Table::Tokens => TOKENS_PRIMARY,
        }
    }

    pub fn secondary(self) -> MultimapTableDefinition<'static, &'static [u8], u32> {
        match self {
            Table::SymbolNames => SYMBOL_NAMES_SECONDARY,
            Table::Targets => TARGETS_SECONDARY,
            Table::Usrs => USRS_SECONDARY,
            Table::Symbols => SYMBOLS_SECONDARY,
            Table::Tokens => TOKENS_SECONDARY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_distinct() {
        let mut names: Vec<&str> = Table::ALL.iter().map(|t| t.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), Table::ALL.len());
    }

    #[test]
    fn primary_key_layout() {
        let key = primary_key(7, b"foo");
        assert_eq!(key.data(), &[0, 0, 0, 7, b'f', b'o', b'o']);
        assert_eq!(split_primary_key(key.data()), Some((7, &b"foo"[..])));
        assert_eq!(split_primary_key(&[0, 0, 7]), None);
    }

    #[test]
    fn unit_ranges_are_contiguous() {
        // all keys of unit 7 sort between unit 6 and unit 8 keys
        let low = primary_key(6, &[0xff; 8]);
        let a = primary_key(7, b"");
        let b = primary_key(7, &[0xff; 8]);
        let high = primary_key(8, b"");
        assert!(low.data() < a.data());
        assert!(a.data() < b.data());
        assert!(b.data() < high.data());
    }
}
