use crate::codec::DecodeError;
use crate::db::IndexDb;
use crate::error::{Result, StoreError};
use crate::schema::{self, Table};
use crate::types::{
    decode_location_set, decode_target_set, CursorInfo, Location, TargetRef, Token,
};
use redb::{ReadableMultimapTable, ReadableTable};
use std::collections::BTreeSet;

/// Callback verdict: keep scanning or end the scan early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryResult {
    Stop,
    Continue,
}

impl IndexDb {
    /// Scan one unit's rows in `table`, in ascending primary-key order.
    ///
    /// The scan starts at `file_id ‖ key` and ends at the first row that is
    /// not an exact / prefix match (per `is_prefix`), at the end of the
    /// index, or when the callback returns [`QueryResult::Stop`]. A start
    /// key past the end of the index is a successful empty scan.
    ///
    /// The callback receives `(file_id, logical_key, value)` as byte views
    /// valid only for the duration of the call.
    ///
    /// # Panics
    ///
    /// `file_id` 0 is reserved; passing it is a caller bug.
    pub fn query_unit(
        &self,
        table: Table,
        file_id: u32,
        key: &[u8],
        is_prefix: bool,
        mut cb: impl FnMut(u32, &[u8], &[u8]) -> QueryResult,
    ) -> Result<()> {
        assert_ne!(file_id, 0, "file_id 0 is reserved");

        let tx = self.db.begin_read()?;
        let primary = tx.open_table(table.primary())?;
        let start = schema::primary_key(file_id, key);

        for item in primary.range(start.data()..)? {
            let (k, v) = item?;
            let row_key = k.value();
            let Some((row_file, logical)) = schema::split_primary_key(row_key) else {
                return Err(StoreError::Corrupt {
                    table: table.name(),
                    message: format!(
                        "primary key shorter than the file id prefix: {}",
                        hex::encode(row_key)
                    ),
                });
            };
            if row_file != file_id {
                break;
            }
            let matches = if is_prefix {
                logical.starts_with(key)
            } else {
                logical == key
            };
            if !matches {
                break;
            }
            if cb(row_file, logical, v.value()) == QueryResult::Stop {
                break;
            }
        }
        Ok(())
    }

    /// Scan `table` across all units via the secondary index.
    ///
    /// Matching logical keys are visited in ascending byte order; rows
    /// sharing a logical key are visited in the secondary index's
    /// duplicate order (ascending `file_id`), each resolved to its primary
    /// row for the value. Termination rules match [`IndexDb::query_unit`].
    pub fn query(
        &self,
        table: Table,
        key: &[u8],
        is_prefix: bool,
        mut cb: impl FnMut(u32, &[u8], &[u8]) -> QueryResult,
    ) -> Result<()> {
        let tx = self.db.begin_read()?;
        let primary = tx.open_table(table.primary())?;
        let secondary = tx.open_multimap_table(table.secondary())?;

        'scan: for item in secondary.range(key..)? {
            let (k, owners) = item?;
            let logical = k.value();
            let matches = if is_prefix {
                logical.starts_with(key)
            } else {
                logical == key
            };
            if !matches {
                break;
            }
            for owner in owners {
                let file_id = owner?.value();
                let primary_key = schema::primary_key(file_id, logical);
                let Some(v) = primary.get(primary_key.data())? else {
                    return Err(StoreError::Corrupt {
                        table: table.name(),
                        message: format!(
                            "secondary entry without a primary row: unit {} key {}",
                            file_id,
                            hex::encode(logical)
                        ),
                    });
                };
                if cb(file_id, logical, v.value()) == QueryResult::Stop {
                    break 'scan;
                }
            }
        }
        Ok(())
    }

    /// Typed scan over `symbol_names`: decoded name and location set.
    /// `scope` limits the scan to one unit; `None` goes through the
    /// secondary index across all units.
    pub fn query_symbol_names(
        &self,
        scope: Option<u32>,
        key: &str,
        is_prefix: bool,
        mut cb: impl FnMut(u32, &str, &BTreeSet<Location>) -> QueryResult,
    ) -> Result<()> {
        let mut failure = None;
        let scan = |file_id: u32, logical: &[u8], value: &[u8]| {
            let row = std::str::from_utf8(logical)
                .map_err(|_| DecodeError::InvalidUtf8)
                .and_then(|name| Ok((name, decode_location_set(value)?)));
            match row {
                Ok((name, set)) => cb(file_id, name, &set),
                Err(e) => {
                    failure = Some(StoreError::Decode {
                        table: Table::SymbolNames.name(),
                        key: logical.to_vec(),
                        source: e,
                    });
                    QueryResult::Stop
                }
            }
        };
        match scope {
            Some(file_id) => {
                self.query_unit(Table::SymbolNames, file_id, key.as_bytes(), is_prefix, scan)?
            }
            None => self.query(Table::SymbolNames, key.as_bytes(), is_prefix, scan)?,
        }
        failure.map_or(Ok(()), Err)
    }

    /// Typed scan over `targets`: decoded USR and tagged reference set.
    pub fn query_targets(
        &self,
        scope: Option<u32>,
        key: &str,
        is_prefix: bool,
        mut cb: impl FnMut(u32, &str, &BTreeSet<TargetRef>) -> QueryResult,
    ) -> Result<()> {
        let mut failure = None;
        let scan = |file_id: u32, logical: &[u8], value: &[u8]| {
            let row = std::str::from_utf8(logical)
                .map_err(|_| DecodeError::InvalidUtf8)
                .and_then(|usr| Ok((usr, decode_target_set(value)?)));
            match row {
                Ok((usr, refs)) => cb(file_id, usr, &refs),
                Err(e) => {
                    failure = Some(StoreError::Decode {
                        table: Table::Targets.name(),
                        key: logical.to_vec(),
                        source: e,
                    });
                    QueryResult::Stop
                }
            }
        };
        match scope {
            Some(file_id) => {
                self.query_unit(Table::Targets, file_id, key.as_bytes(), is_prefix, scan)?
            }
            None => self.query(Table::Targets, key.as_bytes(), is_prefix, scan)?,
        }
        failure.map_or(Ok(()), Err)
    }

    /// Typed scan over `usrs`: decoded USR and declaring location set.
    pub fn query_usrs(
        &self,
        scope: Option<u32>,
        key: &str,
        is_prefix: bool,
        mut cb: impl FnMut(u32, &str, &BTreeSet<Location>) -> QueryResult,
    ) -> Result<()> {
        let mut failure = None;
        let scan = |file_id: u32, logical: &[u8], value: &[u8]| {
            let row = std::str::from_utf8(logical)
                .map_err(|_| DecodeError::InvalidUtf8)
                .and_then(|usr| Ok((usr, decode_location_set(value)?)));
            match row {
                Ok((usr, set)) => cb(file_id, usr, &set),
                Err(e) => {
                    failure = Some(StoreError::Decode {
                        table: Table::Usrs.name(),
                        key: logical.to_vec(),
                        source: e,
                    });
                    QueryResult::Stop
                }
            }
        };
        match scope {
            Some(file_id) => {
                self.query_unit(Table::Usrs, file_id, key.as_bytes(), is_prefix, scan)?
            }
            None => self.query(Table::Usrs, key.as_bytes(), is_prefix, scan)?,
        }
        failure.map_or(Ok(()), Err)
    }

    /// Full typed scan over `symbols`, optionally scoped to one unit.
    pub fn query_symbols(
        &self,
        scope: Option<u32>,
        mut cb: impl FnMut(u32, Location, &CursorInfo) -> QueryResult,
    ) -> Result<()> {
        let mut failure = None;
        let scan = |file_id: u32, logical: &[u8], value: &[u8]| {
            let row = Location::decode_key(logical)
                .and_then(|loc| Ok((loc, CursorInfo::decode(value)?)));
            match row {
                Ok((loc, info)) => cb(file_id, loc, &info),
                Err(e) => {
                    failure = Some(StoreError::Decode {
                        table: Table::Symbols.name(),
                        key: logical.to_vec(),
                        source: e,
                    });
                    QueryResult::Stop
                }
            }
        };
        match scope {
            Some(file_id) => self.query_unit(Table::Symbols, file_id, b"", true, scan)?,
            None => self.query(Table::Symbols, b"", true, scan)?,
        }
        failure.map_or(Ok(()), Err)
    }

    /// Full typed scan over `tokens`, optionally scoped to one unit.
    pub fn query_tokens(
        &self,
        scope: Option<u32>,
        mut cb: impl FnMut(u32, u32, &Token) -> QueryResult,
    ) -> Result<()> {
        let mut failure = None;
        let scan = |file_id: u32, logical: &[u8], value: &[u8]| {
            let row = decode_token_id(logical).and_then(|id| Ok((id, Token::decode(value)?)));
            match row {
                Ok((id, token)) => cb(file_id, id, &token),
                Err(e) => {
                    failure = Some(StoreError::Decode {
                        table: Table::Tokens.name(),
                        key: logical.to_vec(),
                        source: e,
                    });
                    QueryResult::Stop
                }
            }
        };
        match scope {
            Some(file_id) => self.query_unit(Table::Tokens, file_id, b"", true, scan)?,
            None => self.query(Table::Tokens, b"", true, scan)?,
        }
        failure.map_or(Ok(()), Err)
    }

    /// Exact lookup of the `CursorInfo` stored at `location` in one unit.
    ///
    /// # Panics
    ///
    /// `file_id` 0 is reserved; passing it is a caller bug.
    pub fn symbol_at(&self, file_id: u32, location: Location) -> Result<Option<CursorInfo>> {
        assert_ne!(file_id, 0, "file_id 0 is reserved");

        let tx = self.db.begin_read()?;
        let primary = tx.open_table(Table::Symbols.primary())?;
        let logical = location.encode_key();
        let key = schema::primary_key(file_id, logical.data());
        match primary.get(key.data())? {
            Some(v) => CursorInfo::decode(v.value())
                .map(Some)
                .map_err(|e| StoreError::Decode {
                    table: Table::Symbols.name(),
                    key: logical.into_vec(),
                    source: e,
                }),
            None => Ok(None),
        }
    }

    /// Exact lookup of one token by id within one unit.
    ///
    /// # Panics
    ///
    /// `file_id` 0 is reserved; passing it is a caller bug.
    pub fn token(&self, file_id: u32, token_id: u32) -> Result<Option<Token>> {
        assert_ne!(file_id, 0, "file_id 0 is reserved");

        let tx = self.db.begin_read()?;
        let primary = tx.open_table(Table::Tokens.primary())?;
        let logical = token_id.to_be_bytes();
        let key = schema::primary_key(file_id, &logical);
        match primary.get(key.data())? {
            Some(v) => Token::decode(v.value())
                .map(Some)
                .map_err(|e| StoreError::Decode {
                    table: Table::Tokens.name(),
                    key: logical.to_vec(),
                    source: e,
                }),
            None => Ok(None),
        }
    }
}

fn decode_token_id(logical: &[u8]) -> std::result::Result<u32, DecodeError> {
    if logical.len() != 4 {
        return Err(DecodeError::UnexpectedEof {
            wanted: 4,
            remaining: logical.len(),
        });
    }
    let mut a = [0u8; 4];
    a.copy_from_slice(logical);
    Ok(u32::from_be_bytes(a))
}
