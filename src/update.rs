use crate::db::IndexDb;
use crate::error::Result;
use crate::schema::{self, Table};
use crate::types::{encode_location_set, encode_target_set, UnitBundle};
use redb::{ReadableTable, WriteTransaction};

impl IndexDb {
    /// Remove every row in every table owned by `file_id`.
    ///
    /// Idempotent: deleting a unit that has no rows is a successful no-op.
    ///
    /// # Panics
    ///
    /// `file_id` 0 is reserved; passing it is a caller bug.
    pub fn delete_unit(&self, file_id: u32) -> Result<()> {
        assert_ne!(file_id, 0, "file_id 0 is reserved");

        self.write_retrying(|tx| {
            let mut removed = 0;
            for table in Table::ALL {
                removed += delete_unit_rows(tx, table, file_id)?;
            }
            tracing::debug!(file_id, removed, "deleted unit");
            Ok(())
        })
    }

    /// Atomically replace all rows owned by `file_id` with the rows derived
    /// from `bundle`.
    ///
    /// One write transaction deletes the unit's existing range in every
    /// table, then inserts each bundle map in ascending key order. A
    /// concurrent reader observes either the complete prior state or the
    /// complete new state, never a mix.
    ///
    /// # Panics
    ///
    /// `file_id` 0 is reserved; passing it is a caller bug.
    pub fn update_unit(&self, file_id: u32, bundle: &UnitBundle) -> Result<()> {
        assert_ne!(file_id, 0, "file_id 0 is reserved");

        self.write_retrying(|tx| {
            let mut removed = 0;
            for table in Table::ALL {
                removed += delete_unit_rows(tx, table, file_id)?;
            }
            let inserted = insert_bundle(tx, file_id, bundle)?;
            tracing::debug!(file_id, removed, inserted, "updated unit");
            Ok(())
        })
    }
}

/// Delete the contiguous `file_id` range from one table's primary index
/// and the matching secondary entries. Returns the number of rows removed.
fn delete_unit_rows(tx: &WriteTransaction, table: Table, file_id: u32) -> Result<usize> {
    let mut primary = tx.open_table(table.primary())?;
    let mut secondary = tx.open_multimap_table(table.secondary())?;
    let prefix = file_id.to_be_bytes();

    // Collect the unit's keys first; the range cursor borrows the table
    // and is released before the removals start.
    let mut keys: Vec<Vec<u8>> = Vec::new();
    for item in primary.range(prefix.as_slice()..)? {
        let (k, _) = item?;
        let key = k.value();
        if !key.starts_with(&prefix) {
            break;
        }
        keys.push(key.to_vec());
    }

    for key in &keys {
        primary.remove(key.as_slice())?;
        secondary.remove(&key[schema::FILE_ID_PREFIX_LEN..], file_id)?;
    }

    Ok(keys.len())
}

/// Insert every row of the bundle, maintaining the secondary index next to
/// each primary write. Must run inside the caller's transaction.
fn insert_bundle(tx: &WriteTransaction, file_id: u32, bundle: &UnitBundle) -> Result<usize> {
    let mut inserted = 0;

    {
        let mut primary = tx.open_table(schema::SYMBOL_NAMES_PRIMARY)?;
        let mut secondary = tx.open_multimap_table(schema::SYMBOL_NAMES_SECONDARY)?;
        for (name, locations) in &bundle.symbol_names {
            let key = schema::primary_key(file_id, name.as_bytes());
            let value = encode_location_set(locations);
            primary.insert(key.data(), value.data())?;
            secondary.insert(name.as_bytes(), file_id)?;
            inserted += 1;
        }
    }

    {
        let mut primary = tx.open_table(schema::TARGETS_PRIMARY)?;
        let mut secondary = tx.open_multimap_table(schema::TARGETS_SECONDARY)?;
        for (usr, refs) in &bundle.targets {
            let key = schema::primary_key(file_id, usr.as_bytes());
            let value = encode_target_set(refs);
            primary.insert(key.data(), value.data())?;
            secondary.insert(usr.as_bytes(), file_id)?;
            inserted += 1;
        }
    }

    {
        let mut primary = tx.open_table(schema::USRS_PRIMARY)?;
        let mut secondary = tx.open_multimap_table(schema::USRS_SECONDARY)?;
        for (usr, locations) in &bundle.usrs {
            let key = schema::primary_key(file_id, usr.as_bytes());
            let value = encode_location_set(locations);
            primary.insert(key.data(), value.data())?;
            secondary.insert(usr.as_bytes(), file_id)?;
            inserted += 1;
        }
    }

    {
        let mut primary = tx.open_table(schema::SYMBOLS_PRIMARY)?;
        let mut secondary = tx.open_multimap_table(schema::SYMBOLS_SECONDARY)?;
        for (location, info) in &bundle.symbols {
            let logical = location.encode_key();
            let key = schema::primary_key(file_id, logical.data());
            let value = info.encode();
            primary.insert(key.data(), value.data())?;
            secondary.insert(logical.data(), file_id)?;
            inserted += 1;
        }
    }

    {
        let mut primary = tx.open_table(schema::TOKENS_PRIMARY)?;
        let mut secondary = tx.open_multimap_table(schema::TOKENS_SECONDARY)?;
        for (token_id, token) in &bundle.tokens {
            let logical = token_id.to_be_bytes();
            let key = schema::primary_key(file_id, &logical);
            let value = token.encode();
            primary.insert(key.data(), value.data())?;
            secondary.insert(logical.as_slice(), file_id)?;
            inserted += 1;
        }
    }

    Ok(inserted)
}
