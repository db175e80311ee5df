//! Per-translation-unit symbol index.
//!
//! A transactional, on-disk key/value store mapping the identifiers and
//! cross-reference data of one C/C++ compilation unit to source
//! locations. Units are replaced atomically ([`IndexDb::update_unit`]) or
//! dropped ([`IndexDb::delete_unit`]); lookups are exact-key or
//! key-prefix scans, either scoped to one unit or across all of them.

pub mod blob;
pub mod codec;
pub mod db;
pub mod dbpath;
pub mod error;
pub mod logging;
pub mod query;
pub mod schema;
pub mod status;
pub mod types;
mod update;

pub use blob::Blob;
pub use codec::{DecodeError, Deserializer, Serializer};
pub use db::IndexDb;
pub use error::{Result, StoreError};
pub use query::QueryResult;
pub use schema::Table;
pub use types::{CursorInfo, Location, TargetRef, Token, UnitBundle};
