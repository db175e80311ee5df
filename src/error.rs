use crate::codec::DecodeError;
use std::io::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store is locked (in use?): {dir}")]
    Locked { dir: PathBuf },

    #[error("not a symbol index store: {dir}: {reason}")]
    InvalidStoreDir { dir: PathBuf, reason: String },

    #[error("engine error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("engine error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("engine error: {0}")]
    Table(#[from] redb::TableError),

    #[error("engine error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("engine error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("row in {table} failed to decode at key {}: {source}", hex::encode(.key))]
    Decode {
        table: &'static str,
        key: Vec<u8>,
        source: DecodeError,
    },

    #[error("index corruption in {table}: {message}")]
    Corrupt {
        table: &'static str,
        message: String,
    },
}

impl StoreError {
    /// Contention that is worth retrying: a racing second open of the
    /// engine file, or interrupted/blocked I/O underneath a transaction.
    /// Everything else is structural and must surface.
    pub fn is_transient(&self) -> bool {
        fn transient_io(e: &std::io::Error) -> bool {
            matches!(
                e.kind(),
                ErrorKind::WouldBlock | ErrorKind::Interrupted | ErrorKind::TimedOut
            )
        }
        match self {
            StoreError::Database(redb::DatabaseError::DatabaseAlreadyOpen) => true,
            StoreError::Database(redb::DatabaseError::Storage(redb::StorageError::Io(e))) => {
                transient_io(e)
            }
            StoreError::Transaction(redb::TransactionError::Storage(redb::StorageError::Io(e))) => {
                transient_io(e)
            }
            StoreError::Commit(redb::CommitError::Storage(redb::StorageError::Io(e))) => {
                transient_io(e)
            }
            StoreError::Storage(redb::StorageError::Io(e)) => transient_io(e),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
