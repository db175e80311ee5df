use crate::dbpath::{self, DbDirState, DB_FILE, LOCK_FILE, META_FILE};
use crate::error::{Result, StoreError};
use crate::schema::Table;
use fs2::FileExt;
use redb::Database;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound on whole-transaction retries for transient engine errors.
const MAX_WRITE_ATTEMPTS: u32 = 8;

/// Handle to one on-disk symbol index store.
///
/// The store is a directory holding `meta.toml`, `index.redb` and `LOCK`.
/// The exclusive lock is held for the lifetime of the handle: one writing
/// process at a time, while the engine itself multiplexes readers and the
/// single writer within the process (readers see a consistent snapshot for
/// the duration of a scan).
pub struct IndexDb {
    pub(crate) db: Database,
    dir: PathBuf,
    // Keep the lock file open for the lifetime of IndexDb, so the lock is held.
    _lock_file: File,
}

impl IndexDb {
    /// Open a store directory:
    /// - validates the directory
    /// - initializes if empty (meta + index.redb)
    /// - acquires the exclusive lock
    /// - opens the engine and ensures all tables exist
    pub fn open(db_dir: &Path) -> Result<Self> {
        let state = dbpath::ensure_db_dir_is_valid_or_empty(db_dir)?;

        // Acquire lock first (prevents two processes initializing concurrently).
        let lock_file = open_and_lock(db_dir)?;

        if state == DbDirState::Empty {
            init_db_dir(db_dir)?;
            tracing::info!(dir = %db_dir.display(), "created symbol index store");
        } else {
            tracing::debug!(dir = %db_dir.display(), "opening symbol index store");
        }

        // Require both files now.
        let db_file_path = db_dir.join(DB_FILE);
        let meta_path = db_dir.join(META_FILE);
        if !db_file_path.is_file() || !meta_path.is_file() {
            return Err(StoreError::InvalidStoreDir {
                dir: db_dir.to_path_buf(),
                reason: format!("missing expected files ({META_FILE} and {DB_FILE})"),
            });
        }

        let db = Database::create(&db_file_path)?;

        let handle = IndexDb {
            db,
            dir: db_dir.to_path_buf(),
            _lock_file: lock_file,
        };

        handle.ensure_schema()?;

        Ok(handle)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Open every primary and secondary table once so the schema exists
    /// before the first reader arrives.
    fn ensure_schema(&self) -> Result<()> {
        let tx = self.db.begin_write()?;
        {
            for table in Table::ALL {
                let _ = tx.open_table(table.primary())?;
                let _ = tx.open_multimap_table(table.secondary())?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Run `f` inside a write transaction, committing on success.
    ///
    /// Transient contention retries the whole transaction with exponential
    /// backoff up to `MAX_WRITE_ATTEMPTS`; an uncommitted transaction is
    /// rolled back when dropped, and rollback failures never propagate.
    pub(crate) fn write_retrying<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&redb::WriteTransaction) -> Result<()>,
    {
        let mut attempt = 0;
        loop {
            let result: Result<()> = (|| {
                let tx = self.db.begin_write()?;
                f(&tx)?;
                tx.commit()?;
                Ok(())
            })();

            match result {
                Ok(()) => return Ok(()),
                Err(e) if e.is_transient() && attempt + 1 < MAX_WRITE_ATTEMPTS => {
                    let delay = Duration::from_millis(1u64 << attempt.min(6));
                    tracing::warn!(error = %e, attempt, "transient engine error, retrying");
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn open_and_lock(db_dir: &Path) -> Result<File> {
    let lock_path = db_dir.join(LOCK_FILE);
    let f = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(&lock_path)?;

    // Exclusive lock: one writer process at a time.
    f.try_lock_exclusive().map_err(|_| StoreError::Locked {
        dir: db_dir.to_path_buf(),
    })?;

    Ok(f)
}

fn init_db_dir(db_dir: &Path) -> Result<()> {
    let meta_path = db_dir.join(META_FILE);
    if !meta_path.exists() {
        write_meta(&meta_path)?;
    }

    let db_file_path = db_dir.join(DB_FILE);
    if !db_file_path.exists() {
        File::create(&db_file_path)?;
    }

    Ok(())
}

fn write_meta(meta_path: &Path) -> Result<()> {
    let mut f = File::create(meta_path)?;

    let contents = r#"# symdex store metadata
format = 1
app = "symdex"
db_kind = "redb"
file_id_encoding = "be32"
length_width = "u64le"
"#;

    f.write_all(contents.as_bytes())?;
    f.sync_all()?;

    Ok(())
}
