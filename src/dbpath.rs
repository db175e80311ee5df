use crate::error::{Result, StoreError};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

pub const DB_FILE: &str = "index.redb";
pub const META_FILE: &str = "meta.toml";
pub const LOCK_FILE: &str = "LOCK";

fn is_name_only(s: &str) -> bool {
    !s.contains('/') && !s.contains('\\')
}

pub fn default_db_base_dir() -> Result<PathBuf> {
    let proj = ProjectDirs::from("dev", "symdex", "symdex").ok_or_else(|| {
        StoreError::InvalidStoreDir {
            dir: PathBuf::new(),
            reason: "unable to determine platform data directory".to_string(),
        }
    })?;
    Ok(proj.data_dir().to_path_buf())
}

/// A bare name resolves under the platform data directory; anything with a
/// path separator is used as-is.
pub fn resolve_db_dir(db: &str) -> Result<PathBuf> {
    if is_name_only(db) {
        Ok(default_db_base_dir()?.join(db))
    } else {
        Ok(PathBuf::from(db))
    }
}

/// Return expected file paths inside the store directory.
pub fn expected_paths(db_dir: &Path) -> (PathBuf, PathBuf, PathBuf) {
    (
        db_dir.join(DB_FILE),
        db_dir.join(META_FILE),
        db_dir.join(LOCK_FILE),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbDirState {
    /// Directory exists but is empty, or it was created just now.
    Empty,
    /// Directory contains meta.toml + index.redb.
    LooksValid,
}

/// Ensure the store directory exists and has the expected files.
/// A missing or empty directory is treated as a new store and allowed to
/// initialize; an existing non-empty directory without the expected files
/// is rejected.
pub fn ensure_db_dir_is_valid_or_empty(db_dir: &Path) -> Result<DbDirState> {
    if db_dir.exists() {
        if !db_dir.is_dir() {
            return Err(StoreError::InvalidStoreDir {
                dir: db_dir.to_path_buf(),
                reason: "path exists but is not a directory".to_string(),
            });
        }

        let mut has_entries = false;
        for entry in fs::read_dir(db_dir)? {
            entry?;
            has_entries = true;
        }
        if !has_entries {
            return Ok(DbDirState::Empty);
        }

        let (db_file, meta_file, _lock_file) = expected_paths(db_dir);
        if db_file.is_file() && meta_file.is_file() {
            Ok(DbDirState::LooksValid)
        } else {
            Err(StoreError::InvalidStoreDir {
                dir: db_dir.to_path_buf(),
                reason: format!("directory is non-empty but missing {META_FILE} and {DB_FILE}"),
            })
        }
    } else {
        fs::create_dir_all(db_dir)?;
        Ok(DbDirState::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn name_vs_path_resolution() {
        assert!(is_name_only("default"));
        assert!(!is_name_only("some/dir"));
        assert_eq!(
            resolve_db_dir("/tmp/x/store").unwrap(),
            PathBuf::from("/tmp/x/store")
        );
    }

    #[test]
    fn missing_dir_is_created_empty() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("fresh");
        assert_eq!(
            ensure_db_dir_is_valid_or_empty(&dir).unwrap(),
            DbDirState::Empty
        );
        assert!(dir.is_dir());
    }

    #[test]
    fn foreign_dir_rejected() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("stray.txt"), b"x").unwrap();
        assert!(matches!(
            ensure_db_dir_is_valid_or_empty(tmp.path()),
            Err(StoreError::InvalidStoreDir { .. })
        ));
    }
}
