//! Ledger directory management.
//!
//! A file-backed ledger lives in its own directory:
//!
//! ```text
//! <path>/
//! ├─ LOCK          # advisory lock, held while the ledger is open
//! └─ ledger.log    # CRC-framed transaction log
//! ```
//!
//! The LOCK file ensures only one process appends to the log at a time.

use crate::error::{CoreError, CoreResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const LEDGER_FILE: &str = "ledger.log";

/// Holds an exclusive lock on a ledger directory.
///
/// The lock is released when the value is dropped.
#[derive(Debug)]
pub struct LedgerDir {
    path: PathBuf,
    _lock_file: File,
}

impl LedgerDir {
    /// Opens or creates a ledger directory and takes its lock.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the directory doesn't exist and `create_if_missing` is false
    /// - `path` is not a directory
    /// - another process holds the lock (`LedgerLocked`)
    /// - I/O errors occur
    pub fn open(path: &Path, create_if_missing: bool) -> CoreResult<Self> {
        if !path.exists() {
            if create_if_missing {
                fs::create_dir_all(path)?;
            } else {
                return Err(CoreError::not_found(format!(
                    "ledger directory {}",
                    path.display()
                )));
            }
        }

        if !path.is_dir() {
            return Err(CoreError::invalid_payload(format!(
                "{} is not a directory",
                path.display()
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(CoreError::LedgerLocked);
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the transaction log.
    #[must_use]
    pub fn ledger_path(&self) -> PathBuf {
        self.path.join(LEDGER_FILE)
    }

    /// Whether the transaction log has not been created yet.
    #[must_use]
    pub fn is_new(&self) -> bool {
        !self.ledger_path().exists()
    }

    /// Makes newly created directory entries durable.
    #[cfg(unix)]
    pub(crate) fn sync_directory(&self) -> CoreResult<()> {
        File::open(&self.path)?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    pub(crate) fn sync_directory(&self) -> CoreResult<()> {
        Ok(())
    }
}
