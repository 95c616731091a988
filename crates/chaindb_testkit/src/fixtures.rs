//! Test fixtures and database helpers.

use chaindb_core::{Config, Database, Owner};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Owner used by fixtures unless a test picks its own.
pub const TEST_OWNER: Owner = Owner::from_bytes([0x01; 32]);

/// A second identity for cross-owner tests.
pub const OTHER_OWNER: Owner = Owner::from_bytes([0x02; 32]);

/// A test database with automatic cleanup.
///
/// The owner's root is created up front.
pub struct TestDatabase {
    /// The database instance.
    pub db: Database,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: Option<TempDir>,
}

impl TestDatabase {
    /// Creates a new in-memory test database.
    pub fn memory() -> Self {
        let db = Database::open_in_memory(TEST_OWNER);
        db.ensure_root().expect("Failed to create root");
        Self { db, temp_dir: None }
    }

    /// Creates a new file-backed test database.
    pub fn file() -> Self {
        Self::file_with_config(Config::default())
    }

    /// Creates a new file-backed test database with custom configuration.
    pub fn file_with_config(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db = Database::open(&temp_dir.path().join("ledger"), TEST_OWNER, config)
            .expect("Failed to open file database");
        db.ensure_root().expect("Failed to create root");
        Self {
            db,
            temp_dir: Some(temp_dir),
        }
    }

    /// Ledger directory if file-backed, None if in-memory.
    pub fn path(&self) -> Option<PathBuf> {
        self.temp_dir.as_ref().map(|d| d.path().join("ledger"))
    }

    /// Closes the database and reopens the same ledger directory.
    ///
    /// # Panics
    ///
    /// Panics for in-memory databases.
    #[must_use]
    pub fn reopen(self) -> Self {
        let temp_dir = self.temp_dir.expect("reopen needs a file-backed database");
        let config = self.db.config().clone();
        drop(self.db);
        let db = Database::open(&temp_dir.path().join("ledger"), TEST_OWNER, config)
            .expect("Failed to reopen file database");
        Self {
            db,
            temp_dir: Some(temp_dir),
        }
    }
}

impl TestDatabase {
    /// Closes the database, handing back the directory that holds its
    /// ledger so tests can inspect or edit it while nothing has it open.
    ///
    /// # Panics
    ///
    /// Panics for in-memory databases.
    pub fn close(self) -> TempDir {
        drop(self.db);
        self.temp_dir.expect("close needs a file-backed database")
    }
}

impl std::ops::Deref for TestDatabase {
    type Target = Database;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

/// Runs a test with a temporary in-memory database.
pub fn with_temp_db<F, R>(f: F) -> R
where
    F: FnOnce(&Database) -> R,
{
    let test_db = TestDatabase::memory();
    f(&test_db.db)
}

/// Runs a test with a temporary file-backed database.
pub fn with_file_db<F, R>(f: F) -> R
where
    F: FnOnce(&Database, &Path) -> R,
{
    let test_db = TestDatabase::file();
    let path = test_db.path().expect("file database has a path");
    f(&test_db.db, &path)
}

/// Creates `orders(id, item, qty)` with extension key `lines`.
pub fn create_orders(db: &Database) {
    db.create_table("orders", ["id", "item", "qty"], "id", ["lines"])
        .expect("Failed to create orders");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_database_has_a_root() {
        let db = TestDatabase::memory();
        assert!(db.list_tables(&TEST_OWNER).unwrap().is_empty());
        assert!(db.path().is_none());
    }

    #[test]
    fn reopen_keeps_tables() {
        let db = TestDatabase::file();
        create_orders(&db);
        let db = db.reopen();
        assert_eq!(db.list_tables(&TEST_OWNER).unwrap(), vec!["orders".to_string()]);
    }
}
