//! Database facade.

use crate::chain::ChainReport;
use crate::config::Config;
use crate::error::CoreResult;
use crate::instruction::{InstructionEntry, InstructionLog, InstructionRef, RowTarget};
use crate::ledger::{Ledger, MemoryLedger};
use crate::reconcile::{materialize, Materialized};
use crate::registry::SchemaRegistry;
use crate::root::RootDirectory;
use crate::rowlog::{RowEntry, RowLog, RowRef};
use crate::schema::TableSchema;
use crate::table::TableRef;
use crate::types::Owner;
use chaindb_codec::Row;
use std::sync::Arc;

#[cfg(feature = "std")]
use crate::ledger::FileLedger;
#[cfg(feature = "std")]
use std::path::Path;

/// The main database handle.
///
/// A `Database` acts for one [`Owner`] over one [`Ledger`]. Every write is
/// a single ledger transaction signed by that owner; every read is derived
/// from ledger contents, so two handles over the same ledger see the same
/// tables.
///
/// # Opening a Database
///
/// ```rust,ignore
/// use chaindb_core::{Config, Database, Owner};
/// use std::path::Path;
///
/// let owner = Owner::from_hex(&"ab".repeat(32))?;
/// let db = Database::open(Path::new("my_ledger"), owner, Config::default())?;
///
/// db.ensure_root()?;
/// db.ensure_table("orders", ["id", "item", "qty"], "id")?;
/// let written = db.write_row("orders", r#"{"id":"1","item":"pen","qty":"2"}"#)?;
/// db.push_instruction("orders", written, "", r#"{"id":"1","item":"pen","qty":"3"}"#)?;
///
/// let view = db.materialize("orders", &owner)?;
/// assert_eq!(view.materialized[0].get("qty"), Some("3"));
/// ```
///
/// # In-Memory Databases
///
/// ```rust
/// use chaindb_core::{Database, Owner};
///
/// let db = Database::open_in_memory(Owner::from_bytes([7; 32]));
/// db.ensure_root().unwrap();
/// assert!(db.list_tables(db.owner()).unwrap().is_empty());
/// ```
pub struct Database {
    config: Config,
    owner: Owner,
    ledger: Arc<dyn Ledger>,
    registry: SchemaRegistry,
    rows: RowLog,
    instructions: InstructionLog,
}

impl Database {
    /// Opens a database over a file ledger in directory `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot be opened, see
    /// [`FileLedger::open`].
    #[cfg(feature = "std")]
    pub fn open(path: &Path, owner: Owner, config: Config) -> CoreResult<Self> {
        let ledger = FileLedger::open(path, &config)?;
        Ok(Self::with_ledger(Arc::new(ledger), owner, config))
    }

    /// Creates a database over a fresh in-memory ledger.
    #[must_use]
    pub fn open_in_memory(owner: Owner) -> Self {
        let config = Config::default();
        let ledger = MemoryLedger::with_max_transaction_size(config.max_transaction_size);
        Self::with_ledger(Arc::new(ledger), owner, config)
    }

    /// Creates a database over an existing ledger.
    ///
    /// The ledger's own transaction ceiling applies; `config` only supplies
    /// the engine-side limits.
    pub fn with_ledger(ledger: Arc<dyn Ledger>, owner: Owner, config: Config) -> Self {
        let registry = SchemaRegistry::new(Arc::clone(&ledger), owner);
        let rows = RowLog::new(
            Arc::clone(&ledger),
            registry.clone(),
            owner,
            config.max_payload_size,
        );
        let instructions = InstructionLog::new(
            Arc::clone(&ledger),
            registry.clone(),
            rows.clone(),
            owner,
            config.max_payload_size,
        );
        Self {
            config,
            owner,
            ledger,
            registry,
            rows,
            instructions,
        }
    }

    /// Identity this handle signs with.
    #[must_use]
    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    /// Configuration in effect.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Underlying ledger.
    #[must_use]
    pub fn ledger(&self) -> &Arc<dyn Ledger> {
        &self.ledger
    }

    /// Schema registry of this handle.
    #[must_use]
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    // --- root directory and schemas ---

    /// See [`SchemaRegistry::ensure_root`].
    ///
    /// # Errors
    ///
    /// Returns ledger errors other than a lost creation race.
    pub fn ensure_root(&self) -> CoreResult<RootDirectory> {
        self.registry.ensure_root()
    }

    /// See [`SchemaRegistry::read_root`].
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if `owner` has no root.
    pub fn read_root(&self, owner: &Owner) -> CoreResult<RootDirectory> {
        self.registry.read_root(owner)
    }

    /// See [`SchemaRegistry::list_tables`].
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if `owner` has no root.
    pub fn list_tables(&self, owner: &Owner) -> CoreResult<Vec<String>> {
        self.registry.list_tables(owner)
    }

    /// See [`SchemaRegistry::create_table`].
    ///
    /// # Errors
    ///
    /// See [`SchemaRegistry::create_table`].
    pub fn create_table(
        &self,
        table: impl Into<TableRef>,
        columns: impl IntoIterator<Item = impl Into<String>>,
        id_column: &str,
        extension_keys: impl IntoIterator<Item = impl Into<String>>,
    ) -> CoreResult<TableSchema> {
        self.registry.create_table(table, columns, id_column, extension_keys)
    }

    /// See [`SchemaRegistry::ensure_table`].
    ///
    /// # Errors
    ///
    /// See [`SchemaRegistry::ensure_table`].
    pub fn ensure_table(
        &self,
        table: impl Into<TableRef>,
        columns: impl IntoIterator<Item = impl Into<String>>,
        id_column: &str,
    ) -> CoreResult<TableSchema> {
        self.registry.ensure_table(table, columns, id_column)
    }

    /// See [`SchemaRegistry::update_table`].
    ///
    /// # Errors
    ///
    /// See [`SchemaRegistry::update_table`].
    pub fn update_table(
        &self,
        table: impl Into<TableRef>,
        columns: impl IntoIterator<Item = impl Into<String>>,
        id_column: Option<&str>,
        extension_keys: Option<Vec<String>>,
    ) -> CoreResult<TableSchema> {
        self.registry.update_table(table, columns, id_column, extension_keys)
    }

    /// Current schema of one of this owner's tables.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the table does not exist.
    pub fn read_table_meta(&self, table: impl Into<TableRef>) -> CoreResult<TableSchema> {
        self.registry.read_table_meta(table)
    }

    /// Current schema of another owner's table.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the table does not exist.
    pub fn read_table_meta_of(
        &self,
        table: impl Into<TableRef>,
        owner: &Owner,
    ) -> CoreResult<TableSchema> {
        self.registry.read_table_meta_of(table, owner)
    }

    // --- rows ---

    /// See [`RowLog::write_row`].
    ///
    /// # Errors
    ///
    /// See [`RowLog::write_row_value`].
    pub fn write_row(&self, table: impl Into<TableRef>, payload: &str) -> CoreResult<RowRef> {
        self.rows.write_row(table, payload)
    }

    /// See [`RowLog::write_row_value`].
    ///
    /// # Errors
    ///
    /// See [`RowLog::write_row_value`].
    pub fn write_row_value(&self, table: impl Into<TableRef>, row: Row) -> CoreResult<RowRef> {
        self.rows.write_row_value(table, row)
    }

    /// See [`RowLog::read_rows`].
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the table does not exist.
    pub fn read_rows(
        &self,
        table: impl Into<TableRef>,
        owner: &Owner,
        limit: Option<usize>,
    ) -> CoreResult<Vec<RowEntry>> {
        self.rows.read_rows(table, owner, limit)
    }

    /// See [`RowLog::verify_table`].
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the table does not exist.
    pub fn verify_table(
        &self,
        table: impl Into<TableRef>,
        owner: &Owner,
    ) -> CoreResult<ChainReport> {
        self.rows.verify_table(table, owner)
    }

    // --- corrections ---

    /// See [`InstructionLog::push_instruction`].
    ///
    /// # Errors
    ///
    /// See [`InstructionLog::push_instruction`].
    pub fn push_instruction(
        &self,
        table: impl Into<TableRef>,
        target: impl Into<RowTarget>,
        before: &str,
        after: &str,
    ) -> CoreResult<InstructionRef> {
        self.instructions.push_instruction(table, target, before, after)
    }

    /// See [`InstructionLog::list_instructions`].
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the table does not exist.
    pub fn list_instructions(
        &self,
        table: impl Into<TableRef>,
        owner: &Owner,
    ) -> CoreResult<Vec<InstructionEntry>> {
        self.instructions.list_instructions(table, owner)
    }

    /// Reads both logs of `owner`'s table and folds them into the current
    /// view. Nothing is cached; every call re-reads the ledger.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the table does not exist.
    pub fn materialize(
        &self,
        table: impl Into<TableRef>,
        owner: &Owner,
    ) -> CoreResult<Materialized> {
        let table = table.into();
        let loaded = self.registry.load(owner, &table)?;
        let rows = self.rows.records(&loaded.address)?;
        let instructions = self.instructions.records(&loaded.address)?;
        let materialized = materialize(loaded.schema(), &rows, &instructions);
        Ok(Materialized {
            rows,
            instructions,
            materialized,
        })
    }
}
