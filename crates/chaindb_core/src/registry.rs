//! Schema registry and root directory maintenance.

use crate::address::root_address;
use crate::error::{CoreError, CoreResult};
use crate::ledger::{Account, Ledger, Operation, Stream, Transaction};
use crate::root::RootDirectory;
use crate::rowlog::RowRecord;
use crate::schema::{validate_table_name, TableSchema};
use crate::table::{ExtensionAnchor, TableAccount, TableRef};
use crate::types::{Address, Owner};
use std::sync::Arc;
use tracing::info;

/// A table account as currently stored.
#[derive(Debug, Clone)]
pub(crate) struct LoadedTable {
    pub(crate) address: Address,
    pub(crate) version: u64,
    pub(crate) account: TableAccount,
}

impl LoadedTable {
    pub(crate) fn schema(&self) -> &TableSchema {
        &self.account.schema
    }
}

/// Creates, evolves and looks up table schemas for one owner.
///
/// Named tables are registered in the owner's [`RootDirectory`] in the same
/// transaction that creates them. Extension tables are not; they are found
/// through their parent row.
#[derive(Clone)]
pub struct SchemaRegistry {
    ledger: Arc<dyn Ledger>,
    owner: Owner,
}

impl SchemaRegistry {
    /// Registry acting as `owner`.
    pub fn new(ledger: Arc<dyn Ledger>, owner: Owner) -> Self {
        Self { ledger, owner }
    }

    /// Creates the owner's root if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns ledger errors other than a lost creation race.
    pub fn ensure_root(&self) -> CoreResult<RootDirectory> {
        if let Some(root) = self.load_root(&self.owner)? {
            return Ok(root.1);
        }

        let root = RootDirectory::new(self.owner);
        let tx = Transaction::new(self.owner).with(Operation::CreateAccount {
            address: root_address(&self.owner),
            data: root.encode()?,
        });
        match self.ledger.submit(tx) {
            Ok(receipt) => {
                info!(owner = %self.owner, slot = receipt.slot.as_u64(), "created root");
                Ok(root)
            }
            Err(CoreError::AlreadyExists { .. }) => self.read_root(&self.owner),
            Err(e) => Err(e),
        }
    }

    /// Reads `owner`'s root directory.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the owner has no root.
    pub fn read_root(&self, owner: &Owner) -> CoreResult<RootDirectory> {
        self.load_root(owner)?
            .map(|(_, root)| root)
            .ok_or_else(|| CoreError::not_found(format!("root of {owner}")))
    }

    /// Names of the tables registered under `owner`, in creation order.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the owner has no root.
    pub fn list_tables(&self, owner: &Owner) -> CoreResult<Vec<String>> {
        Ok(self.read_root(owner)?.tables)
    }

    /// Creates a table.
    ///
    /// For a named table the root must exist; the table account and the
    /// root entry are written in one transaction. For an extension table
    /// the key must be declared on the parent and the parent row must
    /// exist.
    ///
    /// # Errors
    ///
    /// - `AlreadyExists` if the table is already there
    /// - `NotFound` if the root or parent table is missing
    /// - `InvalidSchema` for a bad definition or undeclared extension key
    /// - `TargetNotFound` if the parent row does not exist
    pub fn create_table(
        &self,
        table: impl Into<TableRef>,
        columns: impl IntoIterator<Item = impl Into<String>>,
        id_column: &str,
        extension_keys: impl IntoIterator<Item = impl Into<String>>,
    ) -> CoreResult<TableSchema> {
        let table = table.into();
        let schema = TableSchema::new(table.to_string(), columns, id_column, extension_keys)?;
        let address = table.address(&self.owner);

        if self.ledger.account(&address)?.is_some() {
            return Err(CoreError::already_exists(format!("table {table}")));
        }

        let tx = match &table {
            TableRef::Named(name) => {
                validate_table_name(name)?;
                let (root_account, mut root) = self
                    .load_root(&self.owner)?
                    .ok_or_else(|| CoreError::not_found(format!("root of {}", self.owner)))?;
                root.register(name);
                let account = TableAccount {
                    schema: schema.clone(),
                    anchor: None,
                };
                Transaction::new(self.owner)
                    .with(Operation::CreateAccount {
                        address,
                        data: account.encode()?,
                    })
                    .with(Operation::WriteAccount {
                        address: root_account.address,
                        expected_version: root_account.version,
                        data: root.encode()?,
                    })
            }
            TableRef::Extension { base, row_id, key } => {
                let anchor = self.anchor(base, row_id, key)?;
                let account = TableAccount {
                    schema: schema.clone(),
                    anchor: Some(anchor),
                };
                Transaction::new(self.owner).with(Operation::CreateAccount {
                    address,
                    data: account.encode()?,
                })
            }
        };

        let receipt = self.ledger.submit(tx)?;
        info!(
            table = %table,
            address = %address,
            columns = schema.columns.len(),
            slot = receipt.slot.as_u64(),
            "created table"
        );
        Ok(schema)
    }

    /// Returns the table's schema, creating the table first if needed.
    ///
    /// An existing table is returned as is, even if its schema differs from
    /// the one given here.
    ///
    /// # Errors
    ///
    /// Same as [`SchemaRegistry::create_table`], except `AlreadyExists`.
    pub fn ensure_table(
        &self,
        table: impl Into<TableRef>,
        columns: impl IntoIterator<Item = impl Into<String>>,
        id_column: &str,
    ) -> CoreResult<TableSchema> {
        let table = table.into();
        if let Some(existing) = self.try_load(&self.owner, &table)? {
            return Ok(existing.account.schema);
        }
        match self.create_table(&table, columns, id_column, Vec::<String>::new()) {
            Err(CoreError::AlreadyExists { .. }) => self.read_table_meta(&table),
            other => other,
        }
    }

    /// Replaces a table's schema.
    ///
    /// Without `id_column` the current one is kept and must still be
    /// declared; without `extension_keys` the current keys are kept.
    ///
    /// # Errors
    ///
    /// `NotFound`, `InvalidSchema`, or `AccountInUse` if the schema changed
    /// concurrently.
    pub fn update_table(
        &self,
        table: impl Into<TableRef>,
        columns: impl IntoIterator<Item = impl Into<String>>,
        id_column: Option<&str>,
        extension_keys: Option<Vec<String>>,
    ) -> CoreResult<TableSchema> {
        let table = table.into();
        let loaded = self.load(&self.owner, &table)?;
        let schema = loaded.schema().updated(
            columns.into_iter().map(Into::into).collect(),
            id_column.map(str::to_owned),
            extension_keys,
        )?;

        let account = TableAccount {
            schema: schema.clone(),
            anchor: loaded.account.anchor.clone(),
        };
        let receipt = self.ledger.submit(Transaction::new(self.owner).with(
            Operation::WriteAccount {
                address: loaded.address,
                expected_version: loaded.version,
                data: account.encode()?,
            },
        ))?;
        info!(
            table = %table,
            version = loaded.version + 1,
            slot = receipt.slot.as_u64(),
            "updated table schema"
        );
        Ok(schema)
    }

    /// Current schema of one of the owner's tables.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the table does not exist.
    pub fn read_table_meta(&self, table: impl Into<TableRef>) -> CoreResult<TableSchema> {
        self.read_table_meta_of(table, &self.owner)
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
        Ok(self.load(owner, &table.into())?.account.schema)
    }

    pub(crate) fn load(&self, owner: &Owner, table: &TableRef) -> CoreResult<LoadedTable> {
        self.try_load(owner, table)?
            .ok_or_else(|| CoreError::not_found(format!("table {table}")))
    }

    fn try_load(&self, owner: &Owner, table: &TableRef) -> CoreResult<Option<LoadedTable>> {
        let address = table.address(owner);
        let Some(account) = self.ledger.account(&address)? else {
            return Ok(None);
        };
        Ok(Some(LoadedTable {
            address,
            version: account.version,
            account: TableAccount::decode(&account.data)?,
        }))
    }

    fn load_root(&self, owner: &Owner) -> CoreResult<Option<(Account, RootDirectory)>> {
        let Some(account) = self.ledger.account(&root_address(owner))? else {
            return Ok(None);
        };
        let root = RootDirectory::decode(&account.data)?;
        Ok(Some((account, root)))
    }

    fn anchor(&self, base: &str, row_id: &str, key: &str) -> CoreResult<ExtensionAnchor> {
        let parent = self.load(&self.owner, &TableRef::named(base))?;
        if !parent.schema().has_extension_key(key) {
            return Err(CoreError::invalid_schema(format!(
                "extension key {key} is not declared on table {base}"
            )));
        }

        let id_column = &parent.schema().id_column;
        let mut found = false;
        for entry in self.ledger.entries(&parent.address, Stream::Rows)? {
            let row = RowRecord::decode(&entry.payload)?.row()?;
            if row.get(id_column) == Some(row_id) {
                found = true;
                break;
            }
        }
        if !found {
            return Err(CoreError::TargetNotFound {
                table: base.to_owned(),
                target: format!("row {row_id}"),
            });
        }

        Ok(ExtensionAnchor {
            base: base.to_owned(),
            base_address: parent.address,
            row_id: row_id.to_owned(),
            key: key.to_owned(),
        })
    }
}
