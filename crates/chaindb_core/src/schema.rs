//! Table schemas.

use crate::error::{CoreError, CoreResult};
use crate::table::TableRef;
use chaindb_codec::Row;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Declared shape of a table.
///
/// Schemas are plain data. The registry stores them in the table account
/// and replaces them wholesale on update; rows already in the log are never
/// re-validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name, unique per owner.
    pub name: String,
    /// Ordered column names.
    pub columns: Vec<String>,
    /// Column whose value identifies a row during reconciliation.
    pub id_column: String,
    /// Names under which rows of this table may carry extension tables.
    #[serde(default)]
    pub extension_keys: Vec<String>,
}

impl TableSchema {
    /// Builds and validates a schema.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidSchema`] if the definition is rejected by
    /// [`TableSchema::validate`].
    pub fn new<C, K>(
        name: impl Into<String>,
        columns: C,
        id_column: impl Into<String>,
        extension_keys: K,
    ) -> CoreResult<Self>
    where
        C: IntoIterator,
        C::Item: Into<String>,
        K: IntoIterator,
        K::Item: Into<String>,
    {
        let schema = Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            id_column: id_column.into(),
            extension_keys: extension_keys.into_iter().map(Into::into).collect(),
        };
        schema.validate()?;
        Ok(schema)
    }

    /// Checks the schema's own invariants.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidSchema`] if the name is neither a plain
    /// table name nor an extension path, the column list is empty or repeats
    /// a name, the id column is not declared, or an extension key repeats.
    pub fn validate(&self) -> CoreResult<()> {
        TableRef::parse(&self.name)?;

        if self.columns.is_empty() {
            return Err(CoreError::invalid_schema(format!(
                "table {} declares no columns",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if column.is_empty() {
                return Err(CoreError::invalid_schema("column names must not be empty"));
            }
            if !seen.insert(column.as_str()) {
                return Err(CoreError::invalid_schema(format!(
                    "column {column} declared twice"
                )));
            }
        }

        if !seen.contains(self.id_column.as_str()) {
            return Err(CoreError::invalid_schema(format!(
                "id column {} is not among the columns of {}",
                self.id_column, self.name
            )));
        }

        let mut keys = HashSet::new();
        for key in &self.extension_keys {
            if key.is_empty() || key.contains('/') {
                return Err(CoreError::invalid_schema(format!(
                    "invalid extension key {key:?}"
                )));
            }
            if !keys.insert(key.as_str()) {
                return Err(CoreError::invalid_schema(format!(
                    "extension key {key} declared twice"
                )));
            }
        }

        Ok(())
    }

    /// Whether `column` is declared.
    #[must_use]
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Whether `key` is a declared extension key.
    #[must_use]
    pub fn has_extension_key(&self, key: &str) -> bool {
        self.extension_keys.iter().any(|k| k == key)
    }

    /// Rejects rows that carry undeclared columns.
    ///
    /// Missing columns are fine, rows are sparse.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ColumnMismatch`] listing every unknown key.
    pub fn check_row(&self, row: &Row) -> CoreResult<()> {
        let unknown: Vec<String> = row
            .columns()
            .filter(|c| !self.has_column(c))
            .map(str::to_owned)
            .collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(CoreError::ColumnMismatch {
                table: self.name.clone(),
                unknown,
            })
        }
    }

    /// Value of the id column in `row`, if present.
    #[must_use]
    pub fn row_id<'r>(&self, row: &'r Row) -> Option<&'r str> {
        row.get(&self.id_column)
    }

    /// Produces the schema that replaces this one.
    ///
    /// An omitted id column keeps the current one, which must still be
    /// declared. Omitted extension keys keep the current ones.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidSchema`] if the result is not valid.
    pub fn updated(
        &self,
        columns: Vec<String>,
        id_column: Option<String>,
        extension_keys: Option<Vec<String>>,
    ) -> CoreResult<Self> {
        let id_column = match id_column {
            Some(id) => id,
            None if columns.contains(&self.id_column) => self.id_column.clone(),
            None => {
                return Err(CoreError::invalid_schema(format!(
                    "current id column {} is not among the new columns; name a new one",
                    self.id_column
                )))
            }
        };
        let next = Self {
            name: self.name.clone(),
            columns,
            id_column,
            extension_keys: extension_keys.unwrap_or_else(|| self.extension_keys.clone()),
        };
        next.validate()?;
        Ok(next)
    }
}

/// Checks a table name.
///
/// # Errors
///
/// Returns [`CoreError::InvalidSchema`] if `name` is empty or contains `/`.
pub fn validate_table_name(name: &str) -> CoreResult<()> {
    if name.is_empty() {
        return Err(CoreError::invalid_schema("table name must not be empty"));
    }
    if name.contains('/') {
        return Err(CoreError::invalid_schema(format!(
            "table name {name:?} must not contain '/'"
        )));
    }
    Ok(())
}
