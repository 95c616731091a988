//! Table references and table account contents.

use crate::address::{extension_address, table_address};
use crate::error::{CoreError, CoreResult};
use crate::schema::{validate_table_name, TableSchema};
use crate::types::{Address, Owner};
use chaindb_codec::{from_cbor, to_cbor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Names a table: either a registered table or an extension table hung
/// off one row of a registered table.
///
/// The text form of an extension table is `base/row_id/key`. Table names
/// and extension keys never contain `/`, so the row id is everything
/// between the first and the last separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TableRef {
    /// A table listed in the owner's root directory.
    Named(String),
    /// An extension table.
    Extension {
        /// Parent table name.
        base: String,
        /// Id-column value of the parent row.
        row_id: String,
        /// Extension key declared on the parent table.
        key: String,
    },
}

impl TableRef {
    /// Reference to a registered table.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Reference to an extension table.
    pub fn extension(
        base: impl Into<String>,
        row_id: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self::Extension {
            base: base.into(),
            row_id: row_id.into(),
            key: key.into(),
        }
    }

    /// Parses the text form.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidSchema`] if the text is empty or a path
    /// with an empty segment.
    pub fn parse(text: &str) -> CoreResult<Self> {
        let Some((base, rest)) = text.split_once('/') else {
            validate_table_name(text)?;
            return Ok(Self::Named(text.to_owned()));
        };
        let (row_id, key) = rest.rsplit_once('/').ok_or_else(|| {
            CoreError::invalid_schema(format!("{text:?} is not of the form base/row_id/key"))
        })?;
        if base.is_empty() || row_id.is_empty() || key.is_empty() {
            return Err(CoreError::invalid_schema(format!(
                "{text:?} has an empty path segment"
            )));
        }
        Ok(Self::extension(base, row_id, key))
    }

    /// Derived account address of the table under `owner`.
    #[must_use]
    pub fn address(&self, owner: &Owner) -> Address {
        match self {
            Self::Named(name) => table_address(owner, name),
            Self::Extension { base, row_id, key } => extension_address(owner, base, row_id, key),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::Extension { base, row_id, key } => write!(f, "{base}/{row_id}/{key}"),
        }
    }
}

impl FromStr for TableRef {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        Self::parse(s)
    }
}

impl From<&str> for TableRef {
    /// Well-formed `base/row_id/key` paths become extension references;
    /// anything else is taken as a plain name and validated on use.
    fn from(text: &str) -> Self {
        Self::parse(text).unwrap_or_else(|_| Self::Named(text.to_owned()))
    }
}

impl From<String> for TableRef {
    fn from(text: String) -> Self {
        Self::from(text.as_str())
    }
}

impl From<&String> for TableRef {
    fn from(text: &String) -> Self {
        Self::from(text.as_str())
    }
}

impl From<&TableRef> for TableRef {
    fn from(table: &TableRef) -> Self {
        table.clone()
    }
}

/// Where an extension table hangs off its parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionAnchor {
    /// Parent table name.
    pub base: String,
    /// Parent table address.
    pub base_address: Address,
    /// Id of the parent row.
    pub row_id: String,
    /// Extension key on the parent table.
    pub key: String,
}

/// Data of a table account.
///
/// The chain head is not kept here; each row record carries its own link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableAccount {
    /// Current schema.
    pub schema: TableSchema,
    /// Parent row, for extension tables.
    pub anchor: Option<ExtensionAnchor>,
}

impl TableAccount {
    pub(crate) fn encode(&self) -> CoreResult<Vec<u8>> {
        Ok(to_cbor(self)?)
    }

    pub(crate) fn decode(bytes: &[u8]) -> CoreResult<Self> {
        Ok(from_cbor(bytes)?)
    }
}
