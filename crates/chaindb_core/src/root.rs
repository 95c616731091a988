//! Per-owner root directory.

use crate::error::CoreResult;
use crate::types::Owner;
use chaindb_codec::{from_cbor, to_cbor};
use serde::{Deserialize, Serialize};

/// Catalog of the tables an owner has registered, in creation order.
///
/// Stored as the data of the owner's root account. Only the schema
/// registry writes it, in the same transaction that creates the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootDirectory {
    /// Owner of the root.
    pub owner: Owner,
    /// Registered table names.
    pub tables: Vec<String>,
}

impl RootDirectory {
    /// An empty directory for `owner`.
    #[must_use]
    pub fn new(owner: Owner) -> Self {
        Self {
            owner,
            tables: Vec::new(),
        }
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tables.iter().any(|t| t == name)
    }

    /// Registers `name` unless already present.
    pub fn register(&mut self, name: &str) {
        if !self.contains(name) {
            self.tables.push(name.to_owned());
        }
    }

    pub(crate) fn encode(&self) -> CoreResult<Vec<u8>> {
        Ok(to_cbor(self)?)
    }

    pub(crate) fn decode(bytes: &[u8]) -> CoreResult<Self> {
        Ok(from_cbor(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_is_idempotent() {
        let mut root = RootDirectory::new(Owner::from_bytes([1; 32]));
        root.register("a");
        root.register("b");
        root.register("a");
        assert_eq!(root.tables, vec!["a".to_string(), "b".to_string()]);
        assert!(root.contains("b"));
    }

    #[test]
    fn account_data_roundtrip() {
        let mut root = RootDirectory::new(Owner::from_bytes([2; 32]));
        root.register("orders");
        let back = RootDirectory::decode(&root.encode().unwrap()).unwrap();
        assert_eq!(back, root);
    }
}
