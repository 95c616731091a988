//! # ChainDB Core
//!
//! Tamper-evident, append-only tables on top of an ordered transaction
//! ledger.
//!
//! This crate provides:
//! - deterministic addresses for roots, tables and extension tables
//! - a schema registry with a per-owner root directory
//! - per-table row logs protected by a rolling SHA-256 hash chain
//! - an instruction log of updates and deletes that never rewrites rows
//! - read-time reconciliation of rows and instructions into a view
//! - in-memory and file-backed ledgers
//!
//! ```rust
//! use chaindb_core::{Database, Owner};
//!
//! let owner = Owner::from_bytes([1; 32]);
//! let db = Database::open_in_memory(owner);
//! db.ensure_root().unwrap();
//! db.ensure_table("notes", ["id", "text"], "id").unwrap();
//!
//! let written = db.write_row("notes", r#"{"id":"1","text":"draft"}"#).unwrap();
//! db.push_instruction("notes", written, "", r#"{"id":"1","text":"final"}"#).unwrap();
//!
//! let view = db.materialize("notes", &owner).unwrap();
//! assert_eq!(view.materialized[0].get("text"), Some("final"));
//! assert!(db.verify_table("notes", &owner).unwrap().is_intact());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod address;
pub mod chain;
mod config;
mod database;
#[cfg(feature = "std")]
mod dir;
mod error;
mod instruction;
pub mod ledger;
mod reconcile;
mod registry;
mod root;
mod rowlog;
mod schema;
mod table;
mod types;

pub use chain::ChainReport;
pub use config::{Config, DEFAULT_MAX_PAYLOAD_SIZE, DEFAULT_MAX_TRANSACTION_SIZE};
pub use database::Database;
#[cfg(feature = "std")]
pub use dir::LedgerDir;
pub use error::{CoreError, CoreResult};
pub use instruction::{
    InstructionEntry, InstructionLog, InstructionRecord, InstructionRef, RowTarget,
};
pub use ledger::{Ledger, MemoryLedger};
#[cfg(feature = "std")]
pub use ledger::FileLedger;
pub use reconcile::{materialize, Materialized, RowKey};
pub use registry::SchemaRegistry;
pub use root::RootDirectory;
pub use rowlog::{RowEntry, RowLog, RowRecord, RowRef};
pub use schema::TableSchema;
pub use table::{ExtensionAnchor, TableAccount, TableRef};
pub use types::{Address, HashLink, LogPosition, Owner, Slot, TxRef};

pub use chaindb_codec::Row;

/// Crate version, as recorded in Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
