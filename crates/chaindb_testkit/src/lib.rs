//! # ChainDB Testkit
//!
//! Test utilities for ChainDB.
//!
//! This crate provides:
//! - Test fixtures for in-memory and file-backed databases
//! - Property-based test generators using proptest
//! - Golden vectors for address and hash-chain derivation
//! - A ledger wrapper that injects substrate failures
//! - A model-checking harness that tracks the expected materialized view
//!
//! ## Usage
//!
//! ```rust
//! use chaindb_testkit::prelude::*;
//!
//! with_temp_db(|db| {
//!     db.ensure_table("t", ["id"], "id").unwrap();
//!     db.write_row("t", r#"{"id":"1"}"#).unwrap();
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod faults;
pub mod fixtures;
pub mod generators;
pub mod integration;
pub mod vectors;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::faults::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::vectors::*;
}

pub use faults::*;
pub use fixtures::*;
pub use generators::*;
pub use integration::*;
pub use vectors::*;
