//! # ChainDB Storage
//!
//! Byte stores underneath ChainDB's durable ledger.
//!
//! A backend is an **append-only byte log**: it hands out the offset of each
//! append and reads back exactly what was written. It knows nothing about
//! frames, transactions or tables; `chaindb_core` owns every byte layout.
//!
//! The only destructive operation is [`StorageBackend::truncate`], which the
//! ledger uses to drop a torn trailing frame left behind by a crash.
//!
//! ## Backends
//!
//! - [`InMemoryBackend`] - tests and ephemeral ledgers
//! - [`FileBackend`] - a single OS file
//!
//! ```rust
//! use chaindb_storage::{InMemoryBackend, StorageBackend};
//!
//! let mut log = InMemoryBackend::new();
//! let first = log.append(b"frame-0").unwrap();
//! let second = log.append(b"frame-1").unwrap();
//! assert_eq!((first, second), (0, 7));
//! assert_eq!(log.read_at(second, 7).unwrap(), b"frame-1");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
