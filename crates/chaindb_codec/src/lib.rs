//! # ChainDB Codec
//!
//! Encodings shared by the ChainDB crates:
//!
//! - [`Row`]: the flat string-valued payload stored in tables, with a
//!   canonical JSON form that is hashed into each table's chain
//! - [`to_cbor`] / [`from_cbor`]: CBOR records for accounts, stream entries
//!   and ledger frames
//!
//! ```
//! use chaindb_codec::{from_cbor, to_cbor, Row};
//!
//! let row = Row::parse(r#"{"id": 1, "v": "x"}"#).unwrap();
//! assert_eq!(row.to_canonical_string().unwrap(), r#"{"id":"1","v":"x"}"#);
//!
//! let bytes = to_cbor(&row).unwrap();
//! let back: Row = from_cbor(&bytes).unwrap();
//! assert_eq!(back, row);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cbor;
mod error;
mod row;

pub use cbor::{from_cbor, to_cbor};
pub use error::{CodecError, CodecResult};
pub use row::Row;
