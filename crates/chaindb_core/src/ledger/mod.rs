//! Ledger substrate.
//!
//! The engine runs on top of an ordered, immutable transaction log that
//! holds *accounts* (small mutable blobs with an owner and a version) and,
//! per account, append-only *streams* of entries. Everything the engine
//! knows is derived by reading those back.
//!
//! A [`Transaction`] is signed by one [`Owner`] and carries a list of
//! [`Operation`]s. The ledger applies all of them or none:
//!
//! - `CreateAccount` fails with `AlreadyExists` if the address is taken
//! - `WriteAccount` and `Append` fail with `NotFound` on a missing account
//!   and `Unauthorized` if the signer does not own it
//! - a stale `expected_version` or `expected_position` fails with
//!   `AccountInUse`, so the loser of a race is rejected, never reordered
//! - an encoded transaction above [`Ledger::max_transaction_size`] fails
//!   with `TooLarge`
//!
//! Two implementations ship with the crate: [`MemoryLedger`] and, with the
//! `std` feature, the durable [`FileLedger`].

#[cfg(feature = "std")]
mod frame;
mod memory;
mod state;

#[cfg(feature = "std")]
mod file;

#[cfg(feature = "std")]
pub use file::FileLedger;
pub use memory::MemoryLedger;

use crate::error::{CoreError, CoreResult};
use crate::types::{Address, LogPosition, Owner, Slot, TxRef};
use chaindb_codec::to_cbor;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

const TX_REF_TAG: &[u8] = b"chaindb/tx/v1";

/// Per-account append-only log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stream {
    /// Row-write records.
    Rows,
    /// Correction records.
    Instructions,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rows => f.write_str("rows"),
            Self::Instructions => f.write_str("instructions"),
        }
    }
}

/// Current state of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account address.
    pub address: Address,
    /// Signer that created the account; the only one allowed to change it.
    pub owner: Owner,
    /// Bumped by every `WriteAccount`. Starts at zero.
    pub version: u64,
    /// Account data.
    #[serde(with = "blob")]
    pub data: Vec<u8>,
}

/// One step of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Creates an account owned by the signer.
    CreateAccount {
        /// Address to create.
        address: Address,
        /// Initial data.
        #[serde(with = "blob")]
        data: Vec<u8>,
    },
    /// Replaces an account's data if its version still matches.
    WriteAccount {
        /// Account to write.
        address: Address,
        /// Version the caller read.
        expected_version: u64,
        /// New data.
        #[serde(with = "blob")]
        data: Vec<u8>,
    },
    /// Appends one entry to an account stream.
    Append {
        /// Account whose stream is appended to.
        address: Address,
        /// Target stream.
        stream: Stream,
        /// Position the entry must land at; `None` appends wherever the
        /// stream currently ends.
        expected_position: Option<LogPosition>,
        /// Entry payload.
        #[serde(with = "blob")]
        payload: Vec<u8>,
    },
}

/// An atomic batch of operations signed by one owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Signing identity.
    pub signer: Owner,
    /// Operations, applied in order.
    pub operations: Vec<Operation>,
}

impl Transaction {
    /// An empty transaction signed by `signer`.
    #[must_use]
    pub fn new(signer: Owner) -> Self {
        Self {
            signer,
            operations: Vec::new(),
        }
    }

    /// Adds an operation.
    #[must_use]
    pub fn with(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    /// Wire encoding, whose length is checked against the ledger ceiling.
    ///
    /// # Errors
    ///
    /// Returns a codec error if encoding fails.
    pub fn encode(&self) -> CoreResult<Vec<u8>> {
        Ok(to_cbor(self)?)
    }

    /// Size of the wire encoding.
    ///
    /// # Errors
    ///
    /// Returns a codec error if encoding fails.
    pub fn encoded_size(&self) -> CoreResult<usize> {
        self.encode().map(|bytes| bytes.len())
    }

    /// Fails with `TooLarge` if the encoding exceeds `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::TooLarge`] or a codec error.
    pub fn check_size(&self, limit: usize) -> CoreResult<Vec<u8>> {
        let encoded = self.encode()?;
        if encoded.len() > limit {
            return Err(CoreError::TooLarge {
                size: encoded.len(),
                limit,
            });
        }
        Ok(encoded)
    }
}

/// Reference the ledger assigns to a transaction accepted at `slot`.
#[must_use]
pub fn tx_ref(slot: Slot, encoded: &[u8]) -> TxRef {
    let mut hasher = Sha256::new();
    hasher.update(TX_REF_TAG);
    hasher.update(slot.as_u64().to_le_bytes());
    hasher.update(encoded);
    TxRef::from_bytes(hasher.finalize().into())
}

/// One accepted stream entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Transaction that appended it.
    pub tx: TxRef,
    /// Global slot of that transaction.
    pub slot: Slot,
    /// Account the stream belongs to.
    pub address: Address,
    /// Stream kind.
    pub stream: Stream,
    /// Gapless position within the stream.
    pub position: LogPosition,
    /// Transaction signer.
    pub signer: Owner,
    /// Entry payload.
    #[serde(with = "blob")]
    pub payload: Vec<u8>,
}

/// Acknowledgement of an accepted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    /// Transaction reference.
    pub tx: TxRef,
    /// Global slot.
    pub slot: Slot,
    /// Positions assigned to the transaction's `Append`s, in order.
    pub appended: Vec<LogPosition>,
}

/// An ordered transaction substrate.
pub trait Ledger: Send + Sync {
    /// Largest encoded transaction the ledger accepts.
    fn max_transaction_size(&self) -> usize;

    /// Applies `tx` atomically.
    ///
    /// # Errors
    ///
    /// Returns the rejection described in the module docs, or
    /// [`CoreError::Unavailable`] if the ledger cannot be reached.
    fn submit(&self, tx: Transaction) -> CoreResult<Receipt>;

    /// Reads an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot be read.
    fn account(&self, address: &Address) -> CoreResult<Option<Account>>;

    /// Reads a stream in position order.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot be read.
    fn entries(&self, address: &Address, stream: Stream) -> CoreResult<Vec<LedgerEntry>>;

    /// Reads the last entry of a stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot be read.
    fn tail(&self, address: &Address, stream: Stream) -> CoreResult<Option<LedgerEntry>> {
        Ok(self.entries(address, stream)?.pop())
    }
}

/// Serializes byte vectors as CBOR byte strings rather than integer arrays.
pub(crate) mod blob {
    use serde::de::{self, SeqAccess, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub(crate) fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(bytes)
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<u8>, D::Error> {
        deserializer.deserialize_byte_buf(BlobVisitor)
    }

    struct BlobVisitor;

    impl<'de> Visitor<'de> for BlobVisitor {
        type Value = Vec<u8>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a byte string")
        }

        fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Vec<u8>, E> {
            Ok(v.to_vec())
        }

        fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Vec<u8>, E> {
            Ok(v)
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Vec<u8>, A::Error> {
            let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(byte) = seq.next_element()? {
                out.push(byte);
            }
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> Owner {
        Owner::from_bytes([5; 32])
    }

    #[test]
    fn payload_bytes_encode_compactly() {
        let tx = Transaction::new(owner()).with(Operation::Append {
            address: Address::from_bytes([1; 32]),
            stream: Stream::Rows,
            expected_position: None,
            payload: vec![0xff; 400],
        });
        let size = tx.encoded_size().unwrap();
        assert!(size > 400 && size < 600, "encoded size {size}");

        let back: Transaction = chaindb_codec::from_cbor(&tx.encode().unwrap()).unwrap();
        assert_eq!(back, tx);
    }

    #[test]
    fn size_check_rejects_large_transactions() {
        let tx = Transaction::new(owner()).with(Operation::CreateAccount {
            address: Address::from_bytes([1; 32]),
            data: vec![0; 2000],
        });
        let err = tx.check_size(1232).unwrap_err();
        assert!(matches!(err, CoreError::TooLarge { limit: 1232, .. }));
    }

    #[test]
    fn tx_ref_depends_on_slot() {
        assert_ne!(tx_ref(Slot(0), b"tx"), tx_ref(Slot(1), b"tx"));
    }
}
