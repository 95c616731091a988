//! Error types for ChainDB core.

use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in ChainDB core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] chaindb_storage::StorageError),

    /// Payload or record codec error.
    #[error("codec error: {0}")]
    Codec(#[from] chaindb_codec::CodecError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Root, table, account or record is absent.
    #[error("not found: {resource}")]
    NotFound {
        /// What was looked up.
        resource: String,
    },

    /// Create on something that is already registered.
    #[error("already exists: {resource}")]
    AlreadyExists {
        /// What already exists.
        resource: String,
    },

    /// Payload keys are not a subset of the table's columns.
    #[error("columns {unknown:?} are not declared by table {table}")]
    ColumnMismatch {
        /// Table written to.
        table: String,
        /// Keys the schema does not declare.
        unknown: Vec<String>,
    },

    /// Schema definition is not acceptable.
    #[error("invalid schema: {message}")]
    InvalidSchema {
        /// Why the schema was rejected.
        message: String,
    },

    /// Payload or transaction exceeds the size ceiling.
    #[error("too large: {size} bytes exceeds the {limit} byte ceiling")]
    TooLarge {
        /// Measured size.
        size: usize,
        /// Applicable ceiling.
        limit: usize,
    },

    /// An instruction references a row that does not exist in the table.
    #[error("instruction target {target} not found in table {table}")]
    TargetNotFound {
        /// Table the instruction was pushed to.
        table: String,
        /// The unresolved reference.
        target: String,
    },

    /// Signer lacks write authority over the account.
    #[error("unauthorized: {resource} is not owned by the signer")]
    Unauthorized {
        /// Account that was written.
        resource: String,
    },

    /// The substrate endpoint is unreachable or rate limited.
    #[error("ledger unavailable: {message}")]
    Unavailable {
        /// Transport-level detail.
        message: String,
    },

    /// A concurrent transaction changed the account first.
    #[error("account in use: {resource} changed concurrently")]
    AccountInUse {
        /// Contended account.
        resource: String,
    },

    /// Payload is not a flat JSON object of scalar values.
    #[error("invalid payload: {message}")]
    InvalidPayload {
        /// Why the payload was rejected.
        message: String,
    },

    /// The persisted ledger is damaged.
    #[error("ledger corruption: {message}")]
    LedgerCorruption {
        /// Description of the corruption.
        message: String,
    },

    /// Checksum mismatch detected on a ledger frame.
    #[error("checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Stored checksum.
        expected: u32,
        /// Computed checksum.
        actual: u32,
    },

    /// Another process holds the ledger directory.
    #[error("ledger locked: another process has exclusive access")]
    LedgerLocked,
}

impl CoreError {
    /// Creates a not found error.
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Creates an already exists error.
    pub fn already_exists(resource: impl Into<String>) -> Self {
        Self::AlreadyExists {
            resource: resource.into(),
        }
    }

    /// Creates an invalid schema error.
    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Self::InvalidSchema {
            message: message.into(),
        }
    }

    /// Creates an unauthorized error.
    pub fn unauthorized(resource: impl Into<String>) -> Self {
        Self::Unauthorized {
            resource: resource.into(),
        }
    }

    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates an account in use error.
    pub fn account_in_use(resource: impl Into<String>) -> Self {
        Self::AccountInUse {
            resource: resource.into(),
        }
    }

    /// Creates an invalid payload error.
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            message: message.into(),
        }
    }

    /// Creates a ledger corruption error.
    pub fn ledger_corruption(message: impl Into<String>) -> Self {
        Self::LedgerCorruption {
            message: message.into(),
        }
    }

    /// Whether this error was raised by local validation, before any
    /// transaction reached the ledger.
    #[must_use]
    pub fn is_local_rejection(&self) -> bool {
        matches!(
            self,
            Self::ColumnMismatch { .. }
                | Self::InvalidSchema { .. }
                | Self::TooLarge { .. }
                | Self::TargetNotFound { .. }
                | Self::InvalidPayload { .. }
        )
    }
}
