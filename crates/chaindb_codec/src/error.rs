//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while encoding or decoding payloads and records.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Failed to encode a record.
    #[error("encoding failed: {message}")]
    EncodingFailed {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode a record.
    #[error("decoding failed: {message}")]
    DecodingFailed {
        /// Description of the decoding error.
        message: String,
    },

    /// The payload text is not valid JSON.
    #[error("invalid JSON payload: {message}")]
    InvalidJson {
        /// Parser message.
        message: String,
    },

    /// The payload is valid JSON but not an object.
    #[error("payload must be a JSON object, found {kind}")]
    NotAnObject {
        /// JSON kind that was found instead.
        kind: &'static str,
    },

    /// A column value is not a string, number or boolean.
    #[error("column {column:?} holds unsupported {kind} value")]
    UnsupportedValue {
        /// Offending column.
        column: String,
        /// JSON kind of the value.
        kind: &'static str,
    },
}

impl CodecError {
    /// Creates an encoding failed error.
    pub fn encoding_failed(message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            message: message.into(),
        }
    }

    /// Creates a decoding failed error.
    pub fn decoding_failed(message: impl Into<String>) -> Self {
        Self::DecodingFailed {
            message: message.into(),
        }
    }
}
