//! CBOR encoding for ledger records.
//!
//! Account data, stream records and file-ledger frames are serde structs
//! written with `ciborium`. Field order is fixed by the struct definitions,
//! so equal values always encode to equal bytes.

use crate::error::{CodecError, CodecResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encodes a value to CBOR bytes.
///
/// # Errors
///
/// Returns [`CodecError::EncodingFailed`] if serialization fails.
pub fn to_cbor<T: Serialize + ?Sized>(value: &T) -> CodecResult<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(value, &mut buf)
        .map_err(|e| CodecError::encoding_failed(e.to_string()))?;
    Ok(buf)
}

/// Decodes a value from CBOR bytes.
///
/// # Errors
///
/// Returns [`CodecError::DecodingFailed`] if the bytes are not a valid
/// encoding of `T`.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<T> {
    ciborium::de::from_reader(bytes).map_err(|e| CodecError::decoding_failed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Frame {
        slot: u64,
        tables: Vec<String>,
    }

    #[test]
    fn struct_survives_cbor() {
        let frame = Frame {
            slot: 7,
            tables: vec!["orders".into(), "users".into()],
        };
        let bytes = to_cbor(&frame).unwrap();
        assert_eq!(from_cbor::<Frame>(&bytes).unwrap(), frame);
    }

    #[test]
    fn equal_values_encode_identically() {
        let a = Frame { slot: 1, tables: vec!["t".into()] };
        let b = Frame { slot: 1, tables: vec!["t".into()] };
        assert_eq!(to_cbor(&a).unwrap(), to_cbor(&b).unwrap());
    }

    #[test]
    fn garbage_is_a_decoding_error() {
        let result: CodecResult<Frame> = from_cbor(&[0xff, 0x00, 0x13]);
        assert!(matches!(result, Err(CodecError::DecodingFailed { .. })));
    }
}
