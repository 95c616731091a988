//! Frame format of the file ledger.
//!
//! ```text
//! magic "CDBL" (4) | version u16 LE | length u32 LE | body | crc32 u32 LE
//! ```
//!
//! `body` is the CBOR encoding of [`FrameBody`]: the slot and the exact
//! transaction bytes that were accepted, so transaction references can be
//! recomputed on replay. The checksum covers header and body.

use super::{blob, Transaction};
use crate::error::{CoreError, CoreResult};
use crate::types::Slot;
use chaindb_codec::{from_cbor, to_cbor};
use chaindb_storage::StorageBackend;
use serde::{Deserialize, Serialize};

/// Magic bytes at the start of every frame.
pub(crate) const FRAME_MAGIC: [u8; 4] = *b"CDBL";

/// Current frame format version.
pub(crate) const FRAME_VERSION: u16 = 1;

/// magic (4) + version (2) + length (4)
pub(crate) const HEADER_SIZE: usize = 10;

pub(crate) const CRC_SIZE: usize = 4;

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct FrameBody {
    pub(crate) slot: Slot,
    #[serde(with = "blob")]
    pub(crate) transaction: Vec<u8>,
}

/// A decoded frame.
#[derive(Debug)]
pub(crate) struct Frame {
    pub(crate) offset: u64,
    pub(crate) slot: Slot,
    pub(crate) transaction: Transaction,
    pub(crate) encoded: Vec<u8>,
}

/// Builds the frame for a transaction accepted at `slot`.
pub(crate) fn encode_frame(slot: Slot, encoded_tx: &[u8]) -> CoreResult<Vec<u8>> {
    let body = to_cbor(&FrameBody {
        slot,
        transaction: encoded_tx.to_vec(),
    })?;
    let len = u32::try_from(body.len())
        .map_err(|_| CoreError::invalid_payload("ledger frame exceeds 4 GiB"))?;

    let mut data = Vec::with_capacity(HEADER_SIZE + body.len() + CRC_SIZE);
    data.extend_from_slice(&FRAME_MAGIC);
    data.extend_from_slice(&FRAME_VERSION.to_le_bytes());
    data.extend_from_slice(&len.to_le_bytes());
    data.extend_from_slice(&body);
    let crc = crc32fast::hash(&data);
    data.extend_from_slice(&crc.to_le_bytes());
    Ok(data)
}

/// Sequential reader over the frames of a ledger file.
///
/// An incomplete frame at the end of the file is a torn write: iteration
/// stops and [`FrameReader::torn_at`] reports where the intact prefix
/// ends. A bad magic, unknown version or checksum mismatch is corruption
/// and is returned as an error.
pub(crate) struct FrameReader<'a> {
    backend: &'a dyn StorageBackend,
    offset: u64,
    size: u64,
    torn_at: Option<u64>,
    finished: bool,
}

impl<'a> FrameReader<'a> {
    pub(crate) fn new(backend: &'a dyn StorageBackend) -> CoreResult<Self> {
        let size = backend.size()?;
        Ok(Self {
            backend,
            offset: 0,
            size,
            torn_at: None,
            finished: false,
        })
    }

    /// Offset of a trailing incomplete frame, once iteration has ended.
    pub(crate) fn torn_at(&self) -> Option<u64> {
        self.torn_at
    }

    fn remaining(&self) -> u64 {
        self.size - self.offset
    }

    fn read_frame(&mut self) -> CoreResult<Option<Frame>> {
        let start = self.offset;
        if self.remaining() == 0 {
            return Ok(None);
        }
        if self.remaining() < HEADER_SIZE as u64 {
            self.torn_at = Some(start);
            return Ok(None);
        }

        let header = self.backend.read_at(start, HEADER_SIZE)?;
        if header[0..4] != FRAME_MAGIC {
            return Err(CoreError::ledger_corruption(format!(
                "invalid magic at offset {start}"
            )));
        }
        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != FRAME_VERSION {
            return Err(CoreError::ledger_corruption(format!(
                "unsupported frame version {version} at offset {start}"
            )));
        }
        let body_len = u32::from_le_bytes([header[6], header[7], header[8], header[9]]) as usize;

        let total = HEADER_SIZE + body_len + CRC_SIZE;
        if self.remaining() < total as u64 {
            self.torn_at = Some(start);
            return Ok(None);
        }

        let frame = self.backend.read_at(start, total)?;
        let (covered, crc) = frame.split_at(HEADER_SIZE + body_len);
        let stored = u32::from_le_bytes([crc[0], crc[1], crc[2], crc[3]]);
        let computed = crc32fast::hash(covered);
        if stored != computed {
            return Err(CoreError::ChecksumMismatch {
                expected: stored,
                actual: computed,
            });
        }

        let body: FrameBody = from_cbor(&covered[HEADER_SIZE..])?;
        let transaction: Transaction = from_cbor(&body.transaction)?;
        self.offset += total as u64;

        Ok(Some(Frame {
            offset: start,
            slot: body.slot,
            transaction,
            encoded: body.transaction,
        }))
    }
}

impl Iterator for FrameReader<'_> {
    type Item = CoreResult<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_frame() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Operation;
    use crate::types::{Address, Owner};
    use chaindb_storage::InMemoryBackend;

    fn sample_tx(byte: u8) -> Vec<u8> {
        Transaction::new(Owner::from_bytes([byte; 32]))
            .with(Operation::CreateAccount {
                address: Address::from_bytes([byte; 32]),
                data: vec![byte; 8],
            })
            .encode()
            .unwrap()
    }

    fn backend_with(frames: &[Vec<u8>]) -> InMemoryBackend {
        InMemoryBackend::with_data(frames.concat())
    }

    #[test]
    fn frames_read_back_in_order() {
        let frames = vec![
            encode_frame(Slot(0), &sample_tx(1)).unwrap(),
            encode_frame(Slot(1), &sample_tx(2)).unwrap(),
        ];
        let backend = backend_with(&frames);
        let mut reader = FrameReader::new(&backend).unwrap();

        let first = reader.next().unwrap().unwrap();
        assert_eq!(first.offset, 0);
        assert_eq!(first.slot, Slot(0));
        assert_eq!(first.encoded, sample_tx(1));

        let second = reader.next().unwrap().unwrap();
        assert_eq!(second.offset, frames[0].len() as u64);
        assert_eq!(second.transaction.signer, Owner::from_bytes([2; 32]));

        assert!(reader.next().is_none());
        assert_eq!(reader.torn_at(), None);
    }

    #[test]
    fn truncated_tail_is_reported_not_fatal() {
        let whole = encode_frame(Slot(0), &sample_tx(1)).unwrap();
        let mut partial = encode_frame(Slot(1), &sample_tx(2)).unwrap();
        partial.truncate(partial.len() - 3);
        let backend = backend_with(&[whole.clone(), partial]);

        let mut reader = FrameReader::new(&backend).unwrap();
        assert!(reader.next().unwrap().is_ok());
        assert!(reader.next().is_none());
        assert_eq!(reader.torn_at(), Some(whole.len() as u64));
    }

    #[test]
    fn flipped_byte_fails_checksum() {
        let mut frame = encode_frame(Slot(0), &sample_tx(1)).unwrap();
        frame[HEADER_SIZE + 2] ^= 0x01;
        let backend = backend_with(&[frame]);

        let mut reader = FrameReader::new(&backend).unwrap();
        let err = reader.next().unwrap().unwrap_err();
        assert!(matches!(err, CoreError::ChecksumMismatch { .. }));
        assert!(reader.next().is_none());
    }

    #[test]
    fn bad_magic_is_corruption() {
        let mut frame = encode_frame(Slot(0), &sample_tx(1)).unwrap();
        frame[0] = b'X';
        let backend = backend_with(&[frame]);
        let err = FrameReader::new(&backend).unwrap().next().unwrap().unwrap_err();
        assert!(matches!(err, CoreError::LedgerCorruption { .. }));
    }
}
