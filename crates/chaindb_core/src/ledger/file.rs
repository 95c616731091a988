//! Durable single-process ledger.

use super::frame::{encode_frame, FrameReader};
use super::state::LedgerState;
use super::{Account, Ledger, LedgerEntry, Receipt, Stream, Transaction};
use crate::config::Config;
use crate::dir::LedgerDir;
use crate::error::{CoreError, CoreResult};
use crate::types::Address;
use chaindb_storage::{FileBackend, StorageBackend};
use parking_lot::RwLock;
use std::path::Path;
use tracing::{debug, error, info, warn};

struct Inner {
    state: LedgerState,
    log: Box<dyn StorageBackend>,
    /// Set when a failed append could not be rolled back; the log tail is
    /// unknown from then on and no further frames may follow it.
    poisoned: Option<String>,
}

/// A ledger persisted as a CRC-framed append-only file.
///
/// Opening replays every frame to rebuild accounts and streams. A frame cut
/// short by a crash is dropped; any other damage fails the open.
///
/// ```rust,ignore
/// let ledger = FileLedger::open(Path::new("my_ledger"), &Config::default())?;
/// ```
pub struct FileLedger {
    dir: LedgerDir,
    inner: RwLock<Inner>,
    max_transaction_size: usize,
    sync_on_commit: bool,
}

impl FileLedger {
    /// Opens (or creates) the ledger in directory `path`.
    ///
    /// # Errors
    ///
    /// Returns `LedgerLocked` if another process has the directory open,
    /// `ChecksumMismatch` or `LedgerCorruption` for a damaged log, and I/O
    /// errors.
    pub fn open(path: &Path, config: &Config) -> CoreResult<Self> {
        let dir = LedgerDir::open(path, config.create_if_missing)?;
        let log = FileBackend::open(&dir.ledger_path())?;
        if dir.is_new() {
            dir.sync_directory()?;
        }
        Self::with_log(dir, Box::new(log), config)
    }

    fn with_log(
        dir: LedgerDir,
        mut log: Box<dyn StorageBackend>,
        config: &Config,
    ) -> CoreResult<Self> {
        let state = Self::replay(log.as_mut())?;
        info!(
            path = %dir.path().display(),
            accounts = state.account_count(),
            next_slot = state.next_slot().as_u64(),
            "opened file ledger"
        );

        Ok(Self {
            dir,
            inner: RwLock::new(Inner {
                state,
                log,
                poisoned: None,
            }),
            max_transaction_size: config.max_transaction_size,
            sync_on_commit: config.sync_on_commit,
        })
    }

    fn replay(log: &mut dyn StorageBackend) -> CoreResult<LedgerState> {
        let mut state = LedgerState::new();
        let mut reader = FrameReader::new(&*log)?;
        for frame in reader.by_ref() {
            let frame = frame?;
            if frame.slot < state.next_slot() {
                return Err(CoreError::ledger_corruption(format!(
                    "slot {} at offset {} is out of order",
                    frame.slot, frame.offset
                )));
            }
            let staged = state
                .stage(frame.slot, &frame.transaction, &frame.encoded)
                .map_err(|e| {
                    CoreError::ledger_corruption(format!(
                        "frame at offset {} does not replay: {e}",
                        frame.offset
                    ))
                })?;
            state.commit(staged);
        }
        let torn_at = reader.torn_at();

        if let Some(offset) = torn_at {
            let size = log.size()?;
            warn!(offset, dropped = size - offset, "discarding torn ledger frame");
            log.truncate(offset)?;
            log.sync()?;
        }
        Ok(state)
    }

    /// Directory holding the ledger.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

impl Ledger for FileLedger {
    fn max_transaction_size(&self) -> usize {
        self.max_transaction_size
    }

    fn submit(&self, tx: Transaction) -> CoreResult<Receipt> {
        let encoded = tx.check_size(self.max_transaction_size)?;
        let mut inner = self.inner.write();
        let Inner {
            state,
            log,
            poisoned,
        } = &mut *inner;
        if let Some(reason) = poisoned {
            return Err(CoreError::ledger_corruption(format!(
                "ledger refuses writes: {reason}"
            )));
        }

        let staged = state.stage(state.next_slot(), &tx, &encoded)?;
        let frame = encode_frame(staged.slot(), &encoded)?;

        let before = log.size()?;
        let written = log.append(&frame).and_then(|_| log.flush()).and_then(|()| {
            if self.sync_on_commit {
                log.sync()
            } else {
                Ok(())
            }
        });
        if let Err(e) = written {
            // Leave no partial frame behind for later appends to follow.
            if let Err(rollback) = log.truncate(before) {
                let reason = format!(
                    "append failed ({e}); rollback to offset {before} failed ({rollback})"
                );
                error!(offset = before, %reason, "ledger tail left unrecoverable");
                *poisoned = Some(reason.clone());
                return Err(CoreError::ledger_corruption(reason));
            }
            return Err(e.into());
        }

        let receipt = state.commit(staged);
        debug!(slot = receipt.slot.as_u64(), bytes = frame.len(), "ledger frame committed");
        Ok(receipt)
    }

    fn account(&self, address: &Address) -> CoreResult<Option<Account>> {
        Ok(self.inner.read().state.account(address).cloned())
    }

    fn entries(&self, address: &Address, stream: Stream) -> CoreResult<Vec<LedgerEntry>> {
        Ok(self.inner.read().state.entries(address, stream).to_vec())
    }

    fn tail(&self, address: &Address, stream: Stream) -> CoreResult<Option<LedgerEntry>> {
        Ok(self.inner.read().state.entries(address, stream).last().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Operation;
    use crate::types::{LogPosition, Owner};
    use chaindb_storage::{InMemoryBackend, StorageError, StorageResult};
    use parking_lot::Mutex;
    use std::fs::OpenOptions;
    use std::io::{self, Write};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn owner() -> Owner {
        Owner::from_bytes([4; 32])
    }

    fn address() -> Address {
        Address::from_bytes([8; 32])
    }

    fn seed(ledger: &FileLedger) {
        ledger
            .submit(Transaction::new(owner()).with(Operation::CreateAccount {
                address: address(),
                data: b"acct".to_vec(),
            }))
            .unwrap();
        for i in 0..3u8 {
            ledger
                .submit(Transaction::new(owner()).with(Operation::Append {
                    address: address(),
                    stream: Stream::Rows,
                    expected_position: Some(LogPosition::new(u64::from(i))),
                    payload: vec![i],
                }))
                .unwrap();
        }
    }

    #[test]
    fn reopen_reproduces_state() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("ledger");
        let config = Config::default();

        let before = {
            let ledger = FileLedger::open(&path, &config).unwrap();
            seed(&ledger);
            ledger.entries(&address(), Stream::Rows).unwrap()
        };

        let ledger = FileLedger::open(&path, &config).unwrap();
        assert_eq!(ledger.entries(&address(), Stream::Rows).unwrap(), before);
        assert_eq!(ledger.account(&address()).unwrap().unwrap().data, b"acct");

        let receipt = ledger
            .submit(Transaction::new(owner()).with(Operation::Append {
                address: address(),
                stream: Stream::Rows,
                expected_position: Some(LogPosition::new(3)),
                payload: vec![3],
            }))
            .unwrap();
        assert_eq!(receipt.slot.as_u64(), 4);
    }

    #[test]
    fn torn_tail_is_dropped_on_open() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("ledger");
        let config = Config::default();
        {
            let ledger = FileLedger::open(&path, &config).unwrap();
            seed(&ledger);
        }

        let log_path = path.join("ledger.log");
        let intact = std::fs::metadata(&log_path).unwrap().len();
        let mut file = OpenOptions::new().append(true).open(&log_path).unwrap();
        file.write_all(b"CDBL\x01\x00\xff").unwrap();
        drop(file);

        let ledger = FileLedger::open(&path, &config).unwrap();
        assert_eq!(ledger.entries(&address(), Stream::Rows).unwrap().len(), 3);
        assert_eq!(std::fs::metadata(&log_path).unwrap().len(), intact);
    }

    #[test]
    fn corrupted_frame_fails_open() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("ledger");
        let config = Config::default();
        {
            let ledger = FileLedger::open(&path, &config).unwrap();
            seed(&ledger);
        }

        let log_path = path.join("ledger.log");
        let mut bytes = std::fs::read(&log_path).unwrap();
        // Inside the body of the first frame.
        bytes[12] ^= 0xff;
        std::fs::write(&log_path, bytes).unwrap();

        let err = FileLedger::open(&path, &config).err().unwrap();
        assert!(matches!(err, CoreError::ChecksumMismatch { .. }));
    }

    #[derive(Default)]
    struct Faults {
        append: bool,
        truncate: bool,
    }

    /// In-memory log that can fail halfway through an append.
    #[derive(Clone, Default)]
    struct FlakyLog {
        data: Arc<Mutex<InMemoryBackend>>,
        faults: Arc<Mutex<Faults>>,
    }

    impl StorageBackend for FlakyLog {
        fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
            self.data.lock().read_at(offset, len)
        }

        fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
            if self.faults.lock().append {
                self.data.lock().append(&data[..data.len() / 2])?;
                return Err(StorageError::Io(io::Error::other("disk full")));
            }
            self.data.lock().append(data)
        }

        fn flush(&mut self) -> StorageResult<()> {
            Ok(())
        }

        fn sync(&mut self) -> StorageResult<()> {
            Ok(())
        }

        fn size(&self) -> StorageResult<u64> {
            self.data.lock().size()
        }

        fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
            if self.faults.lock().truncate {
                return Err(StorageError::Io(io::Error::other("read-only filesystem")));
            }
            self.data.lock().truncate(new_size)
        }
    }

    fn flaky_ledger(temp: &tempfile::TempDir) -> (FileLedger, FlakyLog) {
        let log = FlakyLog::default();
        let dir = LedgerDir::open(&temp.path().join("ledger"), true).unwrap();
        let ledger = FileLedger::with_log(dir, Box::new(log.clone()), &Config::default()).unwrap();
        (ledger, log)
    }

    fn append(position: u64) -> Transaction {
        Transaction::new(owner()).with(Operation::Append {
            address: address(),
            stream: Stream::Rows,
            expected_position: Some(LogPosition::new(position)),
            payload: position.to_le_bytes().to_vec(),
        })
    }

    #[test]
    fn failed_append_is_rolled_back() {
        let temp = tempdir().unwrap();
        let (ledger, log) = flaky_ledger(&temp);
        seed(&ledger);

        log.faults.lock().append = true;
        assert!(matches!(ledger.submit(append(3)), Err(CoreError::Storage(_))));
        log.faults.lock().append = false;
        ledger.submit(append(3)).unwrap();

        let data = log.data.lock();
        let mut reader = FrameReader::new(&*data).unwrap();
        assert_eq!(reader.by_ref().filter(Result::is_ok).count(), 5);
        assert_eq!(reader.torn_at(), None);
    }

    #[test]
    fn failed_rollback_stops_further_writes() {
        let temp = tempdir().unwrap();
        let (ledger, log) = flaky_ledger(&temp);
        seed(&ledger);

        *log.faults.lock() = Faults {
            append: true,
            truncate: true,
        };
        let err = ledger.submit(append(3)).unwrap_err();
        assert!(matches!(err, CoreError::LedgerCorruption { .. }));
        assert!(err.to_string().contains("read-only filesystem"));

        *log.faults.lock() = Faults::default();
        assert!(matches!(
            ledger.submit(append(3)),
            Err(CoreError::LedgerCorruption { .. })
        ));
        // Reads keep serving the last acknowledged state.
        assert_eq!(ledger.entries(&address(), Stream::Rows).unwrap().len(), 3);
    }

    #[test]
    fn second_open_is_locked_out() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("ledger");
        let _ledger = FileLedger::open(&path, &Config::default()).unwrap();
        assert!(matches!(
            FileLedger::open(&path, &Config::default()),
            Err(CoreError::LedgerLocked)
        ));
    }
}
