//! Fault injection at the ledger boundary.

use chaindb_codec::{from_cbor, to_cbor};
use chaindb_core::ledger::{Account, LedgerEntry, Receipt, Stream, Transaction};
use chaindb_core::{Address, CoreError, CoreResult, Ledger, LogPosition, MemoryLedger, RowRecord};
use parking_lot::Mutex;
use std::sync::Arc;

/// What the wrapper does to the next calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fault {
    /// Pass every call through.
    #[default]
    None,
    /// Fail the next `n` submissions with `Unavailable`.
    RejectSubmits(usize),
    /// Fail every read with `Unavailable`.
    RejectReads,
}

/// A ledger that can be told to behave like an unreachable endpoint, or
/// like one whose history was rewritten.
///
/// It also counts submissions, so tests can check that the engine does not
/// retry on its own.
pub struct FaultyLedger {
    inner: Arc<dyn Ledger>,
    fault: Mutex<Fault>,
    submits: Mutex<usize>,
    rewrites: Mutex<Vec<(LogPosition, String)>>,
}

impl FaultyLedger {
    /// Wraps `inner`.
    pub fn new(inner: Arc<dyn Ledger>) -> Self {
        Self {
            inner,
            fault: Mutex::new(Fault::None),
            submits: Mutex::new(0),
            rewrites: Mutex::new(Vec::new()),
        }
    }

    /// Wraps a fresh in-memory ledger.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryLedger::new()))
    }

    /// Sets the fault for subsequent calls.
    pub fn inject(&self, fault: Fault) {
        *self.fault.lock() = fault;
    }

    /// Number of `submit` calls seen, failed ones included.
    pub fn submit_count(&self) -> usize {
        *self.submits.lock()
    }

    /// Serves `data` instead of the stored row text at `position` of every
    /// rows stream. The stored chain link is left alone.
    pub fn rewrite_row(&self, position: u64, data: impl Into<String>) {
        self.rewrites
            .lock()
            .push((LogPosition::new(position), data.into()));
    }

    fn tamper(&self, entry: &mut LedgerEntry) -> CoreResult<()> {
        let rewrites = self.rewrites.lock();
        let Some((_, data)) = rewrites.iter().find(|(p, _)| *p == entry.position) else {
            return Ok(());
        };
        let mut record: RowRecord = from_cbor(&entry.payload)?;
        record.data.clone_from(data);
        entry.payload = to_cbor(&record)?;
        Ok(())
    }

    fn check_read(&self) -> CoreResult<()> {
        if *self.fault.lock() == Fault::RejectReads {
            return Err(CoreError::unavailable("injected read failure"));
        }
        Ok(())
    }
}

impl Ledger for FaultyLedger {
    fn max_transaction_size(&self) -> usize {
        self.inner.max_transaction_size()
    }

    fn submit(&self, tx: Transaction) -> CoreResult<Receipt> {
        *self.submits.lock() += 1;
        {
            let mut fault = self.fault.lock();
            if let Fault::RejectSubmits(remaining) = *fault {
                *fault = if remaining > 1 {
                    Fault::RejectSubmits(remaining - 1)
                } else {
                    Fault::None
                };
                return Err(CoreError::unavailable("injected submit failure"));
            }
        }
        self.inner.submit(tx)
    }

    fn account(&self, address: &Address) -> CoreResult<Option<Account>> {
        self.check_read()?;
        self.inner.account(address)
    }

    fn entries(&self, address: &Address, stream: Stream) -> CoreResult<Vec<LedgerEntry>> {
        self.check_read()?;
        let mut entries = self.inner.entries(address, stream)?;
        if stream == Stream::Rows {
            for entry in &mut entries {
                self.tamper(entry)?;
            }
        }
        Ok(entries)
    }
}
