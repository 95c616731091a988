//! In-process ledger.

use super::state::LedgerState;
use super::{Account, Ledger, LedgerEntry, Receipt, Stream, Transaction};
use crate::config::DEFAULT_MAX_TRANSACTION_SIZE;
use crate::error::CoreResult;
use crate::types::Address;
use parking_lot::RwLock;

/// A ledger held entirely in memory.
///
/// Transactions are applied under a write lock; reads share a read lock
/// and always observe every acknowledged transaction.
#[derive(Debug)]
pub struct MemoryLedger {
    state: RwLock<LedgerState>,
    max_transaction_size: usize,
}

impl MemoryLedger {
    /// Creates an empty ledger with the default transaction ceiling.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_transaction_size(DEFAULT_MAX_TRANSACTION_SIZE)
    }

    /// Creates an empty ledger with a custom transaction ceiling.
    #[must_use]
    pub fn with_max_transaction_size(limit: usize) -> Self {
        Self {
            state: RwLock::new(LedgerState::new()),
            max_transaction_size: limit,
        }
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger for MemoryLedger {
    fn max_transaction_size(&self) -> usize {
        self.max_transaction_size
    }

    fn submit(&self, tx: Transaction) -> CoreResult<Receipt> {
        let encoded = tx.check_size(self.max_transaction_size)?;
        let mut state = self.state.write();
        let staged = state.stage(state.next_slot(), &tx, &encoded)?;
        Ok(state.commit(staged))
    }

    fn account(&self, address: &Address) -> CoreResult<Option<Account>> {
        Ok(self.state.read().account(address).cloned())
    }

    fn entries(&self, address: &Address, stream: Stream) -> CoreResult<Vec<LedgerEntry>> {
        Ok(self.state.read().entries(address, stream).to_vec())
    }

    fn tail(&self, address: &Address, stream: Stream) -> CoreResult<Option<LedgerEntry>> {
        Ok(self.state.read().entries(address, stream).last().cloned())
    }
}
