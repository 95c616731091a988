//! Account and stream state shared by the ledger implementations.

use super::{tx_ref, Account, LedgerEntry, Operation, Receipt, Stream, Transaction};
use crate::error::{CoreError, CoreResult};
use crate::types::{Address, LogPosition, Slot};
use std::collections::HashMap;

/// Materialized ledger contents.
#[derive(Debug, Default)]
pub(crate) struct LedgerState {
    accounts: HashMap<Address, Account>,
    streams: HashMap<(Address, Stream), Vec<LedgerEntry>>,
    next_slot: Slot,
}

/// Validated effects of one transaction, not yet visible.
#[derive(Debug)]
pub(crate) struct Staged {
    slot: Slot,
    receipt: Receipt,
    accounts: Vec<Account>,
    entries: Vec<LedgerEntry>,
}

impl Staged {
    pub(crate) fn slot(&self) -> Slot {
        self.slot
    }
}

impl LedgerState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Slot the next accepted transaction receives.
    pub(crate) fn next_slot(&self) -> Slot {
        self.next_slot
    }

    /// Checks every operation of `tx` against current state plus the
    /// effects of the operations before it.
    pub(crate) fn stage(&self, slot: Slot, tx: &Transaction, encoded: &[u8]) -> CoreResult<Staged> {
        let tx_ref = tx_ref(slot, encoded);
        let mut accounts: HashMap<Address, Account> = HashMap::new();
        let mut pending: HashMap<(Address, Stream), u64> = HashMap::new();
        let mut entries = Vec::new();
        let mut appended = Vec::new();

        for operation in &tx.operations {
            match operation {
                Operation::CreateAccount { address, data } => {
                    if accounts.contains_key(address) || self.accounts.contains_key(address) {
                        return Err(CoreError::already_exists(format!("account {address}")));
                    }
                    accounts.insert(
                        *address,
                        Account {
                            address: *address,
                            owner: tx.signer,
                            version: 0,
                            data: data.clone(),
                        },
                    );
                }
                Operation::WriteAccount {
                    address,
                    expected_version,
                    data,
                } => {
                    let current = self.lookup(&accounts, address)?;
                    if current.owner != tx.signer {
                        return Err(CoreError::unauthorized(format!("account {address}")));
                    }
                    if current.version != *expected_version {
                        return Err(CoreError::account_in_use(format!(
                            "account {address} is at version {}, expected {expected_version}",
                            current.version
                        )));
                    }
                    let next = Account {
                        version: current.version + 1,
                        data: data.clone(),
                        ..current.clone()
                    };
                    accounts.insert(*address, next);
                }
                Operation::Append {
                    address,
                    stream,
                    expected_position,
                    payload,
                } => {
                    let owner = self.lookup(&accounts, address)?.owner;
                    if owner != tx.signer {
                        return Err(CoreError::unauthorized(format!("account {address}")));
                    }
                    let key = (*address, *stream);
                    let staged = pending.entry(key).or_insert(0);
                    let position = LogPosition::new(self.stream_len(address, *stream) + *staged);
                    if let Some(expected) = expected_position {
                        if *expected != position {
                            return Err(CoreError::account_in_use(format!(
                                "{stream} of {address} ends at {position}, expected {expected}"
                            )));
                        }
                    }
                    *staged += 1;
                    appended.push(position);
                    entries.push(LedgerEntry {
                        tx: tx_ref,
                        slot,
                        address: *address,
                        stream: *stream,
                        position,
                        signer: tx.signer,
                        payload: payload.clone(),
                    });
                }
            }
        }

        Ok(Staged {
            slot,
            receipt: Receipt {
                tx: tx_ref,
                slot,
                appended,
            },
            accounts: accounts.into_values().collect(),
            entries,
        })
    }

    /// Makes staged effects visible.
    pub(crate) fn commit(&mut self, staged: Staged) -> Receipt {
        for account in staged.accounts {
            self.accounts.insert(account.address, account);
        }
        for entry in staged.entries {
            self.streams
                .entry((entry.address, entry.stream))
                .or_default()
                .push(entry);
        }
        self.next_slot = self.next_slot.max(staged.slot.next());
        staged.receipt
    }

    pub(crate) fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    pub(crate) fn entries(&self, address: &Address, stream: Stream) -> &[LedgerEntry] {
        self.streams
            .get(&(*address, stream))
            .map_or(&[], Vec::as_slice)
    }

    pub(crate) fn account_count(&self) -> usize {
        self.accounts.len()
    }

    fn stream_len(&self, address: &Address, stream: Stream) -> u64 {
        self.entries(address, stream).len() as u64
    }

    fn lookup<'a>(
        &'a self,
        staged: &'a HashMap<Address, Account>,
        address: &Address,
    ) -> CoreResult<&'a Account> {
        staged
            .get(address)
            .or_else(|| self.accounts.get(address))
            .ok_or_else(|| CoreError::not_found(format!("account {address}")))
    }
}
