//! Correction overlay: update and delete instructions.
//!
//! Rows are never rewritten. A correction is a separate record that points
//! at an earlier row write and says what the row should look like now. An
//! `after` payload that is empty (`""` or `{}`) deletes the row.

use crate::error::{CoreError, CoreResult};
use crate::ledger::{Ledger, LedgerEntry, Operation, Stream, Transaction};
use crate::registry::SchemaRegistry;
use crate::rowlog::{parse_payload, RowEntry, RowLog, RowRef};
use crate::table::TableRef;
use crate::types::{Address, LogPosition, Owner, Slot, TxRef};
use chaindb_codec::{from_cbor, to_cbor, Row};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Instructions-stream entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionRecord {
    /// Row-log position of the corrected write.
    pub target: LogPosition,
    /// Transaction of the corrected write.
    pub target_tx: TxRef,
    /// What the caller believed the row held, as given.
    pub before: Option<String>,
    /// Canonical JSON of the replacement; `None` deletes.
    pub after: Option<String>,
}

impl InstructionRecord {
    fn encode(&self) -> CoreResult<Vec<u8>> {
        Ok(to_cbor(self)?)
    }

    fn decode(bytes: &[u8]) -> CoreResult<Self> {
        Ok(from_cbor(bytes)?)
    }
}

/// Row write an instruction corrects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowTarget {
    /// By row-log position.
    Position(LogPosition),
    /// By the transaction that carried the write.
    Transaction(TxRef),
    /// By the handle returned from the write.
    Row(RowRef),
}

impl fmt::Display for RowTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Position(position) => write!(f, "position {position}"),
            Self::Transaction(tx) => write!(f, "transaction {tx}"),
            Self::Row(row) => write!(f, "row {} of {}", row.position, row.table),
        }
    }
}

impl From<LogPosition> for RowTarget {
    fn from(position: LogPosition) -> Self {
        Self::Position(position)
    }
}

impl From<TxRef> for RowTarget {
    fn from(tx: TxRef) -> Self {
        Self::Transaction(tx)
    }
}

impl From<RowRef> for RowTarget {
    fn from(row: RowRef) -> Self {
        Self::Row(row)
    }
}

/// Handle to an accepted instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionRef {
    /// Table address.
    pub table: Address,
    /// Position in the instruction log.
    pub position: LogPosition,
    /// Transaction that carried the instruction.
    pub tx: TxRef,
    /// Row-log position the instruction corrects.
    pub target: LogPosition,
}

/// A stored instruction, as read back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstructionEntry {
    /// Position in the instruction log.
    pub position: LogPosition,
    /// Transaction that carried the instruction.
    pub tx: TxRef,
    /// Global slot of that transaction.
    pub slot: Slot,
    /// Row-log position of the corrected write.
    pub target: LogPosition,
    /// Transaction of the corrected write.
    pub target_tx: TxRef,
    /// Advisory prior state, when the recorded text is a row.
    pub before: Option<Row>,
    /// Advisory prior state exactly as recorded.
    pub before_text: Option<String>,
    /// Replacement row; `None` for a delete.
    pub after: Option<Row>,
}

impl InstructionEntry {
    /// Whether this instruction deletes its target.
    #[must_use]
    pub fn is_delete(&self) -> bool {
        self.after.is_none()
    }
}

/// Parses an optional payload; empty text or an empty object means none.
fn optional_payload(text: &str) -> CoreResult<Option<Row>> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    let row = parse_payload(text)?;
    Ok((!row.is_empty()).then_some(row))
}

/// Appends and reads correction records.
#[derive(Clone)]
pub struct InstructionLog {
    ledger: Arc<dyn Ledger>,
    registry: SchemaRegistry,
    rows: RowLog,
    owner: Owner,
    max_payload_size: usize,
}

impl InstructionLog {
    /// Instruction log writing as `owner`.
    pub fn new(
        ledger: Arc<dyn Ledger>,
        registry: SchemaRegistry,
        rows: RowLog,
        owner: Owner,
        max_payload_size: usize,
    ) -> Self {
        Self {
            ledger,
            registry,
            rows,
            owner,
            max_payload_size,
        }
    }

    /// Records a correction of an earlier write to `table`.
    ///
    /// `before` is stored verbatim and never validated. An empty `after`
    /// records a delete; otherwise `after` must fit the current schema.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the table does not exist
    /// - `TargetNotFound` if `target` is not a write in this table
    /// - `InvalidPayload` for a malformed `after`
    /// - `ColumnMismatch` if `after` has undeclared columns
    /// - `TooLarge` if `after` or the transaction is over its ceiling
    pub fn push_instruction(
        &self,
        table: impl Into<TableRef>,
        target: impl Into<RowTarget>,
        before: &str,
        after: &str,
    ) -> CoreResult<InstructionRef> {
        let table = table.into();
        let target = target.into();
        let loaded = self.registry.load(&self.owner, &table)?;
        let rows = self.rows.records(&loaded.address)?;
        let resolved = resolve(&table, &loaded.address, &rows, target)?;

        let before = before.trim();
        let after = optional_payload(after)?;
        let after = match after {
            Some(row) => {
                loaded.schema().check_row(&row)?;
                let data = row.to_canonical_string()?;
                if data.len() > self.max_payload_size {
                    return Err(CoreError::TooLarge {
                        size: data.len(),
                        limit: self.max_payload_size,
                    });
                }
                Some(data)
            }
            None => None,
        };
        let is_delete = after.is_none();

        let record = InstructionRecord {
            target: resolved.position,
            target_tx: resolved.tx,
            before: (!before.is_empty()).then(|| before.to_owned()),
            after,
        };
        let tx = Transaction::new(self.owner).with(Operation::Append {
            address: loaded.address,
            stream: Stream::Instructions,
            expected_position: None,
            payload: record.encode()?,
        });
        tx.check_size(self.ledger.max_transaction_size())?;

        let receipt = self.ledger.submit(tx)?;
        let position = receipt
            .appended
            .first()
            .copied()
            .ok_or_else(|| CoreError::ledger_corruption("append receipt without a position"))?;
        debug!(
            table = %table,
            target = resolved.position.as_u64(),
            delete = is_delete,
            position = position.as_u64(),
            "pushed instruction"
        );
        Ok(InstructionRef {
            table: loaded.address,
            position,
            tx: receipt.tx,
            target: resolved.position,
        })
    }

    /// Instructions of `owner`'s table in log order.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the table does not exist.
    pub fn list_instructions(
        &self,
        table: impl Into<TableRef>,
        owner: &Owner,
    ) -> CoreResult<Vec<InstructionEntry>> {
        let address = self.registry.load(owner, &table.into())?.address;
        self.records(&address)
    }

    pub(crate) fn records(&self, address: &Address) -> CoreResult<Vec<InstructionEntry>> {
        self.ledger
            .entries(address, Stream::Instructions)?
            .into_iter()
            .map(instruction_entry)
            .collect()
    }
}

fn resolve<'r>(
    table: &TableRef,
    address: &Address,
    rows: &'r [RowEntry],
    target: RowTarget,
) -> CoreResult<&'r RowEntry> {
    let found = match target {
        RowTarget::Position(position) => rows.iter().find(|r| r.position == position),
        RowTarget::Transaction(tx) => rows.iter().find(|r| r.tx == tx),
        RowTarget::Row(row) if row.table == *address => rows
            .iter()
            .find(|r| r.position == row.position && r.tx == row.tx),
        RowTarget::Row(_) => None,
    };
    found.ok_or_else(|| CoreError::TargetNotFound {
        table: table.to_string(),
        target: target.to_string(),
    })
}

fn instruction_entry(entry: LedgerEntry) -> CoreResult<InstructionEntry> {
    let record = InstructionRecord::decode(&entry.payload)?;
    let before = record
        .before
        .as_deref()
        .and_then(|text| Row::parse(text).ok())
        .filter(|row| !row.is_empty());
    Ok(InstructionEntry {
        position: entry.position,
        tx: entry.tx,
        slot: entry.slot,
        target: record.target,
        target_tx: record.target_tx,
        before,
        before_text: record.before,
        after: record.after.map(|text| Row::parse(&text)).transpose()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryLedger;

    struct Fixture {
        owner: Owner,
        rows: RowLog,
        instructions: InstructionLog,
    }

    fn fixture() -> Fixture {
        let ledger: Arc<dyn Ledger> = Arc::new(MemoryLedger::new());
        let owner = Owner::from_bytes([7; 32]);
        let registry = SchemaRegistry::new(Arc::clone(&ledger), owner);
        registry.ensure_root().unwrap();
        for name in ["t", "u"] {
            registry
                .create_table(name, ["id", "v"], "id", Vec::<String>::new())
                .unwrap();
        }
        let rows = RowLog::new(Arc::clone(&ledger), registry.clone(), owner, 900);
        let instructions = InstructionLog::new(ledger, registry, rows.clone(), owner, 900);
        Fixture {
            owner,
            rows,
            instructions,
        }
    }

    #[test]
    fn targets_resolve_by_position_tx_and_ref() {
        let f = fixture();
        let written = f.rows.write_row("t", r#"{"id":"1","v":"a"}"#).unwrap();

        let by_position = f
            .instructions
            .push_instruction("t", LogPosition::new(0), "", r#"{"id":"1","v":"b"}"#)
            .unwrap();
        let by_tx = f
            .instructions
            .push_instruction("t", written.tx, "", "{}")
            .unwrap();
        let by_ref = f.instructions.push_instruction("t", written, "", "").unwrap();

        assert_eq!(by_position.position, LogPosition::new(0));
        assert_eq!(by_tx.position, LogPosition::new(1));
        assert_eq!(by_ref.target, LogPosition::new(0));

        let listed = f.instructions.list_instructions("t", &f.owner).unwrap();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].after.as_ref().and_then(|r| r.get("v")), Some("b"));
        assert!(listed[1].is_delete());
        assert!(listed[2].is_delete());
        assert_eq!(listed[2].target_tx, written.tx);
    }

    #[test]
    fn unknown_and_foreign_targets_are_rejected() {
        let f = fixture();
        let in_t = f.rows.write_row("t", r#"{"id":"1"}"#).unwrap();
        f.rows.write_row("u", r#"{"id":"1"}"#).unwrap();

        assert!(matches!(
            f.instructions.push_instruction("t", LogPosition::new(5), "", ""),
            Err(CoreError::TargetNotFound { .. })
        ));
        assert!(matches!(
            f.instructions.push_instruction("u", in_t, "", ""),
            Err(CoreError::TargetNotFound { .. })
        ));
        assert!(f.instructions.list_instructions("t", &f.owner).unwrap().is_empty());
        assert!(f.instructions.list_instructions("u", &f.owner).unwrap().is_empty());
    }

    #[test]
    fn after_is_validated_and_before_is_advisory() {
        let f = fixture();
        f.rows.write_row("t", r#"{"id":"1","v":"a"}"#).unwrap();

        assert!(matches!(
            f.instructions
                .push_instruction("t", LogPosition::new(0), "", r#"{"id":"1","w":"x"}"#),
            Err(CoreError::ColumnMismatch { .. })
        ));

        // A `before` that is not even a row is kept as text.
        f.instructions
            .push_instruction("t", LogPosition::new(0), " {oops ", "")
            .unwrap();

        // A stale `before` is recorded, not checked.
        let pushed = f
            .instructions
            .push_instruction(
                "t",
                LogPosition::new(0),
                r#"{"id":"1","v":"never"}"#,
                r#"{"id":"1","v":"b"}"#,
            )
            .unwrap();
        let listed = f.instructions.list_instructions("t", &f.owner).unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].is_delete());
        assert_eq!(listed[0].before, None);
        assert_eq!(listed[0].before_text.as_deref(), Some("{oops"));

        assert_eq!(listed[1].position, pushed.position);
        assert_eq!(listed[1].before.as_ref().and_then(|r| r.get("v")), Some("never"));
        assert_eq!(
            listed[1].before_text.as_deref(),
            Some(r#"{"id":"1","v":"never"}"#)
        );
    }
}
