//! Per-table row log and its hash chain.

use crate::address::chain_domain;
use crate::chain::{self, ChainReport};
use crate::error::{CoreError, CoreResult};
use crate::ledger::{Ledger, LedgerEntry, Operation, Stream, Transaction};
use crate::registry::SchemaRegistry;
use crate::table::TableRef;
use crate::types::{Address, HashLink, LogPosition, Owner, Slot, TxRef};
use chaindb_codec::{from_cbor, to_cbor, Row};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Rows-stream entry: the canonical payload and the chain link it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRecord {
    /// Canonical JSON of the row.
    pub data: String,
    /// Chain link after this row.
    pub link: HashLink,
}

impl RowRecord {
    pub(crate) fn encode(&self) -> CoreResult<Vec<u8>> {
        Ok(to_cbor(self)?)
    }

    pub(crate) fn decode(bytes: &[u8]) -> CoreResult<Self> {
        Ok(from_cbor(bytes)?)
    }

    /// Parses the stored payload.
    ///
    /// # Errors
    ///
    /// Returns a codec error if the stored payload is not a row.
    pub fn row(&self) -> CoreResult<Row> {
        Ok(Row::parse(&self.data)?)
    }
}

/// Handle to an accepted row write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowRef {
    /// Address of the table written to.
    pub table: Address,
    /// Position in the table's row log.
    pub position: LogPosition,
    /// Transaction that carried the write.
    pub tx: TxRef,
    /// Chain head after the write.
    pub link: HashLink,
}

/// A stored row, as read back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowEntry {
    /// Position in the row log.
    pub position: LogPosition,
    /// Transaction that carried the write.
    pub tx: TxRef,
    /// Global slot of that transaction.
    pub slot: Slot,
    /// The row.
    pub row: Row,
    /// Chain link stored with the row.
    pub link: HashLink,
}

/// Parses caller-supplied row text.
pub(crate) fn parse_payload(text: &str) -> CoreResult<Row> {
    Row::parse(text).map_err(|e| CoreError::invalid_payload(e.to_string()))
}

/// Appends rows to tables and reads them back.
#[derive(Clone)]
pub struct RowLog {
    ledger: Arc<dyn Ledger>,
    registry: SchemaRegistry,
    owner: Owner,
    max_payload_size: usize,
}

impl RowLog {
    /// Row log writing as `owner`.
    pub fn new(
        ledger: Arc<dyn Ledger>,
        registry: SchemaRegistry,
        owner: Owner,
        max_payload_size: usize,
    ) -> Self {
        Self {
            ledger,
            registry,
            owner,
            max_payload_size,
        }
    }

    /// Parses `payload` and appends it to `table`.
    ///
    /// # Errors
    ///
    /// `InvalidPayload` if `payload` is not a flat JSON object, otherwise
    /// as [`RowLog::write_row_value`].
    pub fn write_row(&self, table: impl Into<TableRef>, payload: &str) -> CoreResult<RowRef> {
        self.write_row_value(table, parse_payload(payload)?)
    }

    /// Appends `row` to `table` and extends the table's chain.
    ///
    /// The append is pinned to the position following the current tail, so
    /// a concurrent writer that got there first makes this call fail
    /// instead of reordering the log.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the table does not exist
    /// - `ColumnMismatch` for undeclared columns
    /// - `TooLarge` if the payload or the transaction is over its ceiling
    /// - `AccountInUse` if another write landed first
    pub fn write_row_value(&self, table: impl Into<TableRef>, row: Row) -> CoreResult<RowRef> {
        let table = table.into();
        let loaded = self.registry.load(&self.owner, &table)?;
        loaded.schema().check_row(&row)?;

        let data = row.to_canonical_string()?;
        if data.len() > self.max_payload_size {
            return Err(CoreError::TooLarge {
                size: data.len(),
                limit: self.max_payload_size,
            });
        }

        let domain = chain_domain(&loaded.address);
        let (position, previous) = match self.ledger.tail(&loaded.address, Stream::Rows)? {
            Some(tail) => (tail.position.next(), RowRecord::decode(&tail.payload)?.link),
            None => (LogPosition::new(0), domain),
        };
        let link = chain::extend(&domain, &previous, data.as_bytes());

        let tx = Transaction::new(self.owner).with(Operation::Append {
            address: loaded.address,
            stream: Stream::Rows,
            expected_position: Some(position),
            payload: RowRecord { data, link }.encode()?,
        });
        tx.check_size(self.ledger.max_transaction_size())?;

        let receipt = self.ledger.submit(tx)?;
        debug!(
            table = %table,
            position = position.as_u64(),
            slot = receipt.slot.as_u64(),
            "wrote row"
        );
        Ok(RowRef {
            table: loaded.address,
            position,
            tx: receipt.tx,
            link,
        })
    }

    /// Raw rows of `owner`'s table in log order, ignoring corrections.
    ///
    /// With `limit`, only the most recent `limit` rows are returned, still
    /// in ascending order.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the table does not exist.
    pub fn read_rows(
        &self,
        table: impl Into<TableRef>,
        owner: &Owner,
        limit: Option<usize>,
    ) -> CoreResult<Vec<RowEntry>> {
        let table = table.into();
        let address = self.registry.load(owner, &table)?.address;
        let mut rows = self.records(&address)?;
        if let Some(limit) = limit {
            let skip = rows.len().saturating_sub(limit);
            rows.drain(..skip);
        }
        Ok(rows)
    }

    /// Replays the stored log of `owner`'s table and checks every stored
    /// link against it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the table does not exist.
    pub fn verify_table(
        &self,
        table: impl Into<TableRef>,
        owner: &Owner,
    ) -> CoreResult<ChainReport> {
        let table = table.into();
        let address = self.registry.load(owner, &table)?.address;
        let domain = chain_domain(&address);

        let records = self
            .ledger
            .entries(&address, Stream::Rows)?
            .iter()
            .map(|entry| RowRecord::decode(&entry.payload))
            .collect::<CoreResult<Vec<_>>>()?;
        let report = chain::audit(
            &domain,
            records.iter().map(|r| (r.data.as_bytes(), r.link)),
        );

        if let Some(position) = report.first_divergence {
            warn!(
                table = %table,
                position = position.as_u64(),
                stored = %report.stored_head,
                computed = %report.computed_head,
                "hash chain diverges"
            );
        }
        Ok(report)
    }

    pub(crate) fn records(&self, address: &Address) -> CoreResult<Vec<RowEntry>> {
        self.ledger
            .entries(address, Stream::Rows)?
            .into_iter()
            .map(row_entry)
            .collect()
    }
}

fn row_entry(entry: LedgerEntry) -> CoreResult<RowEntry> {
    let record = RowRecord::decode(&entry.payload)?;
    Ok(RowEntry {
        position: entry.position,
        tx: entry.tx,
        slot: entry.slot,
        row: record.row()?,
        link: record.link,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryLedger;

    struct Fixture {
        ledger: Arc<MemoryLedger>,
        owner: Owner,
        rows: RowLog,
    }

    fn fixture(max_payload_size: usize) -> Fixture {
        let ledger = Arc::new(MemoryLedger::new());
        let owner = Owner::from_bytes([6; 32]);
        let dyn_ledger: Arc<dyn Ledger> = ledger.clone();
        let registry = SchemaRegistry::new(Arc::clone(&dyn_ledger), owner);
        registry.ensure_root().unwrap();
        registry
            .create_table("t", ["id", "v"], "id", Vec::<String>::new())
            .unwrap();
        Fixture {
            ledger,
            owner,
            rows: RowLog::new(dyn_ledger, registry, owner, max_payload_size),
        }
    }

    #[test]
    fn positions_are_gapless_and_chain_extends() {
        let f = fixture(900);
        let a = f.rows.write_row("t", r#"{"id":"1","v":"a"}"#).unwrap();
        let b = f.rows.write_row("t", r#"{"id":"2","v":"b"}"#).unwrap();
        assert_eq!(a.position, LogPosition::new(0));
        assert_eq!(b.position, LogPosition::new(1));

        let domain = chain_domain(&a.table);
        assert_eq!(
            b.link,
            chain::replay(&domain, [r#"{"id":"1","v":"a"}"#, r#"{"id":"2","v":"b"}"#])
        );

        let rows = f.rows.read_rows("t", &f.owner, None).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].row.get("v"), Some("b"));
        assert_eq!(rows[1].link, b.link);
        assert!(f.rows.verify_table("t", &f.owner).unwrap().is_intact());
    }

    #[test]
    fn limit_keeps_latest_rows_in_order() {
        let f = fixture(900);
        for i in 0..5 {
            f.rows.write_row("t", &format!(r#"{{"id":"{i}"}}"#)).unwrap();
        }
        let rows = f.rows.read_rows("t", &f.owner, Some(2)).unwrap();
        let positions: Vec<u64> = rows.iter().map(|r| r.position.as_u64()).collect();
        assert_eq!(positions, vec![3, 4]);
        assert_eq!(f.rows.read_rows("t", &f.owner, Some(10)).unwrap().len(), 5);
    }

    #[test]
    fn rejected_writes_leave_the_log_untouched() {
        let f = fixture(16);
        assert!(matches!(
            f.rows.write_row("t", r#"{"id":"1","color":"red"}"#),
            Err(CoreError::ColumnMismatch { .. })
        ));
        assert!(matches!(
            f.rows.write_row("t", r#"{"id":"1","v":"far too long for sixteen"}"#),
            Err(CoreError::TooLarge { limit: 16, .. })
        ));
        assert!(matches!(
            f.rows.write_row("t", "not json"),
            Err(CoreError::InvalidPayload { .. })
        ));
        assert!(matches!(
            f.rows.write_row("missing", r#"{"id":"1"}"#),
            Err(CoreError::NotFound { .. })
        ));
        assert!(f.rows.read_rows("t", &f.owner, None).unwrap().is_empty());
    }

    #[test]
    fn transaction_ceiling_applies_before_submission() {
        let f = fixture(usize::MAX);
        let big = "x".repeat(1300);
        let err = f
            .rows
            .write_row("t", &format!(r#"{{"id":"1","v":"{big}"}}"#))
            .unwrap_err();
        assert!(matches!(err, CoreError::TooLarge { limit: 1232, .. }));
        assert!(f.ledger.entries(&crate::address::table_address(&f.owner, "t"), Stream::Rows)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn stale_writer_loses_the_race() {
        let f = fixture(900);
        let address = crate::address::table_address(&f.owner, "t");
        f.rows.write_row("t", r#"{"id":"1"}"#).unwrap();

        // A writer that read the tail before the write above.
        let stale = Transaction::new(f.owner).with(Operation::Append {
            address,
            stream: Stream::Rows,
            expected_position: Some(LogPosition::new(0)),
            payload: RowRecord {
                data: r#"{"id":"2"}"#.into(),
                link: HashLink::from_bytes([0; 32]),
            }
            .encode()
            .unwrap(),
        });
        assert!(matches!(
            f.ledger.submit(stale),
            Err(CoreError::AccountInUse { .. })
        ));
        assert!(f.rows.verify_table("t", &f.owner).unwrap().is_intact());
    }
}
