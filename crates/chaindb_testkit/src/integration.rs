//! Model-checking harness.
//!
//! Drives a [`Database`] table and keeps a plain record of every accepted
//! write and correction. The expected view is recomputed from that record
//! with straightforward list scans, then compared against the engine.

use crate::generators::Step;
use chaindb_codec::Row;
use chaindb_core::{Database, Owner, RowRef, TableSchema};

/// A correction as the model remembers it.
#[derive(Debug, Clone)]
enum Correction {
    Update { write: usize, after: Row },
    Delete { write: usize },
}

/// Tracks writes and corrections against one table and predicts the view.
///
/// Rows fed to the harness must carry the table's id column.
pub struct IntegrationHarness<'a> {
    db: &'a Database,
    owner: Owner,
    table: String,
    schema: TableSchema,
    writes: Vec<(RowRef, Row)>,
    corrections: Vec<Correction>,
}

impl<'a> IntegrationHarness<'a> {
    /// Harness over an existing table owned by `db`'s owner.
    pub fn new(db: &'a Database, table: &str) -> Self {
        let schema = db.read_table_meta(table).expect("table must exist");
        Self {
            db,
            owner: *db.owner(),
            table: table.to_owned(),
            schema,
            writes: Vec::new(),
            corrections: Vec::new(),
        }
    }

    /// Number of accepted writes.
    pub fn write_count(&self) -> usize {
        self.writes.len()
    }

    /// Writes `row`.
    pub fn write(&mut self, row: Row) -> RowRef {
        let written = self
            .db
            .write_row_value(self.table.as_str(), row.clone())
            .expect("write_row failed");
        self.writes.push((written, row));
        written
    }

    /// Replaces the row written at `index` with `after`.
    pub fn update(&mut self, index: usize, after: Row) {
        let payload = after.to_canonical_string().expect("canonical row");
        self.db
            .push_instruction(self.table.as_str(), self.writes[index].0, "", &payload)
            .expect("update failed");
        self.corrections.push(Correction::Update { write: index, after });
    }

    /// Deletes the row written at `index`.
    pub fn delete(&mut self, index: usize) {
        self.db
            .push_instruction(self.table.as_str(), self.writes[index].0, "", "")
            .expect("delete failed");
        self.corrections.push(Correction::Delete { write: index });
    }

    /// Applies a generated step. Corrections are ignored until a row exists.
    pub fn apply(&mut self, step: &Step) {
        match step {
            Step::Write(row) => {
                self.write(row.clone());
            }
            Step::Update(index, row) if !self.writes.is_empty() => {
                let index = index.index(self.writes.len());
                self.update(index, row.clone());
            }
            Step::Delete(index) if !self.writes.is_empty() => {
                let index = index.index(self.writes.len());
                self.delete(index);
            }
            Step::Update(..) | Step::Delete(_) => {}
        }
    }

    fn id_of(&self, row: &Row) -> String {
        row.get(&self.schema.id_column)
            .expect("harness rows carry the id column")
            .to_owned()
    }

    /// The view the model predicts.
    pub fn expected(&self) -> Vec<Row> {
        let mut view: Vec<Option<(String, Row)>> = Vec::new();
        let find = |view: &Vec<Option<(String, Row)>>, key: &str| {
            view.iter()
                .position(|e| e.as_ref().is_some_and(|(k, _)| k == key))
        };

        for (_, row) in &self.writes {
            let key = self.id_of(row);
            match find(&view, &key) {
                Some(i) => view[i] = Some((key, row.clone())),
                None => view.push(Some((key, row.clone()))),
            }
        }

        // Key each write currently answers to; None once another row took
        // its key over.
        let mut owners: Vec<Option<String>> =
            self.writes.iter().map(|(_, row)| Some(self.id_of(row))).collect();

        for correction in &self.corrections {
            match correction {
                Correction::Update { write, after } => {
                    let current = owners[*write].clone();
                    let new_key = self.id_of(after);
                    let slot = current.as_deref().and_then(|key| find(&view, key));
                    if let Some(i) = slot {
                        view[i] = None;
                    }
                    if current.as_deref() != Some(new_key.as_str()) {
                        if let Some(i) = find(&view, &new_key) {
                            view[i] = None;
                        }
                        for owner in &mut owners {
                            if owner.as_deref() == Some(new_key.as_str()) {
                                *owner = None;
                            } else if owner.is_some() && *owner == current {
                                *owner = Some(new_key.clone());
                            }
                        }
                    }
                    owners[*write] = Some(new_key.clone());
                    let entry = Some((new_key, after.clone()));
                    match slot {
                        Some(i) => view[i] = entry,
                        None => view.push(entry),
                    }
                }
                Correction::Delete { write } => {
                    if let Some(i) = owners[*write].as_deref().and_then(|key| find(&view, key)) {
                        view[i] = None;
                    }
                }
            }
        }

        view.into_iter().flatten().map(|(_, row)| row).collect()
    }

    /// Asserts that the database agrees with the model.
    pub fn verify(&self) {
        let view = self
            .db
            .materialize(self.table.as_str(), &self.owner)
            .expect("materialize failed");
        assert_eq!(view.materialized, self.expected(), "materialized view mismatch");

        assert_eq!(view.rows.len(), self.writes.len(), "row count mismatch");
        for (entry, (written, row)) in view.rows.iter().zip(&self.writes) {
            assert_eq!(entry.position, written.position, "positions must be gapless");
            assert_eq!(&entry.row, row, "raw rows must never change");
            assert_eq!(entry.link, written.link);
        }
        assert_eq!(view.instructions.len(), self.corrections.len());

        let report = self
            .db
            .verify_table(self.table.as_str(), &self.owner)
            .expect("verify failed");
        assert!(report.is_intact(), "chain must stay intact");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::TestDatabase;

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs.iter().map(|(k, v)| (*k, (*v).to_string())).collect()
    }

    #[test]
    fn model_follows_rekeying_update() {
        let db = TestDatabase::memory();
        db.ensure_table("t", ["id", "v"], "id").unwrap();
        let mut harness = IntegrationHarness::new(&db, "t");
        harness.write(row(&[("id", "1"), ("v", "a")]));
        harness.write(row(&[("id", "2"), ("v", "b")]));
        harness.update(0, row(&[("id", "2"), ("v", "c")]));
        assert_eq!(harness.expected(), vec![row(&[("id", "2"), ("v", "c")])]);
        harness.verify();
    }

    #[test]
    fn model_ignores_deletes_of_absorbed_rows() {
        let db = TestDatabase::memory();
        db.ensure_table("t", ["id", "v"], "id").unwrap();
        let mut harness = IntegrationHarness::new(&db, "t");
        harness.write(row(&[("id", "a"), ("v", "1")]));
        harness.write(row(&[("id", "b"), ("v", "2")]));
        harness.update(0, row(&[("id", "b"), ("v", "9")]));
        harness.update(0, row(&[("id", "a"), ("v", "10")]));
        harness.delete(1);
        assert_eq!(harness.expected(), vec![row(&[("id", "a"), ("v", "10")])]);
        harness.verify();
    }

    #[test]
    fn model_deletes_then_reinserts() {
        let db = TestDatabase::memory();
        db.ensure_table("t", ["id", "v"], "id").unwrap();
        let mut harness = IntegrationHarness::new(&db, "t");
        harness.write(row(&[("id", "1")]));
        harness.write(row(&[("id", "2")]));
        harness.delete(0);
        harness.update(0, row(&[("id", "1"), ("v", "back")]));
        assert_eq!(
            harness.expected(),
            vec![row(&[("id", "2")]), row(&[("id", "1"), ("v", "back")])]
        );
        harness.verify();
        assert_eq!(harness.write_count(), 2);
    }
}
