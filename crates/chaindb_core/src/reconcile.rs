//! Materialized view: raw rows with corrections applied.
//!
//! Folding happens at read time and is never stored. The fold is a pure
//! function of the schema, the row log and the instruction log, so the same
//! inputs always give the same view.

use crate::instruction::InstructionEntry;
use crate::rowlog::RowEntry;
use crate::schema::TableSchema;
use crate::types::LogPosition;
use chaindb_codec::Row;
use serde::Serialize;
use std::collections::HashMap;

/// Identity of a logical row during the fold.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RowKey {
    /// Value of the id column.
    Id(String),
    /// Rows without an id value are keyed by their log position.
    Position(u64),
}

impl RowKey {
    fn of(schema: &TableSchema, row: &Row, position: LogPosition) -> Self {
        schema
            .row_id(row)
            .map_or(Self::Position(position.as_u64()), |id| Self::Id(id.to_owned()))
    }
}

/// Raw logs together with the view folded from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Materialized {
    /// Row log in order.
    pub rows: Vec<RowEntry>,
    /// Instruction log in order.
    pub instructions: Vec<InstructionEntry>,
    /// Surviving rows in first-seen order.
    pub materialized: Vec<Row>,
}

/// Ordered keyed view under construction.
#[derive(Default)]
struct View {
    slots: Vec<Option<(RowKey, Row)>>,
    index: HashMap<RowKey, usize>,
}

impl View {
    fn upsert(&mut self, key: RowKey, row: Row) {
        match self.index.get(&key) {
            Some(&slot) => self.slots[slot] = Some((key, row)),
            None => self.push(key, row),
        }
    }

    fn push(&mut self, key: RowKey, row: Row) {
        self.index.insert(key.clone(), self.slots.len());
        self.slots.push(Some((key, row)));
    }

    fn place(&mut self, slot: Option<usize>, key: RowKey, row: Row) {
        match slot {
            Some(slot) => {
                self.index.insert(key.clone(), slot);
                self.slots[slot] = Some((key, row));
            }
            None => self.push(key, row),
        }
    }

    fn remove(&mut self, key: &RowKey) -> Option<usize> {
        let slot = self.index.remove(key)?;
        self.slots[slot] = None;
        Some(slot)
    }

    fn into_rows(self) -> Vec<Row> {
        self.slots.into_iter().flatten().map(|(_, row)| row).collect()
    }
}

/// Key each raw write currently answers to.
///
/// `None` marks a write whose logical row was taken over by another row's
/// re-keying update; corrections aimed at it no longer reach anything
/// until an update gives it a key again.
type Owners = HashMap<LogPosition, Option<RowKey>>;

fn retarget(owners: &mut Owners, from: &RowKey, to: Option<&RowKey>) {
    for key in owners.values_mut() {
        if key.as_ref() == Some(from) {
            *key = to.cloned();
        }
    }
}

/// Folds `instructions` onto `rows`.
///
/// 1. Raw rows are keyed by their id value (or position when they lack
///    one). A later row with a known key replaces the earlier value in
///    place, and both writes then answer to that key.
/// 2. Instructions are applied in log order. An update replaces the
///    target's entry, moving it to the id carried by `after` if that
///    differs; if the entry was already deleted it is re-inserted at the
///    end. A row whose id is claimed this way is dropped, and its writes
///    are detached. A delete removes the target's entry.
///
/// Instructions whose target is not in `rows` are skipped.
#[must_use]
pub fn materialize(
    schema: &TableSchema,
    rows: &[RowEntry],
    instructions: &[InstructionEntry],
) -> Vec<Row> {
    let mut view = View::default();
    let mut owners: Owners = HashMap::with_capacity(rows.len());

    for entry in rows {
        let key = RowKey::of(schema, &entry.row, entry.position);
        owners.insert(entry.position, Some(key.clone()));
        view.upsert(key, entry.row.clone());
    }

    for instruction in instructions {
        let Some(current) = owners.get(&instruction.target).cloned() else {
            continue;
        };
        match &instruction.after {
            Some(after) => {
                let new_key = match (schema.row_id(after), &current) {
                    (Some(id), _) => RowKey::Id(id.to_owned()),
                    (None, Some(key)) => key.clone(),
                    (None, None) => RowKey::Position(instruction.target.as_u64()),
                };
                let slot = current.as_ref().and_then(|key| view.remove(key));
                if current.as_ref() != Some(&new_key) {
                    // The corrected row takes over the identity it now claims.
                    view.remove(&new_key);
                    retarget(&mut owners, &new_key, None);
                    if let Some(key) = &current {
                        retarget(&mut owners, key, Some(&new_key));
                    }
                }
                owners.insert(instruction.target, Some(new_key.clone()));
                view.place(slot, new_key, after.clone());
            }
            None => {
                if let Some(key) = &current {
                    view.remove(key);
                }
            }
        }
    }

    view.into_rows()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HashLink, Slot, TxRef};
    use proptest::prelude::*;

    fn schema() -> TableSchema {
        TableSchema::new("t", ["id", "v"], "id", Vec::<String>::new()).unwrap()
    }

    fn rows(payloads: &[&str]) -> Vec<RowEntry> {
        payloads
            .iter()
            .enumerate()
            .map(|(i, p)| RowEntry {
                position: LogPosition::new(i as u64),
                tx: TxRef::from_bytes([i as u8; 32]),
                slot: Slot(i as u64),
                row: Row::parse(p).unwrap(),
                link: HashLink::from_bytes([0; 32]),
            })
            .collect()
    }

    fn instr(position: u64, target: u64, after: Option<&str>) -> InstructionEntry {
        InstructionEntry {
            position: LogPosition::new(position),
            tx: TxRef::from_bytes([0xee; 32]),
            slot: Slot(100 + position),
            target: LogPosition::new(target),
            target_tx: TxRef::from_bytes([target as u8; 32]),
            before: None,
            before_text: None,
            after: after.map(|a| Row::parse(a).unwrap()),
        }
    }

    fn ids(view: &[Row]) -> Vec<(&str, &str)> {
        view.iter()
            .map(|r| (r.get("id").unwrap_or("-"), r.get("v").unwrap_or("-")))
            .collect()
    }

    #[test]
    fn no_instructions_gives_raw_rows() {
        let raw = rows(&[r#"{"id":"1","v":"a"}"#, r#"{"id":"2","v":"b"}"#]);
        let view = materialize(&schema(), &raw, &[]);
        assert_eq!(ids(&view), vec![("1", "a"), ("2", "b")]);
    }

    #[test]
    fn later_raw_row_replaces_in_place() {
        let raw = rows(&[
            r#"{"id":"1","v":"a"}"#,
            r#"{"id":"2","v":"b"}"#,
            r#"{"id":"1","v":"c"}"#,
        ]);
        let view = materialize(&schema(), &raw, &[]);
        assert_eq!(ids(&view), vec![("1", "c"), ("2", "b")]);
    }

    #[test]
    fn update_then_delete() {
        let raw = rows(&[r#"{"id":"1","v":"a"}"#, r#"{"id":"2","v":"b"}"#]);
        let updated = materialize(&schema(), &raw, &[instr(0, 0, Some(r#"{"id":"1","v":"z"}"#))]);
        assert_eq!(ids(&updated), vec![("1", "z"), ("2", "b")]);

        let deleted = materialize(
            &schema(),
            &raw,
            &[instr(0, 0, Some(r#"{"id":"1","v":"z"}"#)), instr(1, 1, None)],
        );
        assert_eq!(ids(&deleted), vec![("1", "z")]);
    }

    #[test]
    fn instruction_order_matters() {
        let raw = rows(&[r#"{"id":"1","v":"a"}"#]);
        let update = |pos| instr(pos, 0, Some(r#"{"id":"1","v":"z"}"#));

        let update_then_delete = materialize(&schema(), &raw, &[update(0), instr(1, 0, None)]);
        assert!(update_then_delete.is_empty());

        let delete_then_update = materialize(&schema(), &raw, &[instr(0, 0, None), update(1)]);
        assert_eq!(ids(&delete_then_update), vec![("1", "z")]);
    }

    #[test]
    fn reinsert_after_delete_goes_last() {
        let raw = rows(&[r#"{"id":"1","v":"a"}"#, r#"{"id":"2","v":"b"}"#]);
        let view = materialize(
            &schema(),
            &raw,
            &[instr(0, 0, None), instr(1, 0, Some(r#"{"id":"1","v":"back"}"#))],
        );
        assert_eq!(ids(&view), vec![("2", "b"), ("1", "back")]);
    }

    #[test]
    fn rekeying_update_follows_the_row() {
        let raw = rows(&[r#"{"id":"1","v":"a"}"#, r#"{"id":"2","v":"b"}"#]);
        let view = materialize(
            &schema(),
            &raw,
            &[
                instr(0, 0, Some(r#"{"id":"9","v":"a"}"#)),
                instr(1, 0, Some(r#"{"id":"9","v":"a2"}"#)),
            ],
        );
        assert_eq!(ids(&view), vec![("9", "a2"), ("2", "b")]);

        let deleted = materialize(
            &schema(),
            &raw,
            &[instr(0, 0, Some(r#"{"id":"9","v":"a"}"#)), instr(1, 0, None)],
        );
        assert_eq!(ids(&deleted), vec![("2", "b")]);
    }

    #[test]
    fn delete_of_absorbed_row_leaves_survivor() {
        let raw = rows(&[r#"{"id":"a","v":"1"}"#, r#"{"id":"b","v":"2"}"#]);
        let view = materialize(
            &schema(),
            &raw,
            &[
                instr(0, 0, Some(r#"{"id":"b","v":"9"}"#)),
                instr(1, 0, Some(r#"{"id":"a","v":"10"}"#)),
                instr(2, 1, None),
            ],
        );
        assert_eq!(ids(&view), vec![("a", "10")]);
    }

    #[test]
    fn absorbed_write_can_be_revived() {
        let raw = rows(&[r#"{"id":"a","v":"1"}"#, r#"{"id":"b","v":"2"}"#]);
        let view = materialize(
            &schema(),
            &raw,
            &[
                instr(0, 0, Some(r#"{"id":"b","v":"9"}"#)),
                instr(1, 1, Some(r#"{"id":"c","v":"3"}"#)),
            ],
        );
        assert_eq!(ids(&view), vec![("b", "9"), ("c", "3")]);
    }

    #[test]
    fn duplicate_raw_writes_move_together() {
        let raw = rows(&[
            r#"{"id":"1","v":"a"}"#,
            r#"{"id":"2","v":"b"}"#,
            r#"{"id":"1","v":"c"}"#,
        ]);
        let view = materialize(
            &schema(),
            &raw,
            &[instr(0, 0, Some(r#"{"id":"5","v":"d"}"#)), instr(1, 2, None)],
        );
        assert_eq!(ids(&view), vec![("2", "b")]);
    }

    #[test]
    fn rows_without_id_are_keyed_by_position() {
        let raw = rows(&[r#"{"v":"a"}"#, r#"{"v":"b"}"#]);
        let view = materialize(&schema(), &raw, &[instr(0, 1, None)]);
        assert_eq!(ids(&view), vec![("-", "a")]);
    }

    #[test]
    fn unknown_targets_are_skipped() {
        let raw = rows(&[r#"{"id":"1","v":"a"}"#]);
        let view = materialize(&schema(), &raw, &[instr(0, 7, None)]);
        assert_eq!(ids(&view), vec![("1", "a")]);
    }

    proptest! {
        #[test]
        fn fold_is_deterministic(
            values in prop::collection::vec((0u8..4, "[a-c]{1,3}"), 1..10),
            ops in prop::collection::vec(
                (any::<prop::sample::Index>(), prop::option::of((0u8..4, "[x-z]{1,2}"))),
                0..10,
            ),
        ) {
            let payloads: Vec<String> = values
                .iter()
                .map(|(id, v)| format!(r#"{{"id":"{id}","v":"{v}"}}"#))
                .collect();
            let refs: Vec<&str> = payloads.iter().map(String::as_str).collect();
            let raw = rows(&refs);

            let instructions: Vec<InstructionEntry> = ops
                .iter()
                .enumerate()
                .map(|(i, (target, after))| {
                    let after = after
                        .as_ref()
                        .map(|(id, v)| format!(r#"{{"id":"{id}","v":"{v}"}}"#));
                    instr(i as u64, target.index(raw.len()) as u64, after.as_deref())
                })
                .collect();

            let first = materialize(&schema(), &raw, &instructions);
            let second = materialize(&schema(), &raw, &instructions);
            prop_assert_eq!(&first, &second);

            let mut seen = std::collections::HashSet::new();
            for row in &first {
                prop_assert!(seen.insert(row.get("id").map(str::to_owned)));
            }
        }
    }
}
