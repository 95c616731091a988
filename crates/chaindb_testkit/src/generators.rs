//! Property-based test generators using proptest.

use chaindb_codec::Row;
use chaindb_core::Owner;
use proptest::prelude::*;

/// Strategy for owner identities.
pub fn owner_strategy() -> impl Strategy<Value = Owner> {
    prop::array::uniform32(any::<u8>()).prop_map(Owner::from_bytes)
}

/// Strategy for valid table names.
pub fn table_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,15}").expect("Invalid regex")
}

/// Strategy for column values, including characters JSON must escape.
pub fn value_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::string::string_regex("[a-zA-Z0-9 ]{0,12}").expect("Invalid regex"),
        Just("quote \" and \\ backslash".to_string()),
        Just("ünïcödé ✓".to_string()),
    ]
}

/// Strategy for rows over `columns` (any subset, id always present).
pub fn row_strategy(columns: &'static [&'static str]) -> impl Strategy<Value = Row> {
    let id = columns[0];
    (
        0u8..8,
        prop::collection::vec((prop::sample::select(&columns[1..]), value_strategy()), 0..4),
    )
        .prop_map(move |(id_value, pairs)| {
            let mut row: Row = pairs.into_iter().collect();
            row.insert(id, id_value.to_string());
            row
        })
}

/// One step of a generated workload.
#[derive(Debug, Clone)]
pub enum Step {
    /// Append a row.
    Write(Row),
    /// Correct the write at (index modulo current row count).
    Update(prop::sample::Index, Row),
    /// Delete the write at (index modulo current row count).
    Delete(prop::sample::Index),
}

/// Strategy for workloads over `columns`.
pub fn workload_strategy(
    columns: &'static [&'static str],
    len: std::ops::Range<usize>,
) -> impl Strategy<Value = Vec<Step>> {
    let step = prop_oneof![
        3 => row_strategy(columns).prop_map(Step::Write),
        1 => (any::<prop::sample::Index>(), row_strategy(columns))
            .prop_map(|(i, row)| Step::Update(i, row)),
        1 => any::<prop::sample::Index>().prop_map(Step::Delete),
    ];
    prop::collection::vec(step, len)
}
