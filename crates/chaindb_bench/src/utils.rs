//! Benchmark utilities.

use chaindb_codec::Row;
use chaindb_core::{Database, Owner};
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Owner every benchmark database is opened for.
pub const BENCH_OWNER: Owner = Owner::from_bytes([0x5a; 32]);

/// Columns of the benchmark table.
pub const COLUMNS: [&str; 3] = ["id", "name", "note"];

/// Random alphanumeric text of `len` characters.
pub fn random_text(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// A row with the given id whose `note` is `note_len` random characters.
pub fn random_row(id: usize, note_len: usize) -> Row {
    Row::from([
        ("id", id.to_string()),
        ("name", random_text(8)),
        ("note", random_text(note_len)),
    ])
}

/// In-memory database with the benchmark table created.
pub fn bench_db() -> Database {
    let db = Database::open_in_memory(BENCH_OWNER);
    db.ensure_root().unwrap();
    db.ensure_table("bench", COLUMNS, "id").unwrap();
    db
}

/// Benchmark database holding `count` rows, with every fourth row updated
/// and every tenth deleted.
pub fn populated_db(count: usize) -> Database {
    let db = bench_db();
    let refs: Vec<_> = (0..count)
        .map(|i| db.write_row_value("bench", random_row(i, 64)).unwrap())
        .collect();
    for (i, written) in refs.iter().enumerate() {
        if i % 10 == 0 {
            db.push_instruction("bench", *written, "", "").unwrap();
        } else if i % 4 == 0 {
            let after = random_row(i, 32).to_canonical_string().unwrap();
            db.push_instruction("bench", *written, "", &after).unwrap();
        }
    }
    db
}
