//! File ledger persistence: reopen, torn tails and on-disk tampering.

use chaindb_core::{Config, CoreError, Database, LogPosition};
use chaindb_testkit::prelude::*;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

fn log_path(db: &TestDatabase) -> PathBuf {
    db.path().unwrap().join("ledger.log")
}

/// Replaces `from` with `to` (same length) inside the log and reseals the
/// frame that contains it with a valid checksum.
fn rewrite_in_place(log: &Path, from: &[u8], to: &[u8]) {
    assert_eq!(from.len(), to.len());
    let mut bytes = fs::read(log).unwrap();
    let at = bytes
        .windows(from.len())
        .position(|w| w == from)
        .expect("pattern present in log");
    bytes[at..at + to.len()].copy_from_slice(to);

    let mut offset = 0;
    while offset < bytes.len() {
        let len = u32::from_le_bytes(bytes[offset + 6..offset + 10].try_into().unwrap()) as usize;
        let end = offset + 10 + len;
        if (offset..end).contains(&at) {
            let crc = crc32fast::hash(&bytes[offset..end]);
            bytes[end..end + 4].copy_from_slice(&crc.to_le_bytes());
            break;
        }
        offset = end + 4;
    }
    fs::write(log, bytes).unwrap();
}

#[test]
fn reopen_replays_everything() {
    let db = TestDatabase::file();
    create_orders(&db);
    let first = db.write_row("orders", r#"{"id":"1","item":"pen"}"#).unwrap();
    db.push_instruction("orders", first, "", r#"{"id":"1","item":"pencil"}"#)
        .unwrap();

    let db = db.reopen();
    let view = db.materialize("orders", &TEST_OWNER).unwrap();
    assert_eq!(view.rows.len(), 1);
    assert_eq!(view.rows[0].tx, first.tx);
    assert_eq!(view.instructions.len(), 1);
    assert_eq!(view.materialized[0].get("item"), Some("pencil"));
    assert!(db.verify_table("orders", &TEST_OWNER).unwrap().is_intact());

    let next = db.write_row("orders", r#"{"id":"2"}"#).unwrap();
    assert_eq!(next.position, LogPosition::new(1));
}

#[test]
fn torn_tail_is_dropped_on_open() {
    let db = TestDatabase::file();
    create_orders(&db);
    db.write_row("orders", r#"{"id":"1"}"#).unwrap();
    let log = log_path(&db);
    let intact = fs::metadata(&log).unwrap().len();

    let mut file = OpenOptions::new().append(true).open(&log).unwrap();
    file.write_all(b"CDBL\x01\x00\x40").unwrap();
    drop(file);

    let db = db.reopen();
    assert_eq!(fs::metadata(&log).unwrap().len(), intact);
    assert_eq!(db.read_rows("orders", &TEST_OWNER, None).unwrap().len(), 1);
    db.write_row("orders", r#"{"id":"2"}"#).unwrap();
    assert_eq!(db.read_rows("orders", &TEST_OWNER, None).unwrap().len(), 2);
}

#[test]
fn resealed_tampering_is_caught_by_the_chain() {
    let db = TestDatabase::file();
    create_orders(&db);
    db.write_row("orders", r#"{"id":"1","item":"pen"}"#).unwrap();
    db.write_row("orders", r#"{"id":"2","item":"ink"}"#).unwrap();
    let config = db.config().clone();
    let dir = db.close();
    let path = dir.path().join("ledger");

    rewrite_in_place(&path.join("ledger.log"), br#""pen""#, br#""pan""#);
    let db = Database::open(&path, TEST_OWNER, config).unwrap();

    let rows = db.read_rows("orders", &TEST_OWNER, None).unwrap();
    assert_eq!(rows[0].row.get("item"), Some("pan"));
    let report = db.verify_table("orders", &TEST_OWNER).unwrap();
    assert_eq!(report.first_divergence, Some(LogPosition::new(0)));
    assert_eq!(report.length, 2);
}

#[test]
fn unsealed_tampering_fails_the_checksum() {
    let db = TestDatabase::file();
    create_orders(&db);
    db.write_row("orders", r#"{"id":"1","item":"pen"}"#).unwrap();
    let config = db.config().clone();
    let dir = db.close();
    let path = dir.path().join("ledger");
    let log = path.join("ledger.log");

    let mut bytes = fs::read(&log).unwrap();
    let at = bytes.windows(5).position(|w| w == br#""pen""#).unwrap();
    bytes[at + 1] = b'P';
    fs::write(&log, bytes).unwrap();

    let err = Database::open(&path, TEST_OWNER, config).err().unwrap();
    assert!(matches!(err, CoreError::ChecksumMismatch { .. }));
}

#[test]
fn second_open_is_locked_out() {
    let db = TestDatabase::file();
    let err = Database::open(&db.path().unwrap(), TEST_OWNER, Config::default())
        .err()
        .unwrap();
    assert!(matches!(err, CoreError::LedgerLocked));
}

#[test]
fn missing_directory_needs_create_if_missing() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::default().create_if_missing(false);
    let err = Database::open(&dir.path().join("absent"), TEST_OWNER, config)
        .err()
        .unwrap();
    assert!(matches!(err, CoreError::NotFound { .. }));
}
