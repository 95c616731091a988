//! CLI command implementations.

pub mod corrections;
pub mod rows;
pub mod schema;
pub mod verify;

use chaindb_core::{Config, CoreError, Database, Owner};
use clap::ValueEnum;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Errors raised by the CLI itself.
#[derive(Debug, Error)]
pub enum CliError {
    /// No `--path` was given.
    #[error("ledger path required (use --path)")]
    MissingPath,

    /// No `--owner` was given.
    #[error("owner identity required (use --owner with 64 hex characters)")]
    MissingOwner,

    /// Engine error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// JSON output failed.
    #[error("output error: {0}")]
    Json(#[from] serde_json::Error),

    /// A table failed chain verification.
    #[error("hash chain of {table} diverges")]
    ChainBroken {
        /// Table that failed.
        table: String,
    },
}

/// Result type for CLI commands.
pub type CliResult<T> = Result<T, CliError>;

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Human-readable text
    Text,
    /// Pretty-printed JSON
    Json,
}

/// An open database plus the identity the user acts as.
pub struct Session {
    /// Database over the file ledger.
    pub db: Database,
}

impl Session {
    /// Opens the ledger at `path` acting as `owner`.
    pub fn open(path: Option<&Path>, owner: Option<&str>) -> CliResult<Self> {
        let path = path.ok_or(CliError::MissingPath)?;
        let owner = parse_owner(owner.ok_or(CliError::MissingOwner)?)?;
        debug!(path = %path.display(), owner = %owner, "opening ledger");
        let db = Database::open(path, owner, Config::default())?;
        Ok(Self { db })
    }

    /// The owner named by `--of`, or the session owner.
    pub fn owner_or(&self, of: Option<&str>) -> CliResult<Owner> {
        match of {
            Some(hex) => parse_owner(hex),
            None => Ok(*self.db.owner()),
        }
    }
}

/// Parses a hex owner identity.
pub fn parse_owner(hex: &str) -> CliResult<Owner> {
    Ok(Owner::from_hex(hex.trim())?)
}

/// Prints `value` as pretty JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_must_be_hex() {
        assert!(parse_owner(&"ab".repeat(32)).is_ok());
        assert!(matches!(
            parse_owner("not-hex"),
            Err(CliError::Core(CoreError::InvalidPayload { .. }))
        ));
    }

    #[test]
    fn session_requires_path_and_owner() {
        assert!(matches!(
            Session::open(None, Some("00")),
            Err(CliError::MissingPath)
        ));
        assert!(matches!(
            Session::open(Some(Path::new("x")), None),
            Err(CliError::MissingOwner)
        ));
    }

    #[test]
    fn commands_run_against_a_ledger_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger");
        let owner = "01".repeat(32);
        let session = Session::open(Some(path.as_path()), Some(owner.as_str())).unwrap();

        schema::init(&session).unwrap();
        schema::create(
            &session,
            "t",
            vec!["id".into(), "v".into()],
            "id",
            Vec::new(),
        )
        .unwrap();
        rows::write(&session, "t", r#"{"id":"1","v":"x"}"#).unwrap();
        corrections::correct(&session, "t", Some(0), None, "", "").unwrap();
        verify::run(&session, "t", None, Format::Json).unwrap();

        let view = session.db.materialize("t", session.db.owner()).unwrap();
        assert!(view.materialized.is_empty());
        assert!(matches!(
            rows::write(&session, "t", r#"{"id":"2","w":"y"}"#),
            Err(CliError::Core(CoreError::ColumnMismatch { .. }))
        ));
    }
}
