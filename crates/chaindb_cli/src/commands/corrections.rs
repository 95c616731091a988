//! Correction and materialized-view commands.

use super::{print_json, CliResult, Format, Session};
use chaindb_core::{LogPosition, RowTarget, TxRef};

/// Records an update or delete.
pub fn correct(
    session: &Session,
    table: &str,
    position: Option<u64>,
    tx: Option<&str>,
    before: &str,
    after: &str,
) -> CliResult<()> {
    let target = match (position, tx) {
        (Some(position), _) => RowTarget::Position(LogPosition::new(position)),
        (None, Some(tx)) => RowTarget::Transaction(TxRef::from_hex(tx.trim())?),
        // clap requires one of the two
        (None, None) => RowTarget::Position(LogPosition::new(0)),
    };
    let pushed = session.db.push_instruction(table, target, before, after)?;
    println!(
        "instruction {} targets row {} (tx {})",
        pushed.position, pushed.target, pushed.tx
    );
    Ok(())
}

/// Prints correction records.
pub fn instructions(
    session: &Session,
    table: &str,
    of: Option<&str>,
    format: Format,
) -> CliResult<()> {
    let owner = session.owner_or(of)?;
    let instructions = session.db.list_instructions(table, &owner)?;
    match format {
        Format::Json => print_json(&instructions)?,
        Format::Text => {
            for entry in &instructions {
                match &entry.after {
                    Some(after) => {
                        println!("{:>6}  update {}  {}", entry.position, entry.target, after);
                    }
                    None => println!("{:>6}  delete {}", entry.position, entry.target),
                }
            }
        }
    }
    Ok(())
}

/// Prints the materialized view.
pub fn materialize(
    session: &Session,
    table: &str,
    of: Option<&str>,
    format: Format,
) -> CliResult<()> {
    let owner = session.owner_or(of)?;
    let view = session.db.materialize(table, &owner)?;
    match format {
        Format::Json => print_json(&view)?,
        Format::Text => {
            for row in &view.materialized {
                println!("{row}");
            }
            eprintln!(
                "{} row(s) from {} write(s) and {} instruction(s)",
                view.materialized.len(),
                view.rows.len(),
                view.instructions.len()
            );
        }
    }
    Ok(())
}
