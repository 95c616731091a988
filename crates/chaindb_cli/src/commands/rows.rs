//! Row commands.

use super::{print_json, CliResult, Format, Session};

/// Appends a row.
pub fn write(session: &Session, table: &str, payload: &str) -> CliResult<()> {
    let written = session.db.write_row(table, payload)?;
    println!("{} {} tx {}", table, written.position, written.tx);
    println!("head {}", written.link);
    Ok(())
}

/// Prints raw rows.
pub fn read(
    session: &Session,
    table: &str,
    limit: Option<usize>,
    of: Option<&str>,
    format: Format,
) -> CliResult<()> {
    let owner = session.owner_or(of)?;
    let rows = session.db.read_rows(table, &owner, limit)?;
    match format {
        Format::Json => print_json(&rows)?,
        Format::Text => {
            for entry in &rows {
                println!("{:>6}  {}  {}", entry.position, entry.slot, entry.row);
            }
        }
    }
    Ok(())
}
