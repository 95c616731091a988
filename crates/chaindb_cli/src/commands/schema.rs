//! Root and schema commands.

use super::{print_json, CliResult, Format, Session};

/// Creates the owner's root directory.
pub fn init(session: &Session) -> CliResult<()> {
    let root = session.db.ensure_root()?;
    println!("root of {} holds {} table(s)", root.owner, root.tables.len());
    Ok(())
}

/// Lists an owner's tables.
pub fn tables(session: &Session, of: Option<&str>, format: Format) -> CliResult<()> {
    let owner = session.owner_or(of)?;
    let tables = session.db.list_tables(&owner)?;
    match format {
        Format::Json => print_json(&tables)?,
        Format::Text => {
            for name in &tables {
                println!("{name}");
            }
        }
    }
    Ok(())
}

/// Creates a table.
pub fn create(
    session: &Session,
    table: &str,
    columns: Vec<String>,
    id: &str,
    ext_keys: Vec<String>,
) -> CliResult<()> {
    let schema = session.db.create_table(table, columns, id, ext_keys)?;
    println!("created {} ({} columns)", schema.name, schema.columns.len());
    Ok(())
}

/// Replaces a table's schema.
pub fn update(
    session: &Session,
    table: &str,
    columns: Vec<String>,
    id: Option<&str>,
    ext_keys: Option<Vec<String>>,
) -> CliResult<()> {
    let schema = session.db.update_table(table, columns, id, ext_keys)?;
    println!(
        "updated {}: columns [{}], id {}",
        schema.name,
        schema.columns.join(", "),
        schema.id_column
    );
    Ok(())
}

/// Shows a table's schema.
pub fn meta(session: &Session, table: &str, of: Option<&str>, format: Format) -> CliResult<()> {
    let owner = session.owner_or(of)?;
    let schema = session.db.read_table_meta_of(table, &owner)?;
    match format {
        Format::Json => print_json(&schema)?,
        Format::Text => {
            println!("Table:     {}", schema.name);
            println!("Columns:   {}", schema.columns.join(", "));
            println!("Id column: {}", schema.id_column);
            if !schema.extension_keys.is_empty() {
                println!("Ext keys:  {}", schema.extension_keys.join(", "));
            }
        }
    }
    Ok(())
}
