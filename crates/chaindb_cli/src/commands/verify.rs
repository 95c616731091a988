//! Verify command implementation.

use super::{print_json, CliError, CliResult, Format, Session};

/// Re-checks a table's hash chain; fails if it diverges.
pub fn run(session: &Session, table: &str, of: Option<&str>, format: Format) -> CliResult<()> {
    let owner = session.owner_or(of)?;
    let report = session.db.verify_table(table, &owner)?;

    match format {
        Format::Json => print_json(&report)?,
        Format::Text => {
            println!("Verifying {table}");
            println!("  Rows:          {}", report.length);
            println!("  Stored head:   {}", report.stored_head);
            println!("  Computed head: {}", report.computed_head);
            if let Some(position) = report.first_divergence {
                println!("  First divergence at {position}");
            }
            println!();
        }
    }

    if report.is_intact() {
        if format == Format::Text {
            println!("✓ Chain verification passed");
        }
        Ok(())
    } else {
        if format == Format::Text {
            println!("✗ Chain verification failed");
        }
        Err(CliError::ChainBroken {
            table: table.to_owned(),
        })
    }
}
