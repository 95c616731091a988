//! ChainDB CLI
//!
//! Command-line access to a file-backed ChainDB ledger.
//!
//! # Commands
//!
//! - `init` - Create the owner's root directory
//! - `tables` - List an owner's tables
//! - `create-table` / `update-table` / `meta` - Manage schemas
//! - `write` / `read` - Append and read raw rows
//! - `correct` / `instructions` - Record and list corrections
//! - `materialize` - Show rows with corrections applied
//! - `verify` - Re-check a table's hash chain

mod commands;

use clap::{Parser, Subcommand};
use commands::{Format, Session};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// ChainDB command-line tools.
#[derive(Parser)]
#[command(name = "chaindb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the ledger directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Owner identity as 64 hex characters
    #[arg(global = true, short, long)]
    owner: Option<String>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the owner's root directory
    Init,

    /// List tables registered under an owner
    Tables {
        /// Owner to list (defaults to --owner)
        #[arg(long)]
        of: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Create a table (or an extension table given as base/row_id/key)
    CreateTable {
        /// Table name
        table: String,

        /// Comma-separated column names
        #[arg(short, long, value_delimiter = ',', required = true)]
        columns: Vec<String>,

        /// Identifier column
        #[arg(short, long)]
        id: String,

        /// Comma-separated extension keys
        #[arg(short, long, value_delimiter = ',')]
        ext_keys: Vec<String>,
    },

    /// Replace a table's schema
    UpdateTable {
        /// Table name
        table: String,

        /// Comma-separated column names
        #[arg(short, long, value_delimiter = ',', required = true)]
        columns: Vec<String>,

        /// New identifier column (keeps the current one if omitted)
        #[arg(short, long)]
        id: Option<String>,

        /// New extension keys (keeps the current ones if omitted)
        #[arg(short, long, value_delimiter = ',')]
        ext_keys: Option<Vec<String>>,
    },

    /// Show a table's schema
    Meta {
        /// Table name
        table: String,

        /// Table owner (defaults to --owner)
        #[arg(long)]
        of: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Append a row given as a JSON object
    Write {
        /// Table name
        table: String,

        /// Row payload, e.g. '{"id":"1","name":"x"}'
        payload: String,
    },

    /// Print raw rows in log order
    Read {
        /// Table name
        table: String,

        /// Only the most recent N rows
        #[arg(short, long)]
        limit: Option<usize>,

        /// Table owner (defaults to --owner)
        #[arg(long)]
        of: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Record an update or delete of an earlier row write
    Correct {
        /// Table name
        table: String,

        /// Target row by log position
        #[arg(long, conflicts_with = "tx", required_unless_present = "tx")]
        position: Option<u64>,

        /// Target row by transaction reference (hex)
        #[arg(long)]
        tx: Option<String>,

        /// What the row held before (advisory)
        #[arg(long, default_value = "")]
        before: String,

        /// Replacement row; omit or pass '{}' to delete
        #[arg(long, default_value = "")]
        after: String,
    },

    /// Print correction records in log order
    Instructions {
        /// Table name
        table: String,

        /// Table owner (defaults to --owner)
        #[arg(long)]
        of: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Print rows with corrections applied
    Materialize {
        /// Table name
        table: String,

        /// Table owner (defaults to --owner)
        #[arg(long)]
        of: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Re-check a table's hash chain
    Verify {
        /// Table name
        table: String,

        /// Table owner (defaults to --owner)
        #[arg(long)]
        of: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Version = cli.command {
        println!("ChainDB CLI v{}", env!("CARGO_PKG_VERSION"));
        println!("ChainDB Core v{}", chaindb_core::VERSION);
        return Ok(());
    }

    let session = Session::open(cli.path.as_deref(), cli.owner.as_deref())?;

    match cli.command {
        Commands::Init => commands::schema::init(&session)?,
        Commands::Tables { of, format } => {
            commands::schema::tables(&session, of.as_deref(), format)?;
        }
        Commands::CreateTable {
            table,
            columns,
            id,
            ext_keys,
        } => commands::schema::create(&session, &table, columns, &id, ext_keys)?,
        Commands::UpdateTable {
            table,
            columns,
            id,
            ext_keys,
        } => commands::schema::update(&session, &table, columns, id.as_deref(), ext_keys)?,
        Commands::Meta { table, of, format } => {
            commands::schema::meta(&session, &table, of.as_deref(), format)?;
        }
        Commands::Write { table, payload } => commands::rows::write(&session, &table, &payload)?,
        Commands::Read {
            table,
            limit,
            of,
            format,
        } => commands::rows::read(&session, &table, limit, of.as_deref(), format)?,
        Commands::Correct {
            table,
            position,
            tx,
            before,
            after,
        } => commands::corrections::correct(
            &session,
            &table,
            position,
            tx.as_deref(),
            &before,
            &after,
        )?,
        Commands::Instructions { table, of, format } => {
            commands::corrections::instructions(&session, &table, of.as_deref(), format)?;
        }
        Commands::Materialize { table, of, format } => {
            commands::corrections::materialize(&session, &table, of.as_deref(), format)?;
        }
        Commands::Verify { table, of, format } => {
            commands::verify::run(&session, &table, of.as_deref(), format)?;
        }
        Commands::Version => {}
    }

    Ok(())
}
