//! SQL query CLI command
//!
//! Runs SQL against a converted database.

use std::path::PathBuf;

use crate::cli::error::CliError;
use crate::database::{OutputFormat, SqliteStore, format_query_result};

/// Query command arguments
#[derive(Debug, Clone)]
pub struct QueryArgs {
    /// Database produced by `convert`
    pub database: PathBuf,
    /// SQL query to execute
    pub sql: String,
    /// Output format
    pub format: String,
}

/// Execute a SQL query against a converted database
pub fn handle_query(args: &QueryArgs) -> Result<(), CliError> {
    if !args.database.is_file() {
        return Err(CliError::FileNotFound(args.database.clone()));
    }

    // Parse output format
    let output_format: OutputFormat = args
        .format
        .parse()
        .map_err(|e: String| CliError::InvalidArgument(e))?;

    let store = SqliteStore::new(&args.database)?;
    let result = store.query(&args.sql)?;

    println!("{}", format_query_result(&result, output_format));

    if output_format == OutputFormat::Table {
        eprintln!("\n{:.1} ms", result.elapsed.as_secs_f64() * 1000.0);
    }
    Ok(())
}
