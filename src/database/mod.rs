//! SQLite target store
//!
//! - `sqlite`: the store handle every conversion phase writes through
//! - `schema`: DDL generation and table/view materialization
//! - `config`: conversion settings (TOML file, environment, CLI flags)
//!
//! Query results are rendered as JSON rows so produced stores can be
//! inspected from the command line.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

pub mod config;
pub mod schema;
pub mod sqlite;

pub use config::ConversionConfig;
pub use schema::SchemaMaterializer;
pub use sqlite::SqliteStore;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// The database file could not be opened or configured
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Begin/commit failed
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// Result type for database operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// One result row, keyed by column name
pub type QueryRow = serde_json::Value;

/// Rows returned by [`SqliteStore::query`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<QueryRow>,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl QueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<QueryRow>) -> Self {
        Self {
            columns,
            rows,
            elapsed: Duration::ZERO,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cells of each row in column order, NULL shown as `NULL`
    fn text_cells(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .map(|column| match row.get(column) {
                        None | Some(serde_json::Value::Null) => "NULL".to_string(),
                        Some(serde_json::Value::String(s)) => s.clone(),
                        Some(other) => other.to_string(),
                    })
                    .collect()
            })
            .collect()
    }
}

/// How `query` prints a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Aligned columns
    #[default]
    Table,
    /// `{"columns": [...], "rows": [...]}`
    Json,
    /// RFC 4180 quoting, NULL as an empty field
    Csv,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Table => "table",
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [OutputFormat::Table, OutputFormat::Json, OutputFormat::Csv]
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown output format '{}' (expected table, json or csv)", s))
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Render a query result in the requested format
pub fn format_query_result(result: &QueryResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(result)
            .unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e)),
        OutputFormat::Csv => render_csv(result),
        OutputFormat::Table => render_table(result),
    }
}

fn csv_escape(row: &QueryRow, column: &str) -> String {
    match row.get(column) {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) if s.contains([',', '"', '\n', '\r']) => {
            format!("\"{}\"", s.replace('"', "\"\""))
        }
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn render_csv(result: &QueryResult) -> String {
    let header = result.columns.join(",");
    let lines = result.rows.iter().map(|row| {
        result
            .columns
            .iter()
            .map(|c| csv_escape(row, c))
            .collect::<Vec<_>>()
            .join(",")
    });
    std::iter::once(header)
        .chain(lines)
        .map(|line| line + "\n")
        .collect()
}

fn render_table(result: &QueryResult) -> String {
    if result.is_empty() {
        return "(no rows)".to_string();
    }

    let cells = result.text_cells();
    let widths: Vec<usize> = result
        .columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            cells
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(column.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |values: &[String]| -> String {
        let padded: Vec<String> = values
            .iter()
            .zip(&widths)
            .map(|(value, width)| format!("{:<width$}", value, width = *width))
            .collect();
        padded.join("  ").trim_end().to_string()
    };
    let rule: Vec<String> = widths.iter().map(|w| "=".repeat(*w)).collect();

    let mut out = vec![line(&result.columns), rule.join("  ")];
    out.extend(cells.iter().map(|row| line(row)));
    out.push(match result.row_count() {
        1 => "1 row".to_string(),
        n => format!("{} rows", n),
    });
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> QueryResult {
        QueryResult::new(
            vec!["id".to_string(), "email".to_string()],
            vec![
                json!({"id": 1, "email": "alice@example.com"}),
                json!({"id": 3, "email": null}),
            ],
        )
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("table".parse::<OutputFormat>(), Ok(OutputFormat::Table));
        assert_eq!(" JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("csv".parse::<OutputFormat>(), Ok(OutputFormat::Csv));
        assert!("xml".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Csv.to_string(), "csv");
    }

    #[test]
    fn test_render_table() {
        let output = render_table(&sample());
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "id  email");
        assert_eq!(lines[1], "==  =================");
        assert_eq!(lines[2], "1   alice@example.com");
        assert_eq!(lines[3], "3   NULL");
        assert_eq!(lines[4], "2 rows");
    }

    #[test]
    fn test_render_empty_table() {
        let result = QueryResult::new(vec!["id".to_string()], Vec::new());
        assert_eq!(render_table(&result), "(no rows)");
    }

    #[test]
    fn test_render_csv() {
        let result = QueryResult::new(
            vec!["name".to_string(), "note".to_string()],
            vec![
                json!({"name": "plain", "note": null}),
                json!({"name": "quoted", "note": "has, \"comma\""}),
            ],
        );
        assert_eq!(
            render_csv(&result),
            "name,note\nplain,\nquoted,\"has, \"\"comma\"\"\"\n"
        );
    }

    #[test]
    fn test_json_output_has_columns_and_rows() {
        let output = format_query_result(&sample(), OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["columns"], json!(["id", "email"]));
        assert_eq!(value["rows"][1]["email"], json!(null));
    }
}
