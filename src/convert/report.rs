//! Conversion run report
//!
//! Non-fatal problems never abort a conversion; they are collected here with
//! enough context to diagnose, next to created-versus-attempted counters.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::import::data::TableImportStats;

/// Maximum number of issues kept verbatim; the count keeps growing past it
pub const MAX_RECORDED_ISSUES: usize = 100;

/// A non-fatal problem encountered during conversion
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ConversionIssue {
    #[error("metadata: {message}")]
    MetadataWarning { message: String },

    #[error("failed to create table {table}: {message}")]
    TableCreateFailed { table: String, message: String },

    #[error("constraint omitted on table {table}: {message}")]
    ConstraintOmitted { table: String, message: String },

    #[error("view {view} skipped: {reason}")]
    ViewSkipped { view: String, reason: String },

    #[error("failed to create view {view}: {message}")]
    ViewCreateFailed { view: String, message: String },

    #[error("table {table} row {row}: cannot convert '{value}' for column {column}")]
    RowCoercionFailed {
        table: String,
        row: usize,
        column: String,
        value: String,
    },

    #[error("table {table} row {row}: insert failed: {message}")]
    RowInsertFailed {
        table: String,
        row: usize,
        message: String,
    },

    #[error("table {table}: batch starting at row {first_row} failed, {lost_rows} rows lost: {message}")]
    BatchInsertFailed {
        table: String,
        first_row: usize,
        lost_rows: usize,
        message: String,
    },

    #[error("no content folder found for schema {schema} (tried {tried:?})")]
    SchemaFolderNotFound { schema: String, tried: Vec<PathBuf> },

    #[error("no data file found for table {table} (tried {tried:?})")]
    DataFileNotFound { table: String, tried: Vec<PathBuf> },

    #[error("cannot read data file {path:?} for table {table}: {message}")]
    DataFileUnreadable {
        table: String,
        path: PathBuf,
        message: String,
    },

    #[error("import of table {table} aborted: {message}")]
    TableImportFailed { table: String, message: String },
}

/// Counters and issues of one conversion run
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionReport {
    pub schemas: usize,
    pub tables_attempted: usize,
    pub tables_created: usize,
    pub views_attempted: usize,
    pub views_created: usize,
    /// Rows found in data documents
    pub rows_read: usize,
    pub rows_inserted: usize,
    /// Per-table import statistics, in import order
    pub tables: Vec<TableImportStats>,
    /// Total number of issues, including those not kept in `issues`
    pub issue_count: usize,
    /// First issues encountered (limited to 100)
    pub issues: Vec<ConversionIssue>,
    #[serde(skip)]
    pub duration: Duration,
}

impl ConversionReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an issue (limited to 100)
    pub fn add_issue(&mut self, issue: ConversionIssue) {
        self.issue_count += 1;
        if self.issues.len() < MAX_RECORDED_ISSUES {
            self.issues.push(issue);
        }
    }

    /// Fold one table's import statistics into the run totals
    pub fn record_table(&mut self, mut stats: TableImportStats) {
        self.rows_read += stats.rows_read;
        self.rows_inserted += stats.rows_inserted;
        let skipped = stats.issue_count - stats.issues.len();
        for issue in stats.issues.drain(..) {
            self.add_issue(issue);
        }
        // issues beyond the per-table cap still count
        self.issue_count += skipped;
        self.tables.push(stats);
    }

    /// Whether every attempted table, view and row made it into the store
    pub fn is_complete(&self) -> bool {
        self.issue_count == 0
            && self.tables_created == self.tables_attempted
            && self.views_created == self.views_attempted
            && self.rows_inserted == self.rows_read
    }

    /// Rows per second
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.rows_inserted as f64 / secs
        }
    }

    /// Format duration as human-readable string
    pub fn duration_string(&self) -> String {
        let secs = self.duration.as_secs();
        if secs < 60 {
            format!("{}s", secs)
        } else if secs < 3600 {
            format!("{}m {}s", secs / 60, secs % 60)
        } else {
            format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
        }
    }

    /// Multi-line human-readable summary
    pub fn summary(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Schemas:  {}\n", self.schemas));
        out.push_str(&format!(
            "Tables:   {} of {} created\n",
            self.tables_created, self.tables_attempted
        ));
        out.push_str(&format!(
            "Views:    {} of {} created\n",
            self.views_created, self.views_attempted
        ));
        out.push_str(&format!(
            "Rows:     {} of {} inserted\n",
            self.rows_inserted, self.rows_read
        ));
        out.push_str(&format!("Issues:   {}\n", self.issue_count));
        out.push_str(&format!(
            "Duration: {} ({:.0} rows/s)",
            self.duration_string(),
            self.throughput()
        ));
        out
    }
}
