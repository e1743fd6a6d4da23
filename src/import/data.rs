//! Streaming data importer
//!
//! Loads one table's data document into the store. Documents up to the
//! streaming threshold are parsed whole and inserted row by row; larger ones
//! are read incrementally and flushed in multi-row batches so memory stays
//! bounded by the batch size.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rusqlite::params_from_iter;
use rusqlite::types::Value;
use serde::Serialize;

use super::rows::{RowStream, coerce_row, collect_rows, extract_row};
use super::xml::{XmlDocument, XmlElement, XmlParseError};
use super::{ImportError, ImportResult};
use crate::convert::report::{ConversionIssue, MAX_RECORDED_ISSUES};
use crate::database::schema::insert_sql;
use crate::database::{ConversionConfig, DatabaseError, SqliteStore};
use crate::models::{SchemaDescriptor, TableDescriptor};

/// Rows between progress log lines
pub const PROGRESS_INTERVAL: usize = 10_000;

/// SQLite's bound-parameter limit per statement
pub const MAX_BOUND_PARAMETERS: usize = 32_766;

/// How a data document is read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ImportStrategy {
    /// Parse into a tree, insert row by row
    WholeDocument,
    /// Stream rows, insert in batches
    Incremental,
}

impl ImportStrategy {
    /// Files strictly larger than `threshold` bytes are streamed
    pub fn for_size(size: u64, threshold: u64) -> Self {
        if size > threshold {
            ImportStrategy::Incremental
        } else {
            ImportStrategy::WholeDocument
        }
    }
}

/// Statistics from importing one table
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableImportStats {
    pub table: String,
    /// Data document the rows came from
    pub source: Option<PathBuf>,
    pub strategy: Option<ImportStrategy>,
    /// Number of `row` elements read
    pub rows_read: usize,
    pub rows_inserted: usize,
    /// Number of issues encountered
    pub issue_count: usize,
    /// List of issues (limited to first 100)
    pub issues: Vec<ConversionIssue>,
    #[serde(skip)]
    pub duration: Duration,
}

impl TableImportStats {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    /// Add an issue (limited to 100)
    pub fn add_issue(&mut self, issue: ConversionIssue) {
        self.issue_count += 1;
        if self.issues.len() < MAX_RECORDED_ISSUES {
            self.issues.push(issue);
        }
    }

    /// Get rows per second throughput
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.rows_inserted as f64 / secs
        }
    }
}

/// Candidate content folders for schema number `position` (1-based)
pub fn schema_folder_candidates(
    content_root: &Path,
    schema: &SchemaDescriptor,
    position: usize,
) -> Vec<PathBuf> {
    vec![
        content_root.join(&schema.content_folder),
        content_root.join(format!("schema{}", position)),
        content_root.join(format!("table{}", position)),
        content_root.join(&schema.name),
    ]
}

/// First existing schema content folder, or every path tried
pub fn find_schema_folder(
    content_root: &Path,
    schema: &SchemaDescriptor,
    position: usize,
) -> Result<PathBuf, Vec<PathBuf>> {
    let candidates = schema_folder_candidates(content_root, schema, position);
    match candidates.iter().find(|p| p.is_dir()) {
        Some(found) => Ok(found.clone()),
        None => Err(candidates),
    }
}

/// Candidate data documents for a table, in priority order
///
/// The metadata folder hint comes first, then the conventional names derived
/// from the table's ordinal position and name.
pub fn data_file_candidates(schema_folder: &Path, table: &TableDescriptor) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(folder) = &table.folder {
        candidates.push(schema_folder.join(folder).join(format!("{}.xml", folder)));
        candidates.push(schema_folder.join(folder));
    }
    let n = table.ordinal_position;
    candidates.push(
        schema_folder
            .join(format!("table{}", n))
            .join(format!("table{}.xml", n)),
    );
    candidates.push(schema_folder.join(format!("table{}.xml", n)));
    candidates.push(schema_folder.join(format!("{}.xml", table.name)));
    candidates.push(
        schema_folder
            .join(&table.name)
            .join(format!("{}.xml", table.name)),
    );
    candidates
}

/// First existing data document for a table, or every path tried
pub fn find_data_file(schema_folder: &Path, table: &TableDescriptor) -> Result<PathBuf, Vec<PathBuf>> {
    let candidates = data_file_candidates(schema_folder, table);
    match candidates.iter().find(|p| p.is_file()) {
        Some(found) => Ok(found.clone()),
        None => Err(candidates),
    }
}

fn query_failed(e: rusqlite::Error) -> DatabaseError {
    DatabaseError::QueryFailed(e.to_string())
}

fn commit_failed(e: rusqlite::Error) -> DatabaseError {
    DatabaseError::TransactionFailed(format!("Commit failed: {}", e))
}

fn malformed(path: &Path, e: XmlParseError) -> ImportError {
    match e {
        XmlParseError::Io(e) => ImportError::IoError(e),
        other => ImportError::DataFileMalformed {
            path: path.to_path_buf(),
            message: other.to_string(),
        },
    }
}

/// Imports table data documents into the store
#[derive(Debug, Clone, Copy)]
pub struct DataImporter {
    batch_size: usize,
    streaming_threshold: u64,
}

impl DataImporter {
    pub fn new(batch_size: usize, streaming_threshold_bytes: u64) -> Self {
        Self {
            batch_size: batch_size.max(1),
            streaming_threshold: streaming_threshold_bytes,
        }
    }

    pub fn from_config(config: &ConversionConfig) -> Self {
        Self::new(config.batch_size(), config.streaming_threshold_bytes())
    }

    /// Locate the table's data document under `schema_folder` and import it
    pub fn import_table(
        &self,
        store: &mut SqliteStore,
        table: &TableDescriptor,
        schema_folder: &Path,
    ) -> TableImportStats {
        match find_data_file(schema_folder, table) {
            Ok(path) => self.import_file(store, table, &path),
            Err(tried) => {
                tracing::warn!(
                    "Data file not found for table {}. Tried: {:?}",
                    table.name,
                    tried
                );
                let mut stats = TableImportStats::new(&table.name);
                stats.add_issue(ConversionIssue::DataFileNotFound {
                    table: table.name.clone(),
                    tried,
                });
                stats
            }
        }
    }

    /// Import one data document, choosing the strategy by file size
    pub fn import_file(
        &self,
        store: &mut SqliteStore,
        table: &TableDescriptor,
        path: &Path,
    ) -> TableImportStats {
        let started = Instant::now();
        let mut stats = TableImportStats::new(&table.name);
        stats.source = Some(path.to_path_buf());

        let result = std::fs::metadata(path)
            .map_err(ImportError::from)
            .and_then(|meta| {
                let strategy = ImportStrategy::for_size(meta.len(), self.streaming_threshold);
                stats.strategy = Some(strategy);
                tracing::info!(
                    "Importing data for table {} from {} ({} bytes, {:?})",
                    table.name,
                    path.display(),
                    meta.len(),
                    strategy
                );
                match strategy {
                    ImportStrategy::WholeDocument => {
                        self.import_whole_document(store, table, path, &mut stats)
                    }
                    ImportStrategy::Incremental => {
                        self.import_incremental(store, table, path, &mut stats)
                    }
                }
            });

        if let Err(e) = result {
            tracing::error!("Error importing data for {}: {}", table.name, e);
            let issue = match e {
                ImportError::DataFileMalformed { message, .. } => {
                    ConversionIssue::DataFileUnreadable {
                        table: table.name.clone(),
                        path: path.to_path_buf(),
                        message,
                    }
                }
                ImportError::IoError(e) => ConversionIssue::DataFileUnreadable {
                    table: table.name.clone(),
                    path: path.to_path_buf(),
                    message: e.to_string(),
                },
                other => ConversionIssue::TableImportFailed {
                    table: table.name.clone(),
                    message: other.to_string(),
                },
            };
            stats.add_issue(issue);
        }

        stats.duration = started.elapsed();
        tracing::info!(
            "Completed import for {}: {} rows ({:.0} rows/s)",
            table.name,
            stats.rows_inserted,
            stats.throughput()
        );
        stats
    }

    /// Extract and coerce one row, recording coercion fallbacks
    fn row_values(
        &self,
        table: &TableDescriptor,
        row: &XmlElement,
        ordinal: usize,
        stats: &mut TableImportStats,
    ) -> Vec<Value> {
        let raw = extract_row(row, table.columns.len());
        let (values, failures) = coerce_row(&table.columns, &raw);
        for failure in failures {
            tracing::warn!(
                "Table {} row {}: could not convert '{}' for column {}",
                table.name,
                ordinal,
                failure.value,
                failure.column
            );
            stats.add_issue(ConversionIssue::RowCoercionFailed {
                table: table.name.clone(),
                row: ordinal,
                column: failure.column,
                value: failure.value,
            });
        }
        values
    }

    fn import_whole_document(
        &self,
        store: &mut SqliteStore,
        table: &TableDescriptor,
        path: &Path,
        stats: &mut TableImportStats,
    ) -> ImportResult<()> {
        let document = XmlDocument::parse_file(path).map_err(|e| malformed(path, e))?;
        let rows = collect_rows(&document.root);
        tracing::debug!("Found {} rows in {}", rows.len(), path.display());

        let sql = insert_sql(table, 1);
        let tx = store.transaction()?;
        {
            let mut stmt = tx.prepare(&sql).map_err(query_failed)?;
            for (index, row) in rows.into_iter().enumerate() {
                let ordinal = index + 1;
                stats.rows_read += 1;
                let values = self.row_values(table, row, ordinal, stats);

                match stmt.execute(params_from_iter(values.iter())) {
                    Ok(_) => {
                        stats.rows_inserted += 1;
                        if stats.rows_inserted % PROGRESS_INTERVAL == 0 {
                            tracing::debug!(
                                "Imported {} rows for {}",
                                stats.rows_inserted,
                                table.name
                            );
                        }
                    }
                    Err(e) => {
                        tracing::error!("Error inserting row {} of {}: {}", ordinal, table.name, e);
                        stats.add_issue(ConversionIssue::RowInsertFailed {
                            table: table.name.clone(),
                            row: ordinal,
                            message: e.to_string(),
                        });
                    }
                }
            }
        }
        tx.commit().map_err(commit_failed)?;
        Ok(())
    }

    fn import_incremental(
        &self,
        store: &mut SqliteStore,
        table: &TableDescriptor,
        path: &Path,
        stats: &mut TableImportStats,
    ) -> ImportResult<()> {
        let stream = RowStream::open(path).map_err(|e| malformed(path, e))?;
        let mut batch: Vec<(usize, Vec<Value>)> = Vec::with_capacity(self.batch_size);

        for (index, row) in stream.enumerate() {
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    // complete rows read so far are kept
                    self.flush(store, table, &mut batch, stats)?;
                    return Err(malformed(path, e));
                }
            };
            let ordinal = index + 1;
            stats.rows_read += 1;
            let values = self.row_values(table, &row, ordinal, stats);
            batch.push((ordinal, values));

            if batch.len() >= self.batch_size {
                self.flush(store, table, &mut batch, stats)?;
            }
        }

        self.flush(store, table, &mut batch, stats)
    }

    /// Insert a batch with multi-row statements inside one transaction
    ///
    /// A failing statement loses the rest of the batch; statements already
    /// executed are committed.
    fn flush(
        &self,
        store: &mut SqliteStore,
        table: &TableDescriptor,
        batch: &mut Vec<(usize, Vec<Value>)>,
        stats: &mut TableImportStats,
    ) -> ImportResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let rows_per_statement = (MAX_BOUND_PARAMETERS / table.columns.len().max(1)).max(1);
        let before = stats.rows_inserted;
        let mut inserted = 0;

        let tx = store.transaction()?;
        for chunk in batch.chunks(rows_per_statement) {
            let sql = insert_sql(table, chunk.len());
            let params = params_from_iter(chunk.iter().flat_map(|(_, values)| values.iter()));
            let result = tx
                .prepare_cached(&sql)
                .and_then(|mut stmt| stmt.execute(params));

            match result {
                Ok(_) => inserted += chunk.len(),
                Err(e) => {
                    let lost_rows = batch.len() - inserted;
                    tracing::error!(
                        "Batch insert into {} failed at row {}, {} rows lost: {}",
                        table.name,
                        chunk[0].0,
                        lost_rows,
                        e
                    );
                    stats.add_issue(ConversionIssue::BatchInsertFailed {
                        table: table.name.clone(),
                        first_row: chunk[0].0,
                        lost_rows,
                        message: e.to_string(),
                    });
                    break;
                }
            }
        }
        tx.commit().map_err(commit_failed)?;

        stats.rows_inserted += inserted;
        if before / PROGRESS_INTERVAL != stats.rows_inserted / PROGRESS_INTERVAL {
            tracing::debug!("Imported {} rows for {}", stats.rows_inserted, table.name);
        }
        batch.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ColumnDescriptor;
    use std::fs;

    fn table() -> TableDescriptor {
        let mut table = TableDescriptor::new("items", 2);
        table.columns = vec![
            ColumnDescriptor::new("id", "INTEGER").with_nullable(false),
            ColumnDescriptor::new("label", "VARCHAR(20)"),
        ];
        table
    }

    #[test]
    fn test_strategy_threshold_is_exclusive() {
        assert_eq!(ImportStrategy::for_size(100, 100), ImportStrategy::WholeDocument);
        assert_eq!(ImportStrategy::for_size(101, 100), ImportStrategy::Incremental);
    }

    #[test]
    fn test_throughput() {
        let mut stats = TableImportStats::new("t");
        assert_eq!(stats.throughput(), 0.0);
        stats.rows_inserted = 500;
        stats.duration = Duration::from_millis(250);
        assert_eq!(stats.throughput(), 2000.0);
    }

    #[test]
    fn test_data_file_candidates_order() {
        let mut table = table();
        table.folder = Some("t2".to_string());
        let folder = Path::new("/c/s");
        let candidates = data_file_candidates(folder, &table);
        assert_eq!(
            candidates,
            vec![
                PathBuf::from("/c/s/t2/t2.xml"),
                PathBuf::from("/c/s/t2"),
                PathBuf::from("/c/s/table2/table2.xml"),
                PathBuf::from("/c/s/table2.xml"),
                PathBuf::from("/c/s/items.xml"),
                PathBuf::from("/c/s/items/items.xml"),
            ]
        );
    }

    #[test]
    fn test_find_data_file_skips_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("table2")).unwrap();
        fs::write(dir.path().join("items.xml"), "<table/>").unwrap();

        let found = find_data_file(dir.path(), &table()).unwrap();
        assert_eq!(found, dir.path().join("items.xml"));

        let empty = tempfile::tempdir().unwrap();
        assert_eq!(find_data_file(empty.path(), &table()).unwrap_err().len(), 4);
    }

    #[test]
    fn test_flush_reports_lost_rows() {
        let mut store = SqliteStore::in_memory().unwrap();
        store
            .execute("CREATE TABLE \"items\" (\"id\" INTEGER NOT NULL, \"label\" TEXT)")
            .unwrap();
        let importer = DataImporter::new(10, 0);
        let mut stats = TableImportStats::new("items");
        let mut batch = vec![
            (1, vec![Value::Integer(1), Value::Text("a".to_string())]),
            (2, vec![Value::Null, Value::Text("b".to_string())]),
        ];

        importer
            .flush(&mut store, &table(), &mut batch, &mut stats)
            .unwrap();

        assert!(batch.is_empty());
        assert_eq!(stats.rows_inserted, 0);
        assert!(matches!(
            stats.issues[0],
            ConversionIssue::BatchInsertFailed { lost_rows: 2, .. }
        ));
        assert_eq!(store.row_count("items").unwrap(), 0);
    }
}
