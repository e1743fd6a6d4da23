//! Conversion pipeline
//!
//! Drives one run: metadata first, then tables, then views, then the table
//! data, all from the same descriptor tree.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tempfile::TempPath;

use crate::database::{ConversionConfig, DatabaseError, SchemaMaterializer, SqliteStore};
use crate::import::data::find_schema_folder;
use crate::import::{DataImporter, ImportError, METADATA_PATH, MetadataParser};
use crate::models::SchemaDescriptor;

pub mod archive;
pub mod report;
pub mod view_query;

pub use archive::{ExtractedArchive, extract_archive, list_entries, read_entry};
pub use report::{ConversionIssue, ConversionReport};
pub use view_query::translate;

/// Folder holding the schema content folders
pub const CONTENT_DIR: &str = "content";

/// Fatal conversion errors
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Runs the conversion phases against one store
#[derive(Debug, Clone, Default)]
pub struct Converter {
    config: ConversionConfig,
}

impl Converter {
    pub fn new(config: ConversionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Convert an extracted archive tree into `store`
    ///
    /// Only a missing or unreadable metadata document and store-level
    /// failures are fatal. Everything else is recorded in the report.
    pub fn convert(
        &self,
        archive_root: &Path,
        store: &mut SqliteStore,
    ) -> Result<ConversionReport, ConversionError> {
        let started = Instant::now();
        let mut report = ConversionReport::new();

        let mut parser = MetadataParser::new();
        let schemas = parser.parse_file(&archive_root.join(METADATA_PATH))?;
        for warning in parser.warnings() {
            report.add_issue(ConversionIssue::MetadataWarning {
                message: warning.clone(),
            });
        }
        report.schemas = schemas.len();
        tracing::info!("Parsed metadata: {} schemas", schemas.len());

        let materializer = SchemaMaterializer::from_config(&self.config);
        let created = materializer.create_tables(store, &schemas, &mut report)?;
        materializer.create_views(store, &schemas, &mut report)?;

        self.import_data(archive_root, store, &schemas, &created, &mut report)?;

        report.duration = started.elapsed();
        tracing::info!(
            "Conversion finished in {}: {} of {} rows inserted, {} issues",
            report.duration_string(),
            report.rows_inserted,
            report.rows_read,
            report.issue_count
        );
        Ok(report)
    }

    fn import_data(
        &self,
        archive_root: &Path,
        store: &mut SqliteStore,
        schemas: &[SchemaDescriptor],
        created: &HashSet<(usize, usize)>,
        report: &mut ConversionReport,
    ) -> Result<(), ConversionError> {
        let importer = DataImporter::from_config(&self.config);
        let content_root = archive_root.join(CONTENT_DIR);

        for (index, schema) in schemas.iter().enumerate() {
            tracing::info!("Processing schema: {}", schema.name);
            let folder = match find_schema_folder(&content_root, schema, index + 1) {
                Ok(folder) => folder,
                Err(tried) => {
                    tracing::warn!(
                        "Content folder not found for schema {}. Tried: {:?}",
                        schema.name,
                        tried
                    );
                    report.add_issue(ConversionIssue::SchemaFolderNotFound {
                        schema: schema.name.clone(),
                        tried,
                    });
                    continue;
                }
            };

            for (position, table) in schema.tables.iter().enumerate() {
                if !created.contains(&(index, position)) {
                    tracing::debug!("Skipping data for table {} (not created)", table.name);
                    continue;
                }
                let stats = importer.import_table(store, table, &folder);
                report.record_table(stats);
            }
        }
        Ok(())
    }
}

/// Convert the archive at `source` into a new SQLite file at `output`
///
/// The store is built in a temporary file beside `output` and renamed over
/// it only when the run succeeds, so a fatal error leaves an existing
/// output untouched.
pub fn convert_archive(
    source: &Path,
    output: &Path,
    config: ConversionConfig,
) -> Result<ConversionReport, ConversionError> {
    let extracted = extract_archive(source)?;
    let staging = staging_file(output)?;

    let report = {
        let mut store = SqliteStore::new(&staging)?;
        Converter::new(config).convert(extracted.root(), &mut store)?
    };

    if output.exists() {
        tracing::warn!("Output file {} exists, replacing it", output.display());
    }
    staging.persist(output).map_err(|e| ConversionError::Io(e.error))?;
    tracing::info!("Wrote {}", output.display());
    Ok(report)
}

/// Empty temporary file in the output's directory, deleted on drop
fn staging_file(output: &Path) -> Result<TempPath, ConversionError> {
    if output.is_dir() {
        return Err(ConversionError::InvalidInput(format!(
            "Output path is a directory: {}",
            output.display()
        )));
    }
    let parent = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let file = tempfile::Builder::new()
        .prefix(".siard-sqlite-")
        .suffix(".sqlite")
        .tempfile_in(parent)?;
    Ok(file.into_temp_path())
}

/// Default output path: the source with a `.sqlite` extension
pub fn default_output_path(source: &Path) -> PathBuf {
    source.with_extension("sqlite")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staging_file_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("a/b/out.sqlite");
        let staging = staging_file(&output).unwrap();

        assert!(staging.is_file());
        assert_eq!(staging.parent(), Some(dir.path().join("a/b").as_path()));
        let staged = staging.to_path_buf();
        drop(staging);
        assert!(!staged.exists());
        assert!(!output.exists());
    }

    #[test]
    fn test_staging_file_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            staging_file(dir.path()),
            Err(ConversionError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_failed_run_keeps_existing_output() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("extracted");
        fs::create_dir(&source).unwrap();
        let output = dir.path().join("out.sqlite");
        fs::write(&output, b"previous store bytes").unwrap();

        let result = convert_archive(&source, &output, ConversionConfig::default());

        assert!(matches!(
            result,
            Err(ConversionError::Import(ImportError::MetadataMissing(_)))
        ));
        assert_eq!(fs::read(&output).unwrap(), b"previous store bytes");
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn test_failed_run_creates_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.sqlite");

        let result = convert_archive(dir.path(), &output, ConversionConfig::default());

        assert!(result.is_err());
        assert!(!output.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_metadata_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SqliteStore::in_memory().unwrap();
        let result = Converter::default().convert(dir.path(), &mut store);
        assert!(matches!(
            result,
            Err(ConversionError::Import(ImportError::MetadataMissing(_)))
        ));
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("/data/db.siard")),
            PathBuf::from("/data/db.sqlite")
        );
    }
}
