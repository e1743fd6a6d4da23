//! Import functionality
//!
//! Reads an extracted archive:
//! - `metadata`: the descriptor tree from `header/metadata.xml`
//! - `data`: table rows from the per-table XML documents under `content/`
//!
//! `xml`, `lookup` and `rows` are the shared parsing layers.

use std::path::PathBuf;

use crate::database::DatabaseError;

pub mod data;
pub mod lookup;
pub mod metadata;
pub mod rows;
pub mod xml;

pub use data::{DataImporter, ImportStrategy, TableImportStats};
pub use metadata::{METADATA_PATH, MetadataParser};

/// Error during import
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Metadata document not found: {}", .0.display())]
    MetadataMissing(PathBuf),

    #[error("Metadata document {} is malformed: {message}", .path.display())]
    MetadataMalformed { path: PathBuf, message: String },

    #[error("No schemas found in metadata")]
    NoSchemasFound,

    #[error("Data file {} is malformed: {message}", .path.display())]
    DataFileMalformed { path: PathBuf, message: String },

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for import operations
pub type ImportResult<T> = Result<T, ImportError>;
