//! SIARD to SQLite - convert SIARD database archives into SQLite files
//!
//! Provides:
//! - Archive extraction and listing
//! - Metadata parsing into a descriptor tree
//! - Table and view materialization
//! - Streaming import of table data
//! - Query helpers for the produced store

#[cfg(feature = "cli")]
pub mod cli;
pub mod convert;
pub mod database;
pub mod import;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use convert::{
    ConversionError, ConversionIssue, ConversionReport, Converter, convert_archive,
    extract_archive,
};
pub use database::{
    ConversionConfig, DatabaseError, DatabaseResult, OutputFormat, QueryResult, SqliteStore,
    format_query_result,
};
pub use import::{DataImporter, ImportError, ImportResult, MetadataParser, TableImportStats};
pub use models::{
    ColumnDescriptor, ForeignKeyDescriptor, SchemaDescriptor, StorageType, TableDescriptor,
    ViewDescriptor,
};
pub use validation::{quote_identifier, sanitize_identifier};
