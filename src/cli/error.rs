//! CLI-specific error types

use crate::convert::ConversionError;
use crate::database::DatabaseError;
use std::path::PathBuf;
use thiserror::Error;

/// CLI-specific error type
#[derive(Error, Debug)]
pub enum CliError {
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Conversion failed: {0}")]
    ConversionError(#[from] ConversionError),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(String),
}
