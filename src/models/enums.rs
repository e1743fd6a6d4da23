//! Enums for the descriptor tree
//!
//! `StorageType` is the closed set of SQLite storage classes every archived
//! source type is mapped onto.

use serde::{Deserialize, Serialize};

/// Target storage class of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    #[default]
    Text,
    Integer,
    Real,
    Blob,
}

impl StorageType {
    /// SQL type name used in `CREATE TABLE`
    pub fn sql_name(&self) -> &'static str {
        match self {
            StorageType::Text => "TEXT",
            StorageType::Integer => "INTEGER",
            StorageType::Real => "REAL",
            StorageType::Blob => "BLOB",
        }
    }
}

impl std::fmt::Display for StorageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.sql_name())
    }
}

const TEXT_TYPES: &[&str] = &[
    "VARCHAR",
    "CHAR",
    "CHARACTER",
    "CHARACTER VARYING",
    "CHAR VARYING",
    "NATIONAL CHARACTER",
    "NATIONAL CHARACTER VARYING",
    "NCHAR",
    "NVARCHAR",
    "NCHAR VARYING",
    "TEXT",
    "CLOB",
    "CHARACTER LARGE OBJECT",
    "NCLOB",
    "NATIONAL CHARACTER LARGE OBJECT",
    "XML",
    "DATE",
    "TIME",
    "TIME WITH TIME ZONE",
    "TIMESTAMP",
    "TIMESTAMP WITH TIME ZONE",
    "DATETIME",
    "INTERVAL",
];

const INTEGER_TYPES: &[&str] = &[
    "INTEGER",
    "INT",
    "SMALLINT",
    "BIGINT",
    "TINYINT",
    "BOOLEAN",
    "BOOL",
];

const REAL_TYPES: &[&str] = &[
    "DECIMAL",
    "DEC",
    "NUMERIC",
    "FLOAT",
    "DOUBLE",
    "DOUBLE PRECISION",
    "REAL",
];

const BLOB_TYPES: &[&str] = &[
    "BLOB",
    "BINARY",
    "VARBINARY",
    "BINARY VARYING",
    "BINARY LARGE OBJECT",
];

/// Normalize a source type name for lookup
///
/// Upper-cases, drops any parenthesised length/precision suffix and collapses
/// runs of whitespace.
pub fn normalize_type_name(source_type: &str) -> String {
    let mut stripped = String::with_capacity(source_type.len());
    let mut depth = 0usize;
    for ch in source_type.chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => stripped.push(ch),
            _ => {}
        }
    }
    stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Map a source logical type onto a storage type
///
/// Total function: unknown names map to [`StorageType::Text`].
pub fn map_type(source_type: &str) -> StorageType {
    let normalized = normalize_type_name(source_type);
    let name = normalized.as_str();

    if INTEGER_TYPES.contains(&name) {
        StorageType::Integer
    } else if REAL_TYPES.contains(&name) {
        StorageType::Real
    } else if BLOB_TYPES.contains(&name) {
        StorageType::Blob
    } else {
        if !TEXT_TYPES.contains(&name) {
            tracing::debug!("Unknown source type '{}', storing as TEXT", source_type);
        }
        StorageType::Text
    }
}

/// Whether a source type belongs to the boolean family
pub fn is_boolean_type(source_type: &str) -> bool {
    matches!(normalize_type_name(source_type).as_str(), "BOOLEAN" | "BOOL")
}
