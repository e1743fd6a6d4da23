//! Table descriptor and its foreign keys

use serde::{Deserialize, Serialize};

use super::column::ColumnDescriptor;

/// Foreign key declared on a table
///
/// `source_columns` and `target_columns` are parallel lists: position `i` in
/// one pairs with position `i` in the other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Sanitized referenced table name
    pub referenced_table: String,
    /// Referenced schema as written in metadata (not validated)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referenced_schema: Option<String>,
    pub source_columns: Vec<String>,
    pub target_columns: Vec<String>,
}

impl ForeignKeyDescriptor {
    /// Whether both column lists carry at least one entry
    pub fn has_columns(&self) -> bool {
        !self.source_columns.is_empty() && !self.target_columns.is_empty()
    }
}

/// An archived table
///
/// Column order is load-bearing: column `i` receives the value of the row
/// element `c{i+1}` during import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// Sanitized table name
    pub name: String,
    /// 1-based position among the schema's tables
    pub ordinal_position: usize,
    /// Folder hint from metadata, relative to the schema folder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    pub columns: Vec<ColumnDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<Vec<String>>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TableDescriptor {
    pub fn new(name: impl Into<String>, ordinal_position: usize) -> Self {
        Self {
            name: name.into(),
            ordinal_position,
            folder: None,
            columns: Vec::new(),
            primary_key: None,
            foreign_keys: Vec::new(),
            description: None,
        }
    }

    /// Find a column by its sanitized name
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}
