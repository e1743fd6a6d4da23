//! Schema and view descriptors

use serde::{Deserialize, Serialize};

use super::column::ColumnDescriptor;
use super::table::TableDescriptor;

/// A view defined in the archive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewDescriptor {
    /// Sanitized view name
    pub name: String,
    /// Original view query in the source dialect
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Declared columns, for documentation only
    #[serde(default)]
    pub columns: Vec<ColumnDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A schema of the archive with its tables and views
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    pub name: String,
    /// Folder under `content/` holding this schema's table data
    pub content_folder: String,
    pub tables: Vec<TableDescriptor>,
    pub views: Vec<ViewDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SchemaDescriptor {
    /// Create an empty schema whose content folder defaults to its name
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            content_folder: name.clone(),
            name,
            tables: Vec::new(),
            views: Vec::new(),
            description: None,
        }
    }

    pub fn table(&self, name: &str) -> Option<&TableDescriptor> {
        self.tables.iter().find(|t| t.name == name)
    }
}

/// Resolve a table by name, preferring the named schema when given
pub fn find_table<'a>(
    schemas: &'a [SchemaDescriptor],
    schema_name: Option<&str>,
    table_name: &str,
) -> Option<&'a TableDescriptor> {
    if let Some(schema_name) = schema_name
        && let Some(table) = schemas
            .iter()
            .filter(|s| s.name == schema_name)
            .find_map(|s| s.table(table_name))
    {
        return Some(table);
    }
    schemas.iter().find_map(|s| s.table(table_name))
}
