//! Column descriptor

use serde::{Deserialize, Serialize};

use super::enums::{StorageType, is_boolean_type, map_type};

/// A column of an archived table or view
///
/// `name` is already sanitized. `source_type` keeps the archive's logical type
/// so the importer can apply type-specific coercion (booleans stored as 0/1).
///
/// # Example
///
/// ```rust
/// use siard_sqlite::models::{ColumnDescriptor, StorageType};
///
/// let column = ColumnDescriptor::new("active", "BOOLEAN");
/// assert_eq!(column.storage_type, StorageType::Integer);
/// assert!(column.is_boolean());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Sanitized column name
    pub name: String,
    /// Storage class in the target database
    pub storage_type: StorageType,
    /// Original logical type from the archive metadata
    pub source_type: String,
    /// Whether NULL is allowed (default: true)
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_true() -> bool {
    true
}

impl ColumnDescriptor {
    /// Create a nullable column, deriving the storage type from `source_type`
    pub fn new(name: impl Into<String>, source_type: impl Into<String>) -> Self {
        let source_type = source_type.into();
        Self {
            name: name.into(),
            storage_type: map_type(&source_type),
            source_type,
            nullable: true,
            description: None,
        }
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Whether values are coerced as boolean literals
    pub fn is_boolean(&self) -> bool {
        self.storage_type == StorageType::Integer && is_boolean_type(&self.source_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_column_defaults() {
        let column = ColumnDescriptor::new("id", "INTEGER");
        assert_eq!(column.storage_type, StorageType::Integer);
        assert!(column.nullable);
        assert!(!column.is_boolean());
    }

    #[test]
    fn test_with_nullable() {
        let column = ColumnDescriptor::new("name", "VARCHAR(50)").with_nullable(false);
        assert!(!column.nullable);
        assert_eq!(column.storage_type, StorageType::Text);
    }
}
