//! Metadata model builder
//!
//! Turns `header/metadata.xml` into the descriptor tree. Unusable pieces
//! (columns without name or type, tables without columns, foreign keys without
//! a referenced table) are dropped instead of failing the whole archive.

use std::path::Path;

use super::lookup::{Field, Lookup};
use super::xml::{XmlDocument, XmlElement};
use super::{ImportError, ImportResult};
use crate::models::{
    ColumnDescriptor, ForeignKeyDescriptor, SchemaDescriptor, TableDescriptor, ViewDescriptor,
};
use crate::validation::{sanitize_description, sanitize_identifier};

/// Location of the metadata document inside an extracted archive
pub const METADATA_PATH: &str = "header/metadata.xml";

/// Parser for archive metadata documents
#[derive(Debug, Default)]
pub struct MetadataParser {
    warnings: Vec<String>,
}

impl MetadataParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diagnostics collected while parsing (dropped schemas, tables, keys)
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Parse the metadata document at `path`
    pub fn parse_file(&mut self, path: &Path) -> ImportResult<Vec<SchemaDescriptor>> {
        if !path.is_file() {
            return Err(ImportError::MetadataMissing(path.to_path_buf()));
        }
        tracing::info!("Parsing metadata from {}", path.display());
        let document = XmlDocument::parse_file(path).map_err(|e| ImportError::MetadataMalformed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        self.parse_document(&document)
    }

    /// Parse metadata from an in-memory string
    pub fn parse_str(&mut self, content: &str) -> ImportResult<Vec<SchemaDescriptor>> {
        let document =
            XmlDocument::parse_str(content).map_err(|e| ImportError::MetadataMalformed {
                path: Path::new(METADATA_PATH).to_path_buf(),
                message: e.to_string(),
            })?;
        self.parse_document(&document)
    }

    pub fn parse_document(&mut self, document: &XmlDocument) -> ImportResult<Vec<SchemaDescriptor>> {
        let lookup = Lookup::new(document.default_namespace());
        if let Some(ns) = lookup.namespace() {
            tracing::debug!("Metadata default namespace: {}", ns);
        }

        let schemas: Vec<SchemaDescriptor> = lookup
            .elements(&document.root, "schema")
            .into_iter()
            .enumerate()
            .filter_map(|(index, element)| self.parse_schema(&lookup, element, index + 1))
            .collect();

        if schemas.is_empty() {
            return Err(ImportError::NoSchemasFound);
        }
        tracing::info!("Found {} schemas", schemas.len());
        Ok(schemas)
    }

    fn warn(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }

    fn parse_schema(
        &mut self,
        lookup: &Lookup<'_>,
        element: &XmlElement,
        position: usize,
    ) -> Option<SchemaDescriptor> {
        let Some(name) = lookup.string(element, Field::Name) else {
            self.warn(format!("Schema #{} has no name, skipping", position));
            return None;
        };
        tracing::info!("Processing schema: {}", name);

        let mut schema = SchemaDescriptor::new(name);
        if let Some(folder) = lookup.string(element, Field::Folder) {
            schema.content_folder = folder;
        }
        schema.description = description(lookup, element);

        for (index, table_element) in lookup.elements(element, "table").into_iter().enumerate() {
            if let Some(table) = self.parse_table(lookup, table_element, index + 1) {
                schema.tables.push(table);
            }
        }
        if schema.tables.is_empty() {
            tracing::warn!("No tables found in schema {}", schema.name);
        }

        for view_element in lookup.elements(element, "view") {
            if let Some(view) = self.parse_view(lookup, view_element) {
                schema.views.push(view);
            }
        }

        tracing::info!(
            "Schema {} contains {} tables and {} views",
            schema.name,
            schema.tables.len(),
            schema.views.len()
        );
        Some(schema)
    }

    fn parse_table(
        &mut self,
        lookup: &Lookup<'_>,
        element: &XmlElement,
        ordinal_position: usize,
    ) -> Option<TableDescriptor> {
        let Some(raw_name) = lookup.text(element, Field::Name) else {
            self.warn(format!(
                "Table #{} has no name, skipping",
                ordinal_position
            ));
            return None;
        };

        let mut table = TableDescriptor::new(sanitize_identifier(raw_name), ordinal_position);
        table.columns = parse_columns(lookup, element);
        if table.columns.is_empty() {
            self.warn(format!(
                "Table {} has no usable columns, skipping",
                raw_name
            ));
            return None;
        }

        table.folder = lookup.string(element, Field::Folder);
        table.description = description(lookup, element);
        table.primary_key = parse_primary_key(lookup, element);
        table.foreign_keys = lookup
            .elements(element, "foreignKey")
            .into_iter()
            .filter_map(|fk| parse_foreign_key(lookup, fk, &table.name))
            .collect();

        tracing::debug!(
            "Table {} has {} columns: {:?}",
            table.name,
            table.columns.len(),
            table.column_names()
        );
        Some(table)
    }

    fn parse_view(&mut self, lookup: &Lookup<'_>, element: &XmlElement) -> Option<ViewDescriptor> {
        let Some(raw_name) = lookup.text(element, Field::Name) else {
            self.warn("View without a name, skipping".to_string());
            return None;
        };
        Some(ViewDescriptor {
            name: sanitize_identifier(raw_name),
            query: lookup.string(element, Field::Query),
            columns: parse_columns(lookup, element),
            description: description(lookup, element),
        })
    }
}

fn description(lookup: &Lookup<'_>, element: &XmlElement) -> Option<String> {
    lookup
        .text(element, Field::Description)
        .map(sanitize_description)
}

/// Parse every `column` descendant; placeholders without name or type are
/// skipped
fn parse_columns(lookup: &Lookup<'_>, element: &XmlElement) -> Vec<ColumnDescriptor> {
    lookup
        .elements(element, "column")
        .into_iter()
        .filter_map(|column| parse_column(lookup, column))
        .collect()
}

fn parse_column(lookup: &Lookup<'_>, element: &XmlElement) -> Option<ColumnDescriptor> {
    let name = lookup.text(element, Field::Name);
    let source_type = lookup.text(element, Field::Type);
    let (Some(name), Some(source_type)) = (name, source_type) else {
        tracing::trace!("Skipping placeholder column element: name={:?}, type={:?}", name, source_type);
        return None;
    };

    let nullable = !lookup
        .text(element, Field::Nullable)
        .is_some_and(|v| v.eq_ignore_ascii_case("false"));

    let mut column = ColumnDescriptor::new(sanitize_identifier(name), source_type)
        .with_nullable(nullable);
    column.description = description(lookup, element);
    Some(column)
}

/// Column names under the first `primaryKey` element
fn parse_primary_key(lookup: &Lookup<'_>, element: &XmlElement) -> Option<Vec<String>> {
    let pk = lookup.element(element, "primaryKey")?;
    let columns: Vec<String> = lookup
        .elements(pk, "column")
        .into_iter()
        .filter_map(XmlElement::trimmed_text)
        .map(sanitize_identifier)
        .collect();
    (!columns.is_empty()).then_some(columns)
}

fn parse_foreign_key(
    lookup: &Lookup<'_>,
    element: &XmlElement,
    table_name: &str,
) -> Option<ForeignKeyDescriptor> {
    let Some(referenced_table) = lookup.text(element, Field::ReferencedTable) else {
        tracing::debug!("Dropping foreign key on {} without referenced table", table_name);
        return None;
    };

    let references = lookup.elements(element, "reference");
    let (mut source_columns, mut target_columns): (Vec<String>, Vec<String>) =
        if references.is_empty() {
            (
                child_texts(lookup, element, Field::Column),
                child_texts(lookup, element, Field::Referenced),
            )
        } else {
            (
                references
                    .iter()
                    .filter_map(|r| lookup.text(r, Field::Column))
                    .map(sanitize_identifier)
                    .collect(),
                references
                    .iter()
                    .filter_map(|r| lookup.text(r, Field::Referenced))
                    .map(sanitize_identifier)
                    .collect(),
            )
        };

    let pairs = source_columns.len().min(target_columns.len());
    source_columns.truncate(pairs);
    target_columns.truncate(pairs);

    Some(ForeignKeyDescriptor {
        name: lookup.text(element, Field::Name).map(sanitize_identifier),
        referenced_table: sanitize_identifier(referenced_table),
        referenced_schema: lookup.string(element, Field::ReferencedSchema),
        source_columns,
        target_columns,
    })
}

/// Sanitized texts of the direct children matching `field` or its aliases
fn child_texts(lookup: &Lookup<'_>, element: &XmlElement, field: Field) -> Vec<String> {
    std::iter::once(field.local_name())
        .chain(field.aliases().iter().copied())
        .map(|name| lookup.children(element, name))
        .find(|children| !children.is_empty())
        .unwrap_or_default()
        .into_iter()
        .filter_map(XmlElement::trimmed_text)
        .map(sanitize_identifier)
        .collect()
}
