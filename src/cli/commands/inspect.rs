//! Inspect command handler
//!
//! Shows what an archive contains without writing a store.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::cli::error::CliError;
use crate::convert::{ConversionError, list_entries, read_entry};
use crate::import::{METADATA_PATH, MetadataParser};
use crate::models::SchemaDescriptor;

/// Arguments for the inspect command
#[derive(Debug, Clone)]
pub struct InspectArgs {
    pub source: PathBuf,
    /// Print JSON instead of text
    pub json: bool,
}

/// One archive entry
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveEntry {
    pub name: String,
    pub size: u64,
}

/// Everything `inspect` reports
#[derive(Debug, Clone, Serialize)]
pub struct Inspection {
    pub entries: Vec<ArchiveEntry>,
    pub schemas: Vec<SchemaDescriptor>,
    pub warnings: Vec<String>,
}

/// Read an archive's entries and parsed metadata
pub fn inspect(source: &Path) -> Result<Inspection, CliError> {
    if !source.exists() {
        return Err(CliError::FileNotFound(source.to_path_buf()));
    }

    let mut parser = MetadataParser::new();
    let (entries, schemas) = if source.is_dir() {
        let schemas = parser
            .parse_file(&source.join(METADATA_PATH))
            .map_err(ConversionError::from)?;
        (Vec::new(), schemas)
    } else {
        let entries = list_entries(source)?
            .into_iter()
            .map(|(name, size)| ArchiveEntry { name, size })
            .collect();
        let metadata = read_entry(source, METADATA_PATH)?;
        let schemas = parser
            .parse_str(&metadata)
            .map_err(ConversionError::from)?;
        (entries, schemas)
    };

    Ok(Inspection {
        entries,
        schemas,
        warnings: parser.warnings().to_vec(),
    })
}

/// Print an archive's contents
pub fn handle_inspect(args: &InspectArgs) -> Result<(), CliError> {
    let inspection = inspect(&args.source)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&inspection)?);
    } else {
        print!("{}", render_inspection(&inspection));
    }
    Ok(())
}

/// Text rendering of an inspection
pub fn render_inspection(inspection: &Inspection) -> String {
    let mut out = String::new();

    if !inspection.entries.is_empty() {
        let _ = writeln!(out, "Entries ({}):", inspection.entries.len());
        for entry in &inspection.entries {
            let _ = writeln!(out, "  {:>10}  {}", entry.size, entry.name);
        }
        out.push('\n');
    }

    for schema in &inspection.schemas {
        let _ = writeln!(out, "Schema {} (folder {})", schema.name, schema.content_folder);
        if let Some(description) = &schema.description {
            let _ = writeln!(out, "  {}", description);
        }
        for table in &schema.tables {
            let _ = writeln!(
                out,
                "  Table {} #{} ({} columns)",
                table.name,
                table.ordinal_position,
                table.columns.len()
            );
            if let Some(description) = &table.description {
                let _ = writeln!(out, "    {}", description);
            }
            for column in &table.columns {
                let _ = writeln!(
                    out,
                    "    {} {} -> {}{}",
                    column.name,
                    column.source_type,
                    column.storage_type,
                    if column.nullable { "" } else { " NOT NULL" }
                );
            }
            if let Some(pk) = &table.primary_key {
                let _ = writeln!(out, "    PRIMARY KEY ({})", pk.join(", "));
            }
            for fk in &table.foreign_keys {
                let _ = writeln!(
                    out,
                    "    FOREIGN KEY ({}) -> {}({})",
                    fk.source_columns.join(", "),
                    fk.referenced_table,
                    fk.target_columns.join(", ")
                );
            }
        }
        for view in &schema.views {
            let _ = writeln!(
                out,
                "  View {}{}",
                view.name,
                if view.query.is_some() { "" } else { " (no query)" }
            );
        }
    }

    if !inspection.warnings.is_empty() {
        let _ = writeln!(out, "\nWarnings:");
        for warning in &inspection.warnings {
            let _ = writeln!(out, "  - {}", warning);
        }
    }
    out
}
