//! Archive extraction
//!
//! A SIARD archive is a zip container. It is unpacked into a temporary
//! directory that lives as long as the returned [`ExtractedArchive`]. A
//! directory is accepted as an archive that was already extracted.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use zip::ZipArchive;
use zip::result::ZipError;

use super::ConversionError;
use crate::import::{ImportError, METADATA_PATH};

/// Extension archives must carry
pub const ARCHIVE_EXTENSION: &str = "siard";

/// Archive contents on disk
#[derive(Debug)]
pub struct ExtractedArchive {
    root: PathBuf,
    // removed on drop
    temp: Option<TempDir>,
}

impl ExtractedArchive {
    /// Directory holding `header/` and `content/`
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the contents live in a temporary directory
    pub fn is_temporary(&self) -> bool {
        self.temp.is_some()
    }
}

fn has_archive_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(ARCHIVE_EXTENSION))
}

fn open_archive(path: &Path) -> Result<ZipArchive<File>, ConversionError> {
    if !path.exists() {
        return Err(ConversionError::InvalidInput(format!(
            "Archive not found: {}",
            path.display()
        )));
    }
    if !has_archive_extension(path) {
        return Err(ConversionError::InvalidInput(format!(
            "Not a .{} file: {}",
            ARCHIVE_EXTENSION,
            path.display()
        )));
    }
    let file = File::open(path)?;
    ZipArchive::new(file).map_err(|e| {
        ConversionError::Archive(format!("Failed to open {}: {}", path.display(), e))
    })
}

/// Extract `path` into a temporary directory
pub fn extract_archive(path: &Path) -> Result<ExtractedArchive, ConversionError> {
    if path.is_dir() {
        tracing::info!("Using extracted archive directory {}", path.display());
        return Ok(ExtractedArchive {
            root: path.to_path_buf(),
            temp: None,
        });
    }

    let mut archive = open_archive(path)?;
    let temp = tempfile::Builder::new().prefix("siard-").tempdir()?;
    tracing::info!(
        "Extracting {} ({} entries) to {}",
        path.display(),
        archive.len(),
        temp.path().display()
    );
    archive.extract(temp.path()).map_err(|e| {
        ConversionError::Archive(format!("Failed to extract {}: {}", path.display(), e))
    })?;

    Ok(ExtractedArchive {
        root: temp.path().to_path_buf(),
        temp: Some(temp),
    })
}

/// Names and uncompressed sizes of the archive entries
pub fn list_entries(path: &Path) -> Result<Vec<(String, u64)>, ConversionError> {
    let mut archive = open_archive(path)?;
    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let entry = archive.by_index(i).map_err(|e| {
            ConversionError::Archive(format!("Failed to read entry {}: {}", i, e))
        })?;
        entries.push((entry.name().to_string(), entry.size()));
    }
    Ok(entries)
}

/// Read one entry of the archive as text without extracting the rest
///
/// A missing entry is reported as [`ImportError::MetadataMissing`] when it
/// is the metadata document, and as an archive error otherwise.
pub fn read_entry(path: &Path, name: &str) -> Result<String, ConversionError> {
    let mut archive = open_archive(path)?;
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) if name == METADATA_PATH => {
            return Err(ImportError::MetadataMissing(path.join(name)).into());
        }
        Err(e) => {
            return Err(ConversionError::Archive(format!(
                "Failed to read {} from {}: {}",
                name,
                path.display(),
                e
            )));
        }
    };
    let mut content = String::with_capacity(entry.size() as usize);
    entry.read_to_string(&mut content)?;
    Ok(content)
}
