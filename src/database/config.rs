//! Conversion configuration file support
//!
//! Handles parsing of `siard-sqlite.toml` configuration files and
//! environment variable overrides. CLI flags are applied on top by the caller.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{DatabaseError, DatabaseResult};

/// Default configuration filename, looked up in the working directory
pub const CONFIG_FILENAME: &str = "siard-sqlite.toml";

/// Default number of rows per incremental flush
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Default size above which data documents are streamed
pub const DEFAULT_STREAMING_THRESHOLD_MB: u64 = 50;

/// Environment variable for the batch size
pub const ENV_BATCH_SIZE: &str = "SIARD_SQLITE_BATCH_SIZE";

/// Environment variable for the streaming threshold in MiB
pub const ENV_STREAMING_THRESHOLD_MB: &str = "SIARD_SQLITE_STREAMING_THRESHOLD_MB";

/// Environment variable toggling foreign key creation
pub const ENV_FOREIGN_KEYS: &str = "SIARD_SQLITE_FOREIGN_KEYS";

/// Environment variable toggling view creation
pub const ENV_VIEWS: &str = "SIARD_SQLITE_VIEWS";

/// Data import section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSection {
    /// Rows per multi-row insert in the incremental strategy
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Files strictly larger than this (MiB) are streamed
    #[serde(default = "default_streaming_threshold_mb")]
    pub streaming_threshold_mb: u64,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_streaming_threshold_mb() -> u64 {
    DEFAULT_STREAMING_THRESHOLD_MB
}

impl Default for ImportSection {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            streaming_threshold_mb: default_streaming_threshold_mb(),
        }
    }
}

/// Schema materialization section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaSection {
    #[serde(default = "default_true")]
    pub foreign_keys: bool,

    #[serde(default = "default_true")]
    pub views: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SchemaSection {
    fn default() -> Self {
        Self {
            foreign_keys: true,
            views: true,
        }
    }
}

/// Main configuration structure
///
/// Represents the `siard-sqlite.toml` file format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ConversionConfig {
    #[serde(default)]
    pub import: ImportSection,

    #[serde(default)]
    pub schema: SchemaSection,
}

impl ConversionConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from an explicit file, or `siard-sqlite.toml` in
    /// `dir` when present, then apply environment overrides
    pub fn load(file: Option<&Path>, dir: &Path) -> DatabaseResult<Self> {
        Self::load_with(file, dir, |key| std::env::var(key).ok())
    }

    /// [`ConversionConfig::load`] with an explicit override source
    pub fn load_with(
        file: Option<&Path>,
        dir: &Path,
        overrides: impl Fn(&str) -> Option<String>,
    ) -> DatabaseResult<Self> {
        let default_path = dir.join(CONFIG_FILENAME);
        let path = match file {
            Some(path) => Some(path),
            None if default_path.is_file() => Some(default_path.as_path()),
            None => None,
        };

        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    DatabaseError::IoError(format!(
                        "Failed to read config {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                tracing::debug!("Loaded configuration from {}", path.display());
                Self::parse(&content)?
            }
            None => Self::default(),
        };

        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> DatabaseResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| DatabaseError::ConfigError(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Convert configuration to TOML string
    pub fn to_toml(&self) -> DatabaseResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| DatabaseError::ConfigError(format!("Failed to serialize config: {}", e)))
    }

    /// Apply overrides keyed by the `ENV_*` names
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(size) = lookup(ENV_BATCH_SIZE)
            && let Ok(size) = size.trim().parse()
        {
            self.import.batch_size = size;
        }

        if let Some(mb) = lookup(ENV_STREAMING_THRESHOLD_MB)
            && let Ok(mb) = mb.trim().parse()
        {
            self.import.streaming_threshold_mb = mb;
        }

        if let Some(flag) = lookup(ENV_FOREIGN_KEYS)
            && let Some(flag) = parse_flag(&flag)
        {
            self.schema.foreign_keys = flag;
        }

        if let Some(flag) = lookup(ENV_VIEWS)
            && let Some(flag) = parse_flag(&flag)
        {
            self.schema.views = flag;
        }
    }

    /// Reject settings the importer cannot run with
    pub fn validate(&self) -> DatabaseResult<()> {
        if self.import.batch_size == 0 {
            return Err(DatabaseError::ConfigError(
                "batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn batch_size(&self) -> usize {
        self.import.batch_size
    }

    /// Streaming threshold in bytes
    pub fn streaming_threshold_bytes(&self) -> u64 {
        self.import.streaming_threshold_mb.saturating_mul(1024 * 1024)
    }

    pub fn create_foreign_keys(&self) -> bool {
        self.schema.foreign_keys
    }

    pub fn create_views(&self) -> bool {
        self.schema.views
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Generate a sample configuration file content
pub fn sample_config() -> &'static str {
    r#"# siard-sqlite configuration

[import]
# Rows per multi-row INSERT when streaming large table files
batch_size = 1000

# Table files larger than this (MiB) are parsed incrementally
streaming_threshold_mb = 50

[schema]
# Emit FOREIGN KEY constraints where both sides resolve
foreign_keys = true

# Create views from translated view queries
views = true
"#
}
