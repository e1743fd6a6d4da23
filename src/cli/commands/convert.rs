//! Convert command handler

use std::path::{Path, PathBuf};

use crate::cli::error::CliError;
use crate::convert::{ConversionReport, convert_archive, default_output_path};
use crate::database::ConversionConfig;

/// Issues listed after the summary
const LISTED_ISSUES: usize = 10;

/// Arguments for the convert command
#[derive(Debug, Clone, Default)]
pub struct ConvertArgs {
    /// `.siard` archive or extracted archive directory
    pub source: PathBuf,
    /// Output database; defaults to the source with a `.sqlite` extension
    pub output: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub batch_size: Option<usize>,
    pub streaming_threshold_mb: Option<u64>,
    pub no_foreign_keys: bool,
    pub no_views: bool,
}

/// Resolve the effective configuration: file and environment, then flags
pub fn build_config(args: &ConvertArgs) -> Result<ConversionConfig, CliError> {
    load_config(args.config.as_deref()).and_then(|mut config| {
        if let Some(size) = args.batch_size {
            config.import.batch_size = size;
        }
        if let Some(mb) = args.streaming_threshold_mb {
            config.import.streaming_threshold_mb = mb;
        }
        if args.no_foreign_keys {
            config.schema.foreign_keys = false;
        }
        if args.no_views {
            config.schema.views = false;
        }
        config.validate()?;
        Ok(config)
    })
}

/// Load the config file (explicit or from the working directory) with
/// environment overrides
pub fn load_config(file: Option<&Path>) -> Result<ConversionConfig, CliError> {
    if let Some(path) = file
        && !path.is_file()
    {
        return Err(CliError::FileNotFound(path.to_path_buf()));
    }
    let cwd = std::env::current_dir()
        .map_err(|e| CliError::IoError(format!("Failed to read working directory: {}", e)))?;
    Ok(ConversionConfig::load(file, &cwd)?)
}

/// Convert an archive and print the run summary
pub fn handle_convert(args: &ConvertArgs) -> Result<(), CliError> {
    if !args.source.exists() {
        return Err(CliError::FileNotFound(args.source.clone()));
    }
    let config = build_config(args)?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.source));

    let report = convert_archive(&args.source, &output, config)?;

    println!(
        "Converted {} -> {}\n",
        args.source.display(),
        output.display()
    );
    println!("{}", report.summary());
    print_issues(&report);
    println!("\nExplore the result with: datasette {}", output.display());
    Ok(())
}

fn print_issues(report: &ConversionReport) {
    if report.issues.is_empty() {
        return;
    }
    eprintln!("\nIssues:");
    for issue in report.issues.iter().take(LISTED_ISSUES) {
        eprintln!("  - {}", issue);
    }
    if report.issue_count > LISTED_ISSUES {
        eprintln!("  ... and {} more", report.issue_count - LISTED_ISSUES);
    }
}
