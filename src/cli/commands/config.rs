//! Config command handler

use std::path::PathBuf;

use super::convert::load_config;
use crate::cli::error::CliError;
use crate::database::config::sample_config;

/// Arguments for the config command
#[derive(Debug, Clone, Default)]
pub struct ConfigArgs {
    pub config: Option<PathBuf>,
    /// Print the commented sample file instead
    pub sample: bool,
}

/// Print the effective configuration as TOML
pub fn handle_config(args: &ConfigArgs) -> Result<(), CliError> {
    if args.sample {
        print!("{}", sample_config());
        return Ok(());
    }
    let config = load_config(args.config.as_deref())?;
    print!("{}", config.to_toml()?);
    Ok(())
}
