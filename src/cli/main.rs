//! CLI binary entry point for siard-sqlite

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use siard_sqlite::cli::commands::config::{ConfigArgs, handle_config};
#[cfg(feature = "cli")]
use siard_sqlite::cli::commands::convert::{ConvertArgs, handle_convert};
#[cfg(feature = "cli")]
use siard_sqlite::cli::commands::inspect::{InspectArgs, handle_inspect};
#[cfg(feature = "cli")]
use siard_sqlite::cli::commands::query::{QueryArgs, handle_query};
#[cfg(feature = "cli")]
use std::path::PathBuf;
#[cfg(feature = "cli")]
use tracing::Level;

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "siard-sqlite")]
#[command(about = "Convert SIARD database archives into SQLite databases")]
#[command(version)]
struct Cli {
    /// Show debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Only show warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Convert a SIARD archive into a SQLite database
    Convert {
        /// SIARD archive (.siard) or extracted archive directory
        source: PathBuf,
        /// Output database (default: source with .sqlite extension)
        output: Option<PathBuf>,
        /// Configuration file (default: ./siard-sqlite.toml when present)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Rows per batch when streaming large table files
        #[arg(long)]
        batch_size: Option<usize>,
        /// Size in MiB above which table files are streamed
        #[arg(long)]
        streaming_threshold_mb: Option<u64>,
        /// Do not create foreign key constraints
        #[arg(long)]
        no_foreign_keys: bool,
        /// Do not create views
        #[arg(long)]
        no_views: bool,
    },
    /// Show archive entries and parsed metadata
    Inspect {
        /// SIARD archive (.siard) or extracted archive directory
        source: PathBuf,
        /// Print JSON
        #[arg(long)]
        json: bool,
    },
    /// Execute SQL against a converted database
    Query {
        /// Converted database
        database: PathBuf,
        /// SQL query to execute
        sql: String,
        /// Output format (table, json, csv)
        #[arg(short, long, default_value = "table")]
        format: String,
    },
    /// Print the effective configuration
    Config {
        /// Configuration file (default: ./siard-sqlite.toml when present)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Print a commented sample configuration
        #[arg(long)]
        sample: bool,
    },
}

#[cfg(feature = "cli")]
fn setup_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        Level::DEBUG
    } else if quiet {
        Level::WARN
    } else {
        Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "cli")]
fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Convert {
            source,
            output,
            config,
            batch_size,
            streaming_threshold_mb,
            no_foreign_keys,
            no_views,
        } => {
            let args = ConvertArgs {
                source,
                output,
                config,
                batch_size,
                streaming_threshold_mb,
                no_foreign_keys,
                no_views,
            };
            handle_convert(&args)
        }
        Commands::Inspect { source, json } => handle_inspect(&InspectArgs { source, json }),
        Commands::Query {
            database,
            sql,
            format,
        } => {
            let args = QueryArgs {
                database,
                sql,
                format,
            };
            handle_query(&args)
        }
        Commands::Config { config, sample } => handle_config(&ConfigArgs { config, sample }),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature is not enabled. Build with --features cli");
    std::process::exit(1);
}
