//! Command-line interface
//!
//! The binary in `main.rs` parses arguments and dispatches to the handlers in
//! `commands`.

pub mod commands;
pub mod error;

pub use error::CliError;
