//! Validation functionality
//!
//! Identifier sanitization shared by metadata parsing, DDL generation and
//! row insertion.

pub mod input;

pub use input::{quote_identifier, sanitize_description, sanitize_identifier};
