//! Models module
//!
//! The descriptor tree built from archive metadata: schemas own tables and
//! views, tables own columns and keys. The tree is built once per conversion
//! and read by both the schema materializer and the data importer.

pub mod column;
pub mod enums;
pub mod schema;
pub mod table;

pub use column::ColumnDescriptor;
pub use enums::*;
pub use schema::{SchemaDescriptor, ViewDescriptor, find_table};
pub use table::{ForeignKeyDescriptor, TableDescriptor};
