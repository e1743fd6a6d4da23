//! Data importer tests against real files

mod common;

use std::fs;

use common::table_xml;
use siard_sqlite::convert::ConversionIssue;
use siard_sqlite::database::SqliteStore;
use siard_sqlite::database::schema::create_table_sql;
use siard_sqlite::import::{DataImporter, ImportStrategy};
use siard_sqlite::models::{ColumnDescriptor, TableDescriptor};

fn people() -> TableDescriptor {
    let mut table = TableDescriptor::new("people", 1);
    table.columns = vec![
        ColumnDescriptor::new("id", "INTEGER").with_nullable(false),
        ColumnDescriptor::new("name", "VARCHAR(50)"),
    ];
    table
}

fn store_with(table: &TableDescriptor) -> SqliteStore {
    let store = SqliteStore::in_memory().unwrap();
    let (sql, _) = create_table_sql(table, &[], false);
    store.execute_batch(&sql).unwrap();
    store
}

fn people_rows() -> String {
    table_xml(&[
        &[Some("1"), Some("Ann")],
        &[None, Some("Nobody")],
        &[Some("3"), Some("Cid")],
    ])
}

#[test]
fn test_whole_document_isolates_failing_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("table1.xml");
    fs::write(&path, people_rows()).unwrap();

    let table = people();
    let mut store = store_with(&table);
    let stats = DataImporter::new(1000, u64::MAX).import_file(&mut store, &table, &path);

    assert_eq!(stats.strategy, Some(ImportStrategy::WholeDocument));
    assert_eq!(stats.rows_read, 3);
    assert_eq!(stats.rows_inserted, 2);
    assert!(matches!(
        stats.issues[0],
        ConversionIssue::RowInsertFailed { row: 2, .. }
    ));
    assert_eq!(store.row_count("people").unwrap(), 2);
}

#[test]
fn test_incremental_loses_failing_batch_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("table1.xml");
    fs::write(&path, people_rows()).unwrap();

    let table = people();
    let mut store = store_with(&table);
    let stats = DataImporter::new(2, 0).import_file(&mut store, &table, &path);

    assert_eq!(stats.strategy, Some(ImportStrategy::Incremental));
    assert_eq!(stats.rows_read, 3);
    assert_eq!(stats.rows_inserted, 1);
    assert!(matches!(
        stats.issues[0],
        ConversionIssue::BatchInsertFailed {
            first_row: 1,
            lost_rows: 2,
            ..
        }
    ));

    let result = store.query("SELECT id FROM people").unwrap();
    assert_eq!(result.rows, vec![serde_json::json!({"id": 3})]);
}

#[test]
fn test_incremental_chunks_wide_tables() {
    let columns = 1500;
    let rows = 50;
    let mut table = TableDescriptor::new("wide", 1);
    table.columns = (1..=columns)
        .map(|i| ColumnDescriptor::new(format!("k{}", i), "INTEGER"))
        .collect();

    let values: Vec<String> = (1..=columns).map(|i| i.to_string()).collect();
    let row: Vec<Option<&str>> = values.iter().map(|v| Some(v.as_str())).collect();
    let all_rows: Vec<&[Option<&str>]> = (0..rows).map(|_| row.as_slice()).collect();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("table1.xml");
    fs::write(&path, table_xml(&all_rows)).unwrap();

    let mut store = store_with(&table);
    let stats = DataImporter::new(1000, 0).import_file(&mut store, &table, &path);

    assert!(stats.issues.is_empty(), "{:?}", stats.issues);
    assert_eq!(stats.rows_inserted, rows);
    assert_eq!(store.row_count("wide").unwrap(), rows as u64);
}

#[test]
fn test_truncated_stream_keeps_flushed_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("table1.xml");
    fs::write(
        &path,
        "<table><row><c1>1</c1><c2>a</c2></row><row><c1>2</c1><c2>b</c2></row><row><c1>3</c1>",
    )
    .unwrap();

    let table = people();
    let mut store = store_with(&table);
    let stats = DataImporter::new(1000, 0).import_file(&mut store, &table, &path);

    assert_eq!(stats.rows_inserted, 2);
    assert!(matches!(
        stats.issues[0],
        ConversionIssue::DataFileUnreadable { .. }
    ));
    assert_eq!(store.row_count("people").unwrap(), 2);
}

#[test]
fn test_import_table_discovers_by_name() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("people.xml"), people_rows()).unwrap();

    let mut table = people();
    table.folder = Some("missing".to_string());
    let mut store = store_with(&table);
    let stats = DataImporter::new(1000, u64::MAX).import_table(&mut store, &table, dir.path());

    assert_eq!(stats.source, Some(dir.path().join("people.xml")));
    assert_eq!(stats.rows_read, 3);
}

#[test]
fn test_rows_without_enough_cells_are_padded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("table1.xml");
    fs::write(
        &path,
        "<table><row><c1>7</c1></row><row><c2>x</c2><c1>8</c1><c9>ignored</c9></row></table>",
    )
    .unwrap();

    let table = people();
    let mut store = store_with(&table);
    let stats = DataImporter::new(1000, u64::MAX).import_file(&mut store, &table, &path);
    assert_eq!(stats.rows_inserted, 2);

    let result = store.query("SELECT id, name FROM people ORDER BY id").unwrap();
    assert_eq!(
        result.rows,
        vec![
            serde_json::json!({"id": 7, "name": null}),
            serde_json::json!({"id": 8, "name": "x"}),
        ]
    );
}
