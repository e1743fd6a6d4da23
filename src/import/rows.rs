//! Row extraction and value coercion for table data documents
//!
//! A record is an element with local name `row`; its values are the children
//! `c1..cN`, matched positionally to the table's columns. Both the
//! whole-document and the incremental readers hand out complete `row`
//! elements, so extraction and coercion are shared.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::NsReader;
use quick_xml::events::Event;
use rusqlite::types::Value;

use super::xml::{
    ElementBuilder, XmlElement, XmlParseError, element_from_start, owned_namespace, syntax_error,
};
use crate::models::{ColumnDescriptor, StorageType};

/// Local name of a record element
pub const ROW_ELEMENT: &str = "row";

/// Local name of the nil-indicator attribute
pub const NIL_ATTRIBUTE: &str = "nil";

/// Raw cell text per column; `None` is SQL NULL
pub type RawRow = Vec<Option<String>>;

/// Value that could not be coerced to its column type
#[derive(Debug, Clone, PartialEq)]
pub struct CoercionFailure {
    pub column: String,
    pub value: String,
    /// Value stored instead
    pub fallback: Value,
}

/// Whether the element carries a nil-indicator attribute
pub fn is_nil(cell: &XmlElement) -> bool {
    cell.attribute(NIL_ATTRIBUTE)
        .is_some_and(|v| matches!(v.trim(), "true" | "1"))
}

/// Column index for a cell name of the form `c<k>` (1-based)
fn cell_index(name: &str) -> Option<usize> {
    let digits = name.strip_prefix('c')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<usize>().ok().filter(|k| *k >= 1)
}

/// Extract `column_count` raw values from a `row` element
///
/// The first child named `c<k>` supplies column `k`. Missing cells, cells
/// without text and nil cells are NULL.
pub fn extract_row(row: &XmlElement, column_count: usize) -> RawRow {
    let mut values: RawRow = vec![None; column_count];
    let mut seen = vec![false; column_count];

    for cell in &row.children {
        let Some(k) = cell_index(&cell.name) else {
            continue;
        };
        if k > column_count || seen[k - 1] {
            continue;
        }
        seen[k - 1] = true;
        if !is_nil(cell) && !cell.text.is_empty() {
            values[k - 1] = Some(cell.text.clone());
        }
    }
    values
}

/// Coerce one raw value for `column`
///
/// On failure the `Err` carries the fallback value to store.
pub fn coerce_value(column: &ColumnDescriptor, raw: Option<&str>) -> Result<Value, CoercionFailure> {
    let Some(raw) = raw else {
        return Ok(Value::Null);
    };
    let text = raw.trim();
    let failure = |fallback: Value| CoercionFailure {
        column: column.name.clone(),
        value: text.to_string(),
        fallback,
    };

    match column.storage_type {
        StorageType::Integer if column.is_boolean() => match text.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(Value::Integer(1)),
            "false" | "0" => Ok(Value::Integer(0)),
            _ => Err(failure(Value::Integer(0))),
        },
        StorageType::Integer => text
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| failure(Value::Null)),
        StorageType::Real => text
            .parse::<f64>()
            .map(Value::Real)
            .map_err(|_| failure(Value::Null)),
        StorageType::Text | StorageType::Blob => Ok(Value::Text(text.to_string())),
    }
}

/// Coerce a raw row, substituting fallbacks for failed values
pub fn coerce_row(columns: &[ColumnDescriptor], raw: &RawRow) -> (Vec<Value>, Vec<CoercionFailure>) {
    let mut failures = Vec::new();
    let values = columns
        .iter()
        .zip(raw.iter())
        .map(|(column, value)| match coerce_value(column, value.as_deref()) {
            Ok(value) => value,
            Err(failure) => {
                let fallback = failure.fallback.clone();
                failures.push(failure);
                fallback
            }
        })
        .collect();
    (values, failures)
}

/// `row` elements under `root` in document order; rows nested in rows and
/// the root itself are not records
pub fn collect_rows(root: &XmlElement) -> Vec<&XmlElement> {
    fn walk<'a>(element: &'a XmlElement, rows: &mut Vec<&'a XmlElement>) {
        for child in &element.children {
            if child.name == ROW_ELEMENT {
                rows.push(child);
            } else {
                walk(child, rows);
            }
        }
    }

    let mut rows = Vec::new();
    walk(root, &mut rows);
    rows
}

/// Forward-only reader yielding one complete `row` element at a time
///
/// Only the row being read is held in memory.
pub struct RowStream<R: BufRead> {
    reader: NsReader<R>,
    buf: Vec<u8>,
    row: ElementBuilder,
    /// Names of open elements outside the current row
    open: Vec<String>,
    finished: bool,
}

impl RowStream<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, XmlParseError> {
        let file = File::open(path)?;
        Ok(Self::from_reader(BufReader::new(file)))
    }
}

impl<'a> RowStream<&'a [u8]> {
    pub fn from_xml(content: &'a str) -> Self {
        Self::from_reader(content.as_bytes())
    }
}

impl<R: BufRead> RowStream<R> {
    pub fn from_reader(source: R) -> Self {
        let mut reader = NsReader::from_reader(source);
        reader.config_mut().trim_text(false);
        Self {
            reader,
            buf: Vec::new(),
            row: ElementBuilder::default(),
            open: Vec::new(),
            finished: false,
        }
    }

    fn fail(&mut self, error: XmlParseError) -> Option<Result<XmlElement, XmlParseError>> {
        self.finished = true;
        Some(Err(error))
    }
}

impl<R: BufRead> Iterator for RowStream<R> {
    type Item = Result<XmlElement, XmlParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            self.buf.clear();
            let (resolved, event) = match self.reader.read_resolved_event_into(&mut self.buf) {
                Ok(pair) => pair,
                Err(e) => {
                    let error = syntax_error(&self.reader, e);
                    return self.fail(error);
                }
            };
            let in_row = self.row.depth() > 0;

            match event {
                Event::Start(e) => {
                    if in_row || (!self.open.is_empty() && e.local_name().as_ref() == ROW_ELEMENT.as_bytes()) {
                        let namespace = owned_namespace(resolved);
                        match element_from_start(&self.reader, namespace, &e) {
                            Ok(element) => self.row.open(element),
                            Err(err) => {
                                let error = syntax_error(&self.reader, err);
                                return self.fail(error);
                            }
                        }
                    } else {
                        self.open
                            .push(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                    }
                }
                Event::Empty(e) => {
                    if in_row || (!self.open.is_empty() && e.local_name().as_ref() == ROW_ELEMENT.as_bytes()) {
                        let namespace = owned_namespace(resolved);
                        match element_from_start(&self.reader, namespace, &e) {
                            Ok(element) => {
                                if let Some(row) = self.row.leaf(element) {
                                    return Some(Ok(row));
                                }
                            }
                            Err(err) => {
                                let error = syntax_error(&self.reader, err);
                                return self.fail(error);
                            }
                        }
                    }
                }
                Event::End(_) => {
                    if in_row {
                        if let Some(row) = self.row.close() {
                            return Some(Ok(row));
                        }
                    } else {
                        self.open.pop();
                    }
                }
                Event::Text(e) if in_row => match e.unescape() {
                    Ok(text) => self.row.text(&text),
                    Err(err) => {
                        let error = syntax_error(&self.reader, err);
                        return self.fail(error);
                    }
                },
                Event::CData(e) if in_row => self.row.text(&String::from_utf8_lossy(&e)),
                Event::Eof => {
                    self.finished = true;
                    let unclosed = self
                        .row
                        .innermost_name()
                        .map(str::to_string)
                        .or_else(|| self.open.last().cloned());
                    return unclosed.map(|name| Err(XmlParseError::Unclosed(name)));
                }
                _ => {}
            }
        }
    }
}
