//! Schema materialization
//!
//! Creates every table, then every view, from the descriptor tree. Each phase
//! runs in one transaction; a failing table or view is recorded and the
//! phase continues.

use std::collections::HashSet;

use super::{ConversionConfig, DatabaseError, DatabaseResult, SqliteStore};
use crate::convert::report::{ConversionIssue, ConversionReport};
use crate::convert::view_query::translate;
use crate::models::{SchemaDescriptor, TableDescriptor, ViewDescriptor, find_table};
use crate::validation::quote_identifier;

/// Creates tables and views in the target store
#[derive(Debug, Clone, Copy)]
pub struct SchemaMaterializer {
    create_foreign_keys: bool,
    create_views: bool,
}

impl SchemaMaterializer {
    pub fn new(create_foreign_keys: bool, create_views: bool) -> Self {
        Self {
            create_foreign_keys,
            create_views,
        }
    }

    pub fn from_config(config: &ConversionConfig) -> Self {
        Self::new(config.create_foreign_keys(), config.create_views())
    }

    /// Create all tables in schema order, then declaration order
    ///
    /// Returns the `(schema, table)` indexes of the descriptors whose
    /// `CREATE TABLE` succeeded. Only those may receive data: a failed
    /// duplicate shares its name with a table that was created.
    pub fn create_tables(
        &self,
        store: &mut SqliteStore,
        schemas: &[SchemaDescriptor],
        report: &mut ConversionReport,
    ) -> DatabaseResult<HashSet<(usize, usize)>> {
        let tx = store.transaction()?;
        let mut created = HashSet::new();

        let indexed = schemas.iter().enumerate().flat_map(|(s, schema)| {
            schema.tables.iter().enumerate().map(move |(t, table)| ((s, t), table))
        });
        for (index, table) in indexed {
            report.tables_attempted += 1;
            tracing::info!("Creating table: {}", table.name);

            let (sql, omitted) = create_table_sql(table, schemas, self.create_foreign_keys);
            for issue in omitted {
                tracing::warn!("{}", issue);
                report.add_issue(issue);
            }
            tracing::debug!("SQL: {}", sql);

            match tx.execute_batch(&sql) {
                Ok(()) => {
                    report.tables_created += 1;
                    created.insert(index);
                }
                Err(e) => {
                    tracing::error!("Failed to create table {}: {}", table.name, e);
                    report.add_issue(ConversionIssue::TableCreateFailed {
                        table: table.name.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        tx.commit()
            .map_err(|e| DatabaseError::TransactionFailed(format!("Commit failed: {}", e)))?;
        tracing::info!(
            "Created {} of {} tables",
            report.tables_created,
            report.tables_attempted
        );
        Ok(created)
    }

    /// Create all views from their translated queries
    ///
    /// Views that fail are retried while the previous pass created at least
    /// one view, so a view may reference a view declared after it.
    pub fn create_views(
        &self,
        store: &mut SqliteStore,
        schemas: &[SchemaDescriptor],
        report: &mut ConversionReport,
    ) -> DatabaseResult<()> {
        if !self.create_views {
            tracing::info!("View creation disabled");
            return Ok(());
        }

        let mut pending: Vec<(&ViewDescriptor, String)> = Vec::new();
        for view in schemas.iter().flat_map(|s| s.views.iter()) {
            report.views_attempted += 1;
            match view_sql(view) {
                Some(sql) => pending.push((view, sql)),
                None => {
                    tracing::warn!("View {} has no query, skipping", view.name);
                    report.add_issue(ConversionIssue::ViewSkipped {
                        view: view.name.clone(),
                        reason: "no query in metadata".to_string(),
                    });
                }
            }
        }
        if pending.is_empty() {
            return Ok(());
        }

        let tx = store.transaction()?;
        let mut pass = 1;
        loop {
            let mut failed = Vec::new();
            let before = pending.len();

            for (view, sql) in pending {
                tracing::debug!("SQL: {}", sql);
                match tx.execute_batch(&sql) {
                    Ok(()) => {
                        tracing::info!("Created view: {}", view.name);
                        report.views_created += 1;
                    }
                    Err(e) => failed.push((view, sql, e.to_string())),
                }
            }

            if failed.is_empty() || failed.len() == before {
                for (view, _, message) in failed {
                    tracing::error!("Failed to create view {}: {}", view.name, message);
                    report.add_issue(ConversionIssue::ViewCreateFailed {
                        view: view.name.clone(),
                        message,
                    });
                }
                break;
            }

            pass += 1;
            tracing::debug!("Retrying {} views (pass {})", failed.len(), pass);
            pending = failed.into_iter().map(|(view, sql, _)| (view, sql)).collect();
        }

        tx.commit()
            .map_err(|e| DatabaseError::TransactionFailed(format!("Commit failed: {}", e)))?;
        Ok(())
    }
}

/// `CREATE VIEW` statement for a view, `None` when it has no usable query
pub fn view_sql(view: &ViewDescriptor) -> Option<String> {
    let query = translate(view.query.as_deref()?);
    if query.is_empty() {
        return None;
    }
    Some(format!(
        "CREATE VIEW {} AS {}",
        quote_identifier(&view.name),
        query
    ))
}

fn column_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `CREATE TABLE` statement for a table, plus issues for constraints that had
/// to be left out
///
/// Foreign keys are emitted only when enabled, when the referenced table is
/// part of `schemas` and when every column on both sides exists.
pub fn create_table_sql(
    table: &TableDescriptor,
    schemas: &[SchemaDescriptor],
    create_foreign_keys: bool,
) -> (String, Vec<ConversionIssue>) {
    let mut issues = Vec::new();
    let mut defs: Vec<String> = table
        .columns
        .iter()
        .map(|column| {
            let mut def = format!(
                "{} {}",
                quote_identifier(&column.name),
                column.storage_type.sql_name()
            );
            // booleans stay nullable: 0/1/true/false ambiguity is resolved on import
            if !column.nullable && !column.is_boolean() {
                def.push_str(" NOT NULL");
            }
            def
        })
        .collect();

    if let Some(pk) = &table.primary_key {
        match pk.iter().find(|c| !table.has_column(c)) {
            None => defs.push(format!("PRIMARY KEY ({})", column_list(pk))),
            Some(missing) => issues.push(ConversionIssue::ConstraintOmitted {
                table: table.name.clone(),
                message: format!("primary key column {} does not exist", missing),
            }),
        }
    }

    if create_foreign_keys {
        for fk in &table.foreign_keys {
            let label = fk.name.as_deref().unwrap_or(&fk.referenced_table);
            if !fk.has_columns() {
                tracing::debug!("Foreign key {} on {} has no columns", label, table.name);
                continue;
            }
            let Some(target) =
                find_table(schemas, fk.referenced_schema.as_deref(), &fk.referenced_table)
            else {
                tracing::debug!(
                    "Foreign key {} on {} references unknown table {}",
                    label,
                    table.name,
                    fk.referenced_table
                );
                continue;
            };
            if let Some(missing) = fk.source_columns.iter().find(|c| !table.has_column(c)) {
                tracing::warn!(
                    "Foreign key {} on {}: column {} does not exist",
                    label,
                    table.name,
                    missing
                );
                continue;
            }
            if let Some(missing) = fk.target_columns.iter().find(|c| !target.has_column(c)) {
                tracing::warn!(
                    "Foreign key {} on {}: referenced column {}.{} does not exist",
                    label,
                    table.name,
                    target.name,
                    missing
                );
                continue;
            }

            let constraint = fk
                .name
                .as_deref()
                .map(|n| format!("CONSTRAINT {} ", quote_identifier(n)))
                .unwrap_or_default();
            defs.push(format!(
                "{}FOREIGN KEY ({}) REFERENCES {} ({})",
                constraint,
                column_list(&fk.source_columns),
                quote_identifier(&target.name),
                column_list(&fk.target_columns)
            ));
        }
    }

    let sql = format!(
        "CREATE TABLE {} (\n  {}\n)",
        quote_identifier(&table.name),
        defs.join(",\n  ")
    );
    (sql, issues)
}

/// Multi-row `INSERT` with `rows` groups of positional parameters
pub fn insert_sql(table: &TableDescriptor, rows: usize) -> String {
    let names: Vec<String> = table.columns.iter().map(|c| c.name.clone()).collect();
    let group = format!("({})", vec!["?"; names.len()].join(", "));
    format!(
        "INSERT INTO {} ({}) VALUES {}",
        quote_identifier(&table.name),
        column_list(&names),
        vec![group; rows.max(1)].join(", ")
    )
}
