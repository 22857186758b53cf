use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet};

use super::model::{ReferentialConstraint, Table};
use crate::db::{ForeignKeyRow, KeyColumnRow, SqlBackend};

/// Structure of one table as the engine catalog reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<String>,
    /// Declared primary key, empty when the table has none.
    pub primary_key: Vec<String>,
    /// UNIQUE constraints over NOT NULL columns, one entry per constraint.
    pub candidate_keys: Vec<Vec<String>>,
    /// Outgoing foreign keys. References back to the table itself are left out.
    pub references: Vec<ReferentialConstraint>,
}

impl TableSchema {
    pub fn has_primary_key(&self) -> bool {
        !self.primary_key.is_empty()
    }

    /// Build the model table: declared key first, then candidate keys, then
    /// references.
    pub fn into_table(self) -> Table {
        let mut table = Table::new(self.name, self.columns);
        if !self.primary_key.is_empty() {
            table.add_primary_key(self.primary_key);
        }
        for key in self.candidate_keys {
            table.add_primary_key(key);
        }
        for reference in self.references {
            table.add_reference(reference);
        }
        table
    }
}

pub async fn introspect_table<B: SqlBackend + ?Sized>(
    backend: &mut B,
    name: &str,
) -> Result<TableSchema> {
    let columns = backend.columns(name).await?;
    let primary_key = backend.primary_key(name).await?;
    let candidate_keys = group_candidate_keys(backend.unique_not_null(name).await?);
    let references = group_references(name, backend.foreign_keys(name).await?);

    tracing::debug!(
        "Table {}: {} columns, {} candidate keys, {} references",
        name,
        columns.len(),
        candidate_keys.len(),
        references.len()
    );

    Ok(TableSchema {
        name: name.to_string(),
        columns,
        primary_key,
        candidate_keys,
        references,
    })
}

fn group_candidate_keys(rows: Vec<KeyColumnRow>) -> Vec<Vec<String>> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for row in rows {
        let columns = grouped.entry(row.constraint_name).or_default();
        if !columns.contains(&row.column) {
            columns.push(row.column);
        }
    }
    grouped.into_values().collect()
}

fn group_references(table: &str, rows: Vec<ForeignKeyRow>) -> Vec<ReferentialConstraint> {
    let mut grouped: BTreeMap<String, ReferentialConstraint> = BTreeMap::new();
    for row in rows {
        if row.ref_table.eq_ignore_ascii_case(table) {
            continue;
        }
        let reference = grouped
            .entry(row.constraint_name.clone())
            .or_insert_with(|| ReferentialConstraint {
                name: row.constraint_name.clone(),
                columns: BTreeSet::new(),
                ref_table: row.ref_table.clone(),
                ref_columns: BTreeSet::new(),
            });
        reference.columns.insert(row.column);
        if let Some(ref_column) = row.ref_column {
            reference.ref_columns.insert(ref_column);
        }
    }
    grouped.into_values().collect()
}
