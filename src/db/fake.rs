//! Scripted in-process backend for tests.

use anyhow::Result;
use async_trait::async_trait;

use super::{EngineError, ForeignKeyRow, KeyColumnRow, SqlBackend};

#[derive(Debug, Clone, Default)]
pub struct FakeTable {
    pub name: String,
    pub columns: Vec<String>,
    pub primary_key: Vec<String>,
    pub unique_not_null: Vec<KeyColumnRow>,
    pub foreign_keys: Vec<ForeignKeyRow>,
}

impl FakeTable {
    pub fn new(name: &str, columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn with_primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_unique(mut self, constraint: &str, column: &str) -> Self {
        self.unique_not_null.push(KeyColumnRow {
            constraint_name: constraint.to_string(),
            column: column.to_string(),
        });
        self
    }

    pub fn with_foreign_key(
        mut self,
        constraint: &str,
        column: &str,
        ref_table: &str,
        ref_column: &str,
    ) -> Self {
        self.foreign_keys.push(ForeignKeyRow {
            constraint_name: constraint.to_string(),
            column: column.to_string(),
            ref_table: ref_table.to_string(),
            ref_column: Some(ref_column.to_string()),
        });
        self
    }
}

/// Fails every statement containing one of the scripted fragments and
/// records everything it was asked to run.
#[derive(Debug, Default)]
pub struct FakeBackend {
    pub executed: Vec<String>,
    pub rejections: Vec<(String, EngineError)>,
    pub tables: Vec<FakeTable>,
    pub closed: bool,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject(mut self, fragment: &str, error: EngineError) -> Self {
        self.rejections.push((fragment.to_string(), error));
        self
    }

    pub fn with_table(mut self, table: FakeTable) -> Self {
        self.tables.push(table);
        self
    }

    fn table(&self, name: &str) -> Result<&FakeTable> {
        self.tables
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| anyhow::anyhow!("no such table: {}", name))
    }
}

#[async_trait]
impl SqlBackend for FakeBackend {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn execute(&mut self, sql: &str) -> std::result::Result<(), EngineError> {
        self.executed.push(sql.to_string());
        match self.rejections.iter().find(|(fragment, _)| sql.contains(fragment)) {
            Some((_, error)) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn table_names(&mut self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.tables.iter().map(|t| t.name.clone()).collect();
        names.sort();
        Ok(names)
    }

    async fn columns(&mut self, table: &str) -> Result<Vec<String>> {
        Ok(self.table(table)?.columns.clone())
    }

    async fn primary_key(&mut self, table: &str) -> Result<Vec<String>> {
        Ok(self.table(table)?.primary_key.clone())
    }

    async fn unique_not_null(&mut self, table: &str) -> Result<Vec<KeyColumnRow>> {
        Ok(self.table(table)?.unique_not_null.clone())
    }

    async fn foreign_keys(&mut self, table: &str) -> Result<Vec<ForeignKeyRow>> {
        Ok(self.table(table)?.foreign_keys.clone())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
