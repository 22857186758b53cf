mod connection;
#[cfg(test)]
pub(crate) mod fake;
mod postgres;
mod query;
mod schema;
mod sqlite;

pub use connection::*;
pub use postgres::*;
pub use query::*;
pub use sqlite::*;

use anyhow::Result;
use async_trait::async_trait;

/// One column of a UNIQUE constraint whose column is declared NOT NULL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyColumnRow {
    pub constraint_name: String,
    pub column: String,
}

/// One column pairing of a FOREIGN KEY constraint as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyRow {
    pub constraint_name: String,
    pub column: String,
    pub ref_table: String,
    /// `None` when the engine leaves the referenced column implicit.
    pub ref_column: Option<String>,
}

/// A relational engine the grader can execute statements against and whose
/// metadata catalog it can read back afterwards.
///
/// One backend lives for exactly one evaluation run. Statements are submitted
/// strictly one at a time; every method takes `&mut self` so an implementation
/// never needs interior locking.
#[async_trait]
pub trait SqlBackend: Send {
    /// Short engine name used in logs.
    fn name(&self) -> &'static str;

    /// Execute a single statement, discarding any rows it returns.
    async fn execute(&mut self, sql: &str) -> std::result::Result<(), EngineError>;

    /// Base tables created during this run, ordered by name.
    async fn table_names(&mut self) -> Result<Vec<String>>;

    /// Column names of `table` in ordinal order.
    async fn columns(&mut self, table: &str) -> Result<Vec<String>>;

    /// Columns of the explicit PRIMARY KEY of `table`, empty when it has none.
    async fn primary_key(&mut self, table: &str) -> Result<Vec<String>>;

    async fn unique_not_null(&mut self, table: &str) -> Result<Vec<KeyColumnRow>>;

    async fn foreign_keys(&mut self, table: &str) -> Result<Vec<ForeignKeyRow>>;

    /// Tear down whatever scratch area the run created.
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
