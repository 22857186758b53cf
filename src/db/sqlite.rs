use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection};

use super::{EngineError, ForeignKeyRow, KeyColumnRow, SqlBackend};

/// In-memory SQLite backend. The database disappears with the connection, so
/// every run starts from an empty catalog.
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory SQLite")?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        Ok(Self { conn })
    }

    fn query_strings(&self, sql: &str, table: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params![table], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

#[async_trait]
impl SqlBackend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn execute(&mut self, sql: &str) -> std::result::Result<(), EngineError> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| EngineError::from_sqlite_error(&e))?;
        let mut rows = stmt
            .query([])
            .map_err(|e| EngineError::from_sqlite_error(&e))?;
        while rows
            .next()
            .map_err(|e| EngineError::from_sqlite_error(&e))?
            .is_some()
        {}
        Ok(())
    }

    async fn table_names(&mut self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
             ORDER BY name",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to list tables")
    }

    async fn columns(&mut self, table: &str) -> Result<Vec<String>> {
        self.query_strings("SELECT name FROM pragma_table_info(?1) ORDER BY cid", table)
            .with_context(|| format!("Failed to read columns of {}", table))
    }

    async fn primary_key(&mut self, table: &str) -> Result<Vec<String>> {
        self.query_strings(
            "SELECT name FROM pragma_table_info(?1) WHERE pk > 0 ORDER BY pk",
            table,
        )
        .with_context(|| format!("Failed to read primary key of {}", table))
    }

    async fn unique_not_null(&mut self, table: &str) -> Result<Vec<KeyColumnRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT il.name, ii.name \
             FROM pragma_index_list(?1) AS il \
             JOIN pragma_index_info(il.name) AS ii \
             JOIN pragma_table_info(?1) AS ti ON ti.name = ii.name \
             WHERE il.\"unique\" = 1 AND il.origin = 'u' AND ti.\"notnull\" = 1 \
             ORDER BY il.name, ii.seqno",
        )?;
        let rows = stmt.query_map(params![table], |row| {
            Ok(KeyColumnRow {
                constraint_name: row.get(0)?,
                column: row.get(1)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("Failed to read unique constraints of {}", table))
    }

    async fn foreign_keys(&mut self, table: &str) -> Result<Vec<ForeignKeyRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, \"from\", \"table\", \"to\" \
             FROM pragma_foreign_key_list(?1) \
             ORDER BY id, seq",
        )?;
        let rows = stmt.query_map(params![table], |row| {
            Ok(ForeignKeyRow {
                constraint_name: format!("fk_{}", row.get::<_, i64>(0)?),
                column: row.get(1)?,
                ref_table: row.get(2)?,
                ref_column: row.get(3)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("Failed to read foreign keys of {}", table))
    }
}
