use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio_postgres::Client;

use super::schema;
use super::{EngineError, ForeignKeyRow, KeyColumnRow, SqlBackend};
use super::{create_client, ConnectionConfig};

/// PostgreSQL backend. Every run works inside its own freshly created schema,
/// which is dropped again by [`SqlBackend::close`].
pub struct PostgresBackend {
    client: Client,
    schema: String,
}

impl PostgresBackend {
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let client = create_client(config).await?;
        Self::with_client(client).await
    }

    pub async fn with_client(client: Client) -> Result<Self> {
        let schema = format!("sqlgrade_{}", chrono::Utc::now().format("%Y%m%d%H%M%S%3f"));
        client
            .batch_execute(&format!(
                "CREATE SCHEMA {schema}; SET search_path TO {schema};"
            ))
            .await
            .with_context(|| format!("Failed to create scratch schema {}", schema))?;
        tracing::info!("Using scratch schema {}", schema);

        Ok(Self { client, schema })
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }
}

#[async_trait]
impl SqlBackend for PostgresBackend {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn execute(&mut self, sql: &str) -> std::result::Result<(), EngineError> {
        self.client
            .batch_execute(sql)
            .await
            .map_err(|e| EngineError::from_pg_error(&e, sql))
    }

    async fn table_names(&mut self) -> Result<Vec<String>> {
        schema::get_table_names(&self.client).await
    }

    async fn columns(&mut self, table: &str) -> Result<Vec<String>> {
        schema::get_columns(&self.client, table).await
    }

    async fn primary_key(&mut self, table: &str) -> Result<Vec<String>> {
        schema::get_primary_key(&self.client, table).await
    }

    async fn unique_not_null(&mut self, table: &str) -> Result<Vec<KeyColumnRow>> {
        schema::get_unique_not_null(&self.client, table).await
    }

    async fn foreign_keys(&mut self, table: &str) -> Result<Vec<ForeignKeyRow>> {
        schema::get_foreign_keys(&self.client, table).await
    }

    async fn close(&mut self) -> Result<()> {
        self.client
            .batch_execute(&format!("DROP SCHEMA IF EXISTS {} CASCADE", self.schema))
            .await
            .with_context(|| format!("Failed to drop scratch schema {}", self.schema))?;
        Ok(())
    }
}
