use anyhow::{Context, Result};
use tokio_postgres::Client;

use super::{ForeignKeyRow, KeyColumnRow};

pub async fn get_table_names(client: &Client) -> Result<Vec<String>> {
    let rows = client
        .query(
            r#"
            SELECT table_name::text AS name
            FROM information_schema.tables
            WHERE table_schema = current_schema()
              AND table_type = 'BASE TABLE'
            ORDER BY table_name
            "#,
            &[],
        )
        .await
        .context("Failed to list tables")?;

    Ok(rows.iter().map(|row| row.get("name")).collect())
}

pub async fn get_columns(client: &Client, table: &str) -> Result<Vec<String>> {
    let rows = client
        .query(
            r#"
            SELECT column_name::text AS name
            FROM information_schema.columns
            WHERE table_schema = current_schema() AND table_name = $1
            ORDER BY ordinal_position
            "#,
            &[&table],
        )
        .await
        .with_context(|| format!("Failed to read columns of {}", table))?;

    Ok(rows.iter().map(|row| row.get("name")).collect())
}

pub async fn get_primary_key(client: &Client, table: &str) -> Result<Vec<String>> {
    let rows = client
        .query(
            r#"
            SELECT kcu.column_name::text AS name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON kcu.constraint_schema = tc.constraint_schema
                AND kcu.constraint_name = tc.constraint_name
            WHERE tc.constraint_type = 'PRIMARY KEY'
              AND tc.table_schema = current_schema()
              AND tc.table_name = $1
            ORDER BY kcu.ordinal_position
            "#,
            &[&table],
        )
        .await
        .with_context(|| format!("Failed to read primary key of {}", table))?;

    Ok(rows.iter().map(|row| row.get("name")).collect())
}

pub async fn get_unique_not_null(client: &Client, table: &str) -> Result<Vec<KeyColumnRow>> {
    let rows = client
        .query(
            r#"
            SELECT tc.constraint_name::text AS constraint_name, c.column_name::text AS name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON kcu.constraint_schema = tc.constraint_schema
                AND kcu.constraint_name = tc.constraint_name
            JOIN information_schema.columns c
                ON c.table_schema = tc.table_schema
                AND c.table_name = tc.table_name
                AND c.column_name = kcu.column_name
            WHERE tc.constraint_type = 'UNIQUE'
              AND c.is_nullable = 'NO'
              AND tc.table_schema = current_schema()
              AND tc.table_name = $1
            ORDER BY tc.constraint_name, kcu.ordinal_position
            "#,
            &[&table],
        )
        .await
        .with_context(|| format!("Failed to read unique constraints of {}", table))?;

    let key_columns = rows
        .iter()
        .map(|row| KeyColumnRow {
            constraint_name: row.get("constraint_name"),
            column: row.get("name"),
        })
        .collect();

    Ok(key_columns)
}

pub async fn get_foreign_keys(client: &Client, table: &str) -> Result<Vec<ForeignKeyRow>> {
    let rows = client
        .query(
            r#"
            SELECT
                rc.constraint_name::text AS constraint_name,
                kcu.column_name::text AS source_column,
                ccu.table_name::text AS ref_table,
                ccu.column_name::text AS ref_column
            FROM information_schema.referential_constraints rc
            JOIN information_schema.key_column_usage kcu
                ON kcu.constraint_schema = rc.constraint_schema
                AND kcu.constraint_name = rc.constraint_name
            JOIN information_schema.constraint_column_usage ccu
                ON ccu.constraint_schema = rc.unique_constraint_schema
                AND ccu.constraint_name = rc.unique_constraint_name
            WHERE kcu.table_schema = current_schema() AND kcu.table_name = $1
            ORDER BY rc.constraint_name, kcu.ordinal_position
            "#,
            &[&table],
        )
        .await
        .with_context(|| format!("Failed to read foreign keys of {}", table))?;

    let foreign_keys = rows
        .iter()
        .map(|row| ForeignKeyRow {
            constraint_name: row.get("constraint_name"),
            column: row.get("source_column"),
            ref_table: row.get("ref_table"),
            ref_column: row.get("ref_column"),
        })
        .collect();

    Ok(foreign_keys)
}
