//! MySQL metadata queries for schema introspection.
//!
//! Every call goes to `information_schema`; nothing is cached, so DDL made
//! by other clients is visible on the next request.

use crate::database::builder::Statement;
use crate::database::types::SqlValue;
use crate::database::{QueryExecutor, ResultRow};
use crate::error::ServerError;
use crate::security::is_identifier;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

const LIST_TABLES_SQL: &str = "SELECT table_name AS table_name \
     FROM information_schema.tables \
     WHERE table_schema = DATABASE() AND table_type = 'BASE TABLE' \
     ORDER BY table_name";

const LIST_COLUMNS_SQL: &str = "SELECT column_name AS column_name, data_type AS data_type, \
     is_nullable AS is_nullable, column_key AS column_key, extra AS extra \
     FROM information_schema.columns \
     WHERE table_schema = DATABASE() AND table_name = ? \
     ORDER BY ordinal_position";

const PRIMARY_KEY_SQL: &str = "SELECT column_name AS column_name \
     FROM information_schema.key_column_usage \
     WHERE table_schema = DATABASE() AND table_name = ? AND constraint_name = 'PRIMARY' \
     ORDER BY ordinal_position";

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMeta {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
}

/// Table metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMeta {
    /// Canonical table name, as stored in the schema.
    pub table: String,
    /// Columns in ordinal order.
    pub columns: Vec<ColumnMeta>,
    /// Primary key columns in key order.
    pub primary_key_columns: Vec<String>,
}

impl TableMeta {
    /// The primary key column, if the key has exactly one column.
    pub fn primary_key_single(&self) -> Option<&str> {
        match self.primary_key_columns.as_slice() {
            [only] => Some(only.as_str()),
            _ => None,
        }
    }

    /// Look up a column by its exact name.
    pub fn column(&self, name: &str) -> Option<&ColumnMeta> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Whether `name` is part of the primary key.
    pub fn is_primary_key(&self, name: &str) -> bool {
        self.primary_key_columns.iter().any(|c| c == name)
    }
}

/// Metadata query builder.
pub struct MetadataQueries {
    executor: Arc<QueryExecutor>,
}

impl MetadataQueries {
    /// Create a new metadata query builder.
    pub fn new(executor: Arc<QueryExecutor>) -> Self {
        Self { executor }
    }

    /// List the base tables of the current database, ordered by name.
    pub async fn list_tables(&self) -> Result<Vec<String>, ServerError> {
        let result = self
            .executor
            .fetch(&Statement::new(LIST_TABLES_SQL), usize::MAX)
            .await?;

        Ok(result
            .rows
            .iter()
            .filter_map(|row| extract_string(row, "table_name"))
            .collect())
    }

    /// Validate a table name and return its canonical spelling.
    ///
    /// Matching is case-insensitive; the name stored in the schema wins.
    pub async fn resolve_table(&self, name: &str) -> Result<String, ServerError> {
        check_table_name(name)?;

        let tables = self.list_tables().await?;
        match find_table(&tables, name) {
            Some(canonical) => Ok(canonical.to_string()),
            None => Err(ServerError::table_not_found(name)),
        }
    }

    /// Resolve a table and load its columns and primary key.
    pub async fn table_meta(&self, name: &str) -> Result<TableMeta, ServerError> {
        let table = self.resolve_table(name).await?;
        self.load_meta(table).await
    }

    /// Load metadata for a table name that is already canonical.
    async fn load_meta(&self, table: String) -> Result<TableMeta, ServerError> {
        let columns = self
            .executor
            .fetch(
                &Statement::new(LIST_COLUMNS_SQL).with_param(table.as_str()),
                usize::MAX,
            )
            .await?
            .rows
            .iter()
            .map(column_from_row)
            .collect::<Vec<_>>();

        let primary_key_columns = self
            .executor
            .fetch(
                &Statement::new(PRIMARY_KEY_SQL).with_param(table.as_str()),
                usize::MAX,
            )
            .await?
            .rows
            .iter()
            .filter_map(|row| extract_string(row, "column_name"))
            .collect::<Vec<_>>();

        debug!(
            "Loaded metadata for {}: {} columns, primary key {:?}",
            table,
            columns.len(),
            primary_key_columns
        );

        Ok(TableMeta {
            table,
            columns,
            primary_key_columns,
        })
    }
}

/// Reject table names that are blank or fail the identifier whitelist.
pub fn check_table_name(name: &str) -> Result<(), ServerError> {
    if name.trim().is_empty() {
        return Err(ServerError::invalid_input("Table name is required"));
    }
    if !is_identifier(name) {
        return Err(ServerError::invalid_input(format!(
            "Invalid table name '{}'",
            name
        )));
    }
    Ok(())
}

/// Find a table by case-insensitive name.
pub fn find_table<'a>(tables: &'a [String], name: &str) -> Option<&'a str> {
    tables
        .iter()
        .find(|t| t.eq_ignore_ascii_case(name))
        .map(String::as_str)
}

/// Build column metadata from an `information_schema.columns` row.
fn column_from_row(row: &ResultRow) -> ColumnMeta {
    let flag = |column: &str, expected: &str| {
        extract_string(row, column)
            .map(|v| v.eq_ignore_ascii_case(expected))
            .unwrap_or(false)
    };

    ColumnMeta {
        name: extract_string(row, "column_name").unwrap_or_default(),
        data_type: extract_string(row, "data_type").unwrap_or_default(),
        nullable: flag("is_nullable", "YES"),
        primary_key: flag("column_key", "PRI"),
        auto_increment: extract_string(row, "extra")
            .map(|extra| extra.to_lowercase().contains("auto_increment"))
            .unwrap_or(false),
    }
}

// information_schema columns come back as VARBINARY on some servers, so bytes are read as UTF-8.
fn extract_string(row: &ResultRow, column: &str) -> Option<String> {
    match row.get(column)? {
        SqlValue::String(s) => Some(s.clone()),
        SqlValue::Bytes(b) => Some(String::from_utf8_lossy(b).into_owned()),
        SqlValue::Null => None,
        other => Some(other.to_display_string()),
    }
}
