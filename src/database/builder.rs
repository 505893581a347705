//! Statement construction for paging, inserts and updates.
//!
//! Values are always bound as parameters. Only table and column names are
//! interpolated into SQL text, and only after they passed the identifier
//! whitelist and matched the table's metadata.

use crate::database::metadata::TableMeta;
use crate::database::types::SqlValue;
use crate::error::ServerError;
use crate::security::{is_identifier, quote_identifier, wrap_with_limit};
use serde_json::{Map, Value};

/// A SQL statement with its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Statement {
    /// Create a statement without parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Append a positional parameter.
    pub fn with_param(mut self, value: impl Into<SqlValue>) -> Self {
        self.params.push(value.into());
        self
    }
}

/// A clamped page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    /// Clamp a requested page: `limit` into `[1, max_limit]`, `offset` to `>= 0`.
    pub fn clamped(limit: Option<i64>, offset: Option<i64>, default_limit: i64, max_limit: i64) -> Self {
        Self {
            limit: limit.unwrap_or(default_limit).max(1).min(max_limit.max(1)),
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

/// Build `SELECT * ... LIMIT ? OFFSET ?` for a canonical table name.
pub fn page(table: &str, page: Page) -> Statement {
    Statement::new(format!(
        "SELECT * FROM {} LIMIT ? OFFSET ?",
        quote_identifier(table)
    ))
    .with_param(page.limit)
    .with_param(page.offset)
}

/// Build an INSERT from caller-supplied values.
///
/// Unknown or non-whitelisted keys are dropped, as are auto-increment
/// columns whose value is null or blank.
pub fn insert(meta: &TableMeta, values: &Map<String, Value>) -> Result<Statement, ServerError> {
    let mut columns = Vec::new();
    let mut params = Vec::new();

    for (name, value) in values {
        let Some(column) = known_column(meta, name) else {
            continue;
        };
        let value = SqlValue::from_json(value);
        if column.auto_increment && value.is_blank() {
            continue;
        }
        columns.push(quote_identifier(&column.name));
        params.push(value);
    }

    if columns.is_empty() {
        return Err(ServerError::invalid_input("No valid columns to insert"));
    }

    let placeholders = vec!["?"; columns.len()].join(", ");
    Ok(Statement {
        sql: format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_identifier(&meta.table),
            columns.join(", "),
            placeholders
        ),
        params,
    })
}

/// Build an UPDATE of one row identified by a primary key column.
///
/// Primary key columns are never updated; unknown or non-whitelisted keys
/// are dropped.
pub fn update(
    meta: &TableMeta,
    pk_column: Option<&str>,
    pk_value: &Value,
    values: &Map<String, Value>,
) -> Result<Statement, ServerError> {
    let pk_column = match pk_column {
        Some(c) if !c.trim().is_empty() => c,
        _ => return Err(ServerError::invalid_input("pkColumn is required")),
    };
    if !is_identifier(pk_column) {
        return Err(ServerError::invalid_input(format!(
            "Invalid pkColumn '{}'",
            pk_column
        )));
    }
    if !meta.is_primary_key(pk_column) {
        return Err(ServerError::invalid_input(format!(
            "Column '{}' is not part of the primary key of '{}'",
            pk_column, meta.table
        )));
    }

    let mut assignments = Vec::new();
    let mut params = Vec::new();

    for (name, value) in values {
        let Some(column) = known_column(meta, name) else {
            continue;
        };
        if meta.is_primary_key(&column.name) {
            continue;
        }
        assignments.push(format!("{} = ?", quote_identifier(&column.name)));
        params.push(SqlValue::from_json(value));
    }

    if assignments.is_empty() {
        return Err(ServerError::invalid_input("No valid columns to update"));
    }

    params.push(SqlValue::from_json(pk_value));
    Ok(Statement {
        sql: format!(
            "UPDATE {} SET {} WHERE {} = ?",
            quote_identifier(&meta.table),
            assignments.join(", "),
            quote_identifier(pk_column)
        ),
        params,
    })
}

/// Wrap a checked ad-hoc SELECT in an outer row cap.
pub fn select_capped(sql: &str, cap: usize) -> Statement {
    Statement::new(wrap_with_limit(sql, cap))
}

fn known_column<'a>(
    meta: &'a TableMeta,
    name: &str,
) -> Option<&'a crate::database::metadata::ColumnMeta> {
    if !is_identifier(name) {
        return None;
    }
    meta.column(name)
}
