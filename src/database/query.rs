//! Statement execution and result handling.

use crate::constants::LOG_QUERY_TRUNCATE_LENGTH;
use crate::database::builder::Statement;
use crate::database::types::{SqlValue, TypeMapper};
use crate::error::ServerError;
use futures_util::TryStreamExt;
use serde::ser::{Serialize, SerializeMap, Serializer};
use sqlx::mysql::{MySqlArguments, MySqlPool, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, MySql, Row, TypeInfo};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// A single row of query results.
///
/// Columns keep the order the server returned them in and serialize as a
/// JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultRow {
    columns: Vec<(String, SqlValue)>,
}

impl ResultRow {
    /// Create a new result row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a row with room for `capacity` columns.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            columns: Vec::with_capacity(capacity),
        }
    }

    /// Get a value by column name.
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Insert a value, replacing an earlier column of the same name.
    pub fn insert(&mut self, column: String, value: SqlValue) {
        match self.columns.iter_mut().find(|(name, _)| *name == column) {
            Some(slot) => slot.1 = value,
            None => self.columns.push((column, value)),
        }
    }

    /// Number of columns in the row.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterate over `(column, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl Serialize for ResultRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Information about a result column.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,

    /// SQL type name as reported by the server.
    pub sql_type: String,
}

/// Result of a statement execution.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    /// Columns in order. Empty when no row was returned.
    pub columns: Vec<ColumnInfo>,

    /// Result rows.
    pub rows: Vec<ResultRow>,

    /// Number of rows affected (for INSERT/UPDATE).
    pub rows_affected: u64,

    /// Generated AUTO_INCREMENT value of an INSERT, when there is one.
    pub last_insert_id: Option<u64>,

    /// Execution time in milliseconds.
    pub execution_time_ms: u64,

    /// Whether rows were dropped because of the row limit.
    pub truncated: bool,
}

impl QueryResult {
    /// Create an empty query result.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Executes statements against the pool with a per-statement timeout.
pub struct QueryExecutor {
    pool: MySqlPool,
    timeout: Duration,
}

impl QueryExecutor {
    /// Create a new query executor.
    pub fn new(pool: MySqlPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// The underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Run a row-returning statement, keeping at most `max_rows` rows.
    pub async fn fetch(
        &self,
        statement: &Statement,
        max_rows: usize,
    ) -> Result<QueryResult, ServerError> {
        let start = Instant::now();

        debug!(
            "Executing query: {}",
            truncate_for_log(&statement.sql, LOG_QUERY_TRUNCATE_LENGTH)
        );

        let mut result = self
            .with_timeout(async {
                let mut stream = bind(statement).fetch(&self.pool);
                let mut result = QueryResult::empty();

                while let Some(row) = stream.try_next().await? {
                    if result.rows.len() >= max_rows {
                        result.truncated = true;
                        break;
                    }
                    if result.columns.is_empty() {
                        result.columns = column_info(&row);
                    }
                    result.rows.push(row_to_result(&row)?);
                }

                Ok::<_, ServerError>(result)
            })
            .await?;

        result.execution_time_ms = start.elapsed().as_millis() as u64;

        debug!(
            "Query completed: {} rows in {} ms{}",
            result.rows.len(),
            result.execution_time_ms,
            if result.truncated { " (truncated)" } else { "" }
        );

        Ok(result)
    }

    /// Run a statement that modifies data (INSERT/UPDATE).
    pub async fn execute(&self, statement: &Statement) -> Result<QueryResult, ServerError> {
        let start = Instant::now();

        debug!(
            "Executing non-query: {}",
            truncate_for_log(&statement.sql, LOG_QUERY_TRUNCATE_LENGTH)
        );

        let done = self
            .with_timeout(async { Ok::<_, ServerError>(bind(statement).execute(&self.pool).await?) })
            .await?;

        let rows_affected = done.rows_affected();
        debug!("Non-query completed: {} rows affected", rows_affected);

        Ok(QueryResult {
            rows_affected,
            last_insert_id: Some(done.last_insert_id()).filter(|id| *id != 0),
            execution_time_ms: start.elapsed().as_millis() as u64,
            ..QueryResult::empty()
        })
    }

    /// Check that the database answers.
    pub async fn ping(&self) -> Result<(), ServerError> {
        self.with_timeout(async {
            sqlx::query("SELECT 1").execute(&self.pool).await?;
            Ok::<_, ServerError>(())
        })
        .await
    }

    async fn with_timeout<T, F>(&self, fut: F) -> Result<T, ServerError>
    where
        F: Future<Output = Result<T, ServerError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Statement exceeded {:?}", self.timeout);
                Err(ServerError::timeout(self.timeout.as_secs()))
            }
        }
    }
}

fn bind(statement: &Statement) -> Query<'_, MySql, MySqlArguments> {
    statement
        .params
        .iter()
        .fold(sqlx::query(&statement.sql), |query, param| {
            param.bind_to(query)
        })
}

fn column_info(row: &MySqlRow) -> Vec<ColumnInfo> {
    row.columns()
        .iter()
        .map(|col| ColumnInfo {
            name: col.name().to_string(),
            sql_type: col.type_info().name().to_string(),
        })
        .collect()
}

fn row_to_result(row: &MySqlRow) -> Result<ResultRow, ServerError> {
    let mut result = ResultRow::with_capacity(row.len());
    for (idx, col) in row.columns().iter().enumerate() {
        result.insert(col.name().to_string(), TypeMapper::extract_column(row, idx)?);
    }
    Ok(result)
}

/// Truncate a string for logging purposes.
fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}
