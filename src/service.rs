//! Table browsing operations.
//!
//! [`TableService`] ties identifier checks, schema introspection, statement
//! building and execution together. Every operation reads the schema fresh.

use crate::config::BrowseConfig;
use crate::database::{
    builder, ColumnInfo, MetadataQueries, Page, QueryExecutor, ResultRow, TableMeta,
};
use crate::error::ServerError;
use crate::security::SelectGuard;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// Note returned with every ad-hoc query result.
pub const QUERY_NOTE: &str = "Read-only SELECT; results are capped";

/// A page of rows.
#[derive(Debug, Clone, Serialize)]
pub struct RowsPage {
    pub table: String,
    pub limit: i64,
    pub offset: i64,
    pub rows: Vec<ResultRow>,
}

/// Outcome of an insert or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteOutcome {
    pub ok: bool,
    pub affected_rows: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_insert_id: Option<u64>,
}

/// Outcome of an ad-hoc SELECT.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    pub ok: bool,
    pub rows: Vec<ResultRow>,
    pub columns: Vec<ColumnInfo>,
    pub truncated: bool,
    pub note: String,
}

/// Table browsing operations over one database.
pub struct TableService {
    executor: Arc<QueryExecutor>,
    metadata: MetadataQueries,
    guard: SelectGuard,
    limits: BrowseConfig,
}

impl TableService {
    /// Create a service over an executor.
    pub fn new(executor: Arc<QueryExecutor>, limits: BrowseConfig) -> Self {
        Self {
            metadata: MetadataQueries::new(Arc::clone(&executor)),
            guard: SelectGuard::new(limits.max_query_length),
            executor,
            limits,
        }
    }

    /// The executor used by this service.
    pub fn executor(&self) -> &QueryExecutor {
        &self.executor
    }

    /// Base tables of the current database, ordered by name.
    pub async fn list_tables(&self) -> Result<Vec<String>, ServerError> {
        self.metadata.list_tables().await
    }

    /// Columns and primary key of a table.
    pub async fn get_meta(&self, table: &str) -> Result<TableMeta, ServerError> {
        self.metadata.table_meta(table).await
    }

    /// One page of rows. Limit and offset are clamped and echoed back.
    pub async fn get_rows(
        &self,
        table: &str,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<RowsPage, ServerError> {
        let table = self.metadata.resolve_table(table).await?;
        let page = Page::clamped(
            limit,
            offset,
            self.limits.default_page_size,
            self.limits.max_page_size,
        );

        let result = self
            .executor
            .fetch(&builder::page(&table, page), page.limit as usize)
            .await?;

        Ok(RowsPage {
            table,
            limit: page.limit,
            offset: page.offset,
            rows: result.rows,
        })
    }

    /// Insert one row built from the known columns in `values`.
    pub async fn insert_row(
        &self,
        table: &str,
        values: &Map<String, Value>,
    ) -> Result<WriteOutcome, ServerError> {
        let meta = self.metadata.table_meta(table).await?;
        let statement = builder::insert(&meta, values)?;
        let result = self.executor.execute(&statement).await?;

        info!(
            "Inserted {} row(s) into {}",
            result.rows_affected, meta.table
        );

        Ok(WriteOutcome {
            ok: true,
            affected_rows: result.rows_affected,
            last_insert_id: result.last_insert_id,
        })
    }

    /// Update the row whose `pk_column` equals `pk_value`.
    pub async fn update_row(
        &self,
        table: &str,
        pk_column: Option<&str>,
        pk_value: &Value,
        values: &Map<String, Value>,
    ) -> Result<WriteOutcome, ServerError> {
        let meta = self.metadata.table_meta(table).await?;
        let statement = builder::update(&meta, pk_column, pk_value, values)?;
        let result = self.executor.execute(&statement).await?;

        info!("Updated {} row(s) in {}", result.rows_affected, meta.table);

        Ok(WriteOutcome {
            ok: true,
            affected_rows: result.rows_affected,
            last_insert_id: None,
        })
    }

    /// Run a read-only SELECT capped at the configured row count.
    pub async fn run_select(&self, sql: Option<&str>) -> Result<QueryOutcome, ServerError> {
        let sql = self.guard.check(sql)?;
        let cap = self.limits.query_row_cap;

        // One extra row tells a capped result from one that fits exactly.
        let statement = builder::select_capped(sql, cap.saturating_add(1));
        let result = self
            .executor
            .fetch(&statement, cap)
            .await
            .map_err(as_sql_error)?;

        Ok(QueryOutcome {
            ok: true,
            rows: result.rows,
            columns: result.columns,
            truncated: result.truncated,
            note: QUERY_NOTE.to_string(),
        })
    }
}

/// Report database failures of an ad-hoc SELECT with the driver's message.
fn as_sql_error(err: ServerError) -> ServerError {
    match err {
        ServerError::Timeout(_)
        | ServerError::Connection { .. }
        | ServerError::Authentication(_)
        | ServerError::DatabaseNotFound(_)
        | ServerError::Internal(_) => err,
        other => {
            warn!("Ad-hoc query failed: {}", other);
            ServerError::sql(other.detail())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::database::create_lazy_pool;
    use crate::error::from_sql_error;
    use std::time::Duration;

    fn lazy_service(limits: BrowseConfig) -> TableService {
        let mut config = DatabaseConfig::new("127.0.0.1", "unused");
        config.port = 1;
        config.pool.connection_timeout = Duration::from_millis(200);
        let executor = QueryExecutor::new(create_lazy_pool(&config), Duration::from_secs(1));
        TableService::new(Arc::new(executor), limits)
    }

    #[test]
    fn test_write_outcome_serialization() {
        let outcome = WriteOutcome {
            ok: true,
            affected_rows: 1,
            last_insert_id: Some(7),
        };
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            serde_json::json!({"ok": true, "affectedRows": 1, "lastInsertId": 7})
        );

        let outcome = WriteOutcome {
            last_insert_id: None,
            ..outcome
        };
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            serde_json::json!({"ok": true, "affectedRows": 1})
        );
    }

    #[test]
    fn test_as_sql_error() {
        let err = as_sql_error(from_sql_error(1054, "Unknown column 'x' in 'field list'"));
        assert!(matches!(err, ServerError::Sql(_)));
        assert!(err.to_string().starts_with("SQL error: "));
        assert!(err.to_string().contains("Unknown column 'x'"));

        assert!(matches!(
            as_sql_error(ServerError::timeout(5)),
            ServerError::Timeout(_)
        ));
        assert!(matches!(
            as_sql_error(ServerError::connection("down")),
            ServerError::Connection { .. }
        ));
    }

    #[tokio::test]
    async fn test_run_select_rejects_before_touching_database() {
        let service = lazy_service(BrowseConfig::default());

        assert!(matches!(
            service.run_select(None).await,
            Err(ServerError::InvalidInput(_))
        ));
        assert!(matches!(
            service.run_select(Some("DELETE FROM users")).await,
            Err(ServerError::ValidationFailed(_))
        ));
        assert!(matches!(
            service.run_select(Some("SELECT 1; DROP TABLE users")).await,
            Err(ServerError::ValidationFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_table_names_fail_before_touching_database() {
        let service = lazy_service(BrowseConfig::default());

        assert!(matches!(
            service.get_meta("users; --").await,
            Err(ServerError::InvalidInput(_))
        ));
        assert!(matches!(
            service.get_rows("", None, None).await,
            Err(ServerError::InvalidInput(_))
        ));
        assert!(matches!(
            service.insert_row("a b", &Map::new()).await,
            Err(ServerError::InvalidInput(_))
        ));
        assert!(matches!(
            service
                .update_row("x`y", Some("id"), &Value::Null, &Map::new())
                .await,
            Err(ServerError::InvalidInput(_))
        ));
    }
}
