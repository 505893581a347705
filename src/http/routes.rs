//! Table browsing endpoints.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Map, Value};

use super::error::ApiError;
use super::AppState;
use crate::database::TableMeta;
use crate::service::{QueryOutcome, RowsPage, WriteOutcome};

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Paging query string. Unparseable values fall back to the defaults.
#[derive(Debug, Default, Deserialize)]
pub struct RowsParams {
    limit: Option<String>,
    offset: Option<String>,
}

impl RowsParams {
    fn number(raw: &Option<String>) -> Option<i64> {
        raw.as_deref().and_then(|v| v.trim().parse().ok())
    }
}

/// Body of an update request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pk_column: Option<String>,
    #[serde(default)]
    pk_value: Value,
    values: Option<Map<String, Value>>,
}

/// Body of an ad-hoc query request.
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    sql: Option<String>,
}

/// GET /api/tables
async fn list_tables(State(state): State<Arc<AppState>>) -> ApiResult<Vec<String>> {
    Ok(Json(state.service.list_tables().await?))
}

/// GET /api/table/{table}/meta
async fn table_meta(
    State(state): State<Arc<AppState>>,
    Path(table): Path<String>,
) -> ApiResult<TableMeta> {
    Ok(Json(state.service.get_meta(&table).await?))
}

/// GET /api/table/{table}/rows?limit=&offset=
async fn table_rows(
    State(state): State<Arc<AppState>>,
    Path(table): Path<String>,
    params: Result<Query<RowsParams>, QueryRejection>,
) -> ApiResult<RowsPage> {
    let Query(params) = params?;
    let page = state
        .service
        .get_rows(
            &table,
            RowsParams::number(&params.limit),
            RowsParams::number(&params.offset),
        )
        .await?;
    Ok(Json(page))
}

/// POST /api/table/{table}/insert
async fn insert_row(
    State(state): State<Arc<AppState>>,
    Path(table): Path<String>,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> ApiResult<WriteOutcome> {
    let Json(values) = body?;
    Ok(Json(state.service.insert_row(&table, &values).await?))
}

/// POST /api/table/{table}/update
async fn update_row(
    State(state): State<Arc<AppState>>,
    Path(table): Path<String>,
    body: Result<Json<UpdateRequest>, JsonRejection>,
) -> ApiResult<WriteOutcome> {
    let Json(request) = body?;
    let values = request.values.unwrap_or_default();
    let outcome = state
        .service
        .update_row(
            &table,
            request.pk_column.as_deref(),
            &request.pk_value,
            &values,
        )
        .await?;
    Ok(Json(outcome))
}

/// POST /api/query
async fn run_query(
    State(state): State<Arc<AppState>>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> ApiResult<QueryOutcome> {
    let Json(request) = body?;
    Ok(Json(state.service.run_select(request.sql.as_deref()).await?))
}

/// Table and query routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/tables", get(list_tables))
        .route("/api/table/{table}/meta", get(table_meta))
        .route("/api/table/{table}/rows", get(table_rows))
        .route("/api/table/{table}/insert", post(insert_row))
        .route("/api/table/{table}/update", post(update_row))
        .route("/api/query", post(run_query))
}
