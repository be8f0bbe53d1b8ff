//! Routes for loading tables and dispatching table update ops.

use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::ops::TableOp;
use db::models::table::Database;
use db::models::table_ref::TableRef;
use serde::{Deserialize, Serialize};
use services::services::loader::FetchContext;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

#[derive(Debug, Clone, Deserialize, TS)]
pub struct FetchTablesQuery {
    /// Tool the page belongs to; used for dependency fallback.
    pub tool: String,
    /// Comma-separated table names. Omitted or empty means the tool's
    /// declared dependency set.
    pub names: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpdateTableRequest {
    pub tool: String,
    /// Present when the target is a manufacturer-scoped family.
    pub manufacturer_id: Option<String>,
    pub ops: Vec<TableOp>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpdateTableResponse {
    pub affected: u64,
}

/// GET /api/tables?tool=orders&names=orders,customers
///
/// Returns only the tables that were not already loaded; previously loaded
/// tables are served from shared state and never re-fetched.
pub async fn get_tables(
    State(state): State<AppState>,
    Query(query): Query<FetchTablesQuery>,
) -> Result<ResponseJson<ApiResponse<Database>>, ApiError> {
    let names: Vec<String> = query
        .names
        .as_deref()
        .unwrap_or("")
        .split(',')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    let fetched = state
        .loader
        .fetch_tables(&names, &FetchContext::for_tool(&query.tool))
        .await?;
    Ok(ResponseJson(ApiResponse::success(fetched)))
}

/// GET /api/tables/phased?tool=estimator
///
/// The estimator's startup fetch: its table set is loaded in phases, each
/// phase concurrently, and the merged result returned.
pub async fn get_tables_phased(
    State(state): State<AppState>,
    Query(query): Query<FetchTablesQuery>,
) -> Result<ResponseJson<ApiResponse<Database>>, ApiError> {
    let fetched = state
        .loader
        .fetch_phased(&FetchContext::for_tool(&query.tool))
        .await?;
    Ok(ResponseJson(ApiResponse::success(fetched)))
}

/// POST /api/tables/{table}/ops
pub async fn update_table(
    State(state): State<AppState>,
    Path(table): Path<String>,
    axum::Json(payload): axum::Json<UpdateTableRequest>,
) -> Result<ResponseJson<ApiResponse<UpdateTableResponse>>, ApiError> {
    if payload.ops.is_empty() {
        return Err(ApiError::BadRequest("ops must not be empty".to_string()));
    }
    let table_ref = TableRef::resolve(&table, payload.manufacturer_id.as_deref());
    table_ref
        .validate()
        .map_err(services::storage::StorageError::from)?;

    let affected = state
        .dispatcher
        .update_table(&payload.tool, &table_ref, payload.ops)
        .await?;
    Ok(ResponseJson(ApiResponse::success(UpdateTableResponse {
        affected,
    })))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new().nest(
        "/tables",
        Router::new()
            .route("/", get(get_tables))
            .route("/phased", get(get_tables_phased))
            .route("/{table}/ops", post(update_table)),
    )
}
