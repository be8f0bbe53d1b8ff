//! Routes for dev-lock administration.

use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::dev_lock::{BulkLockAction, ComponentType, DevLock, LockType};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ToggleLockRequest {
    pub component_type: ComponentType,
    pub component_name: String,
    #[serde(default)]
    pub lock_type: LockType,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct BulkLockRequest {
    pub component_type: ComponentType,
    pub action: BulkLockAction,
}

/// GET /api/dev-locks
pub async fn list_locks(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<DevLock>>>, ApiError> {
    let locks = state.dev_locks.all_locks().await?;
    Ok(ResponseJson(ApiResponse::success(locks)))
}

/// POST /api/dev-locks/toggle
pub async fn toggle_lock(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<ToggleLockRequest>,
) -> Result<ResponseJson<ApiResponse<DevLock>>, ApiError> {
    let lock = state
        .dev_locks
        .toggle(
            payload.component_type,
            &payload.component_name,
            payload.lock_type,
        )
        .await?;
    Ok(ResponseJson(ApiResponse::success(lock)))
}

/// POST /api/dev-locks/bulk
pub async fn bulk_lock(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<BulkLockRequest>,
) -> Result<ResponseJson<ApiResponse<Vec<DevLock>>>, ApiError> {
    let locks = state
        .dev_locks
        .bulk_apply(payload.component_type, payload.action)
        .await?;
    Ok(ResponseJson(ApiResponse::success(locks)))
}

/// POST /api/dev-locks/{lock_id}/apply-draft
pub async fn apply_draft(
    State(state): State<AppState>,
    Path(lock_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<DevLock>>, ApiError> {
    let lock = state.dev_locks.apply_draft(lock_id).await?;
    Ok(ResponseJson(ApiResponse::success(lock)))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new().nest(
        "/dev-locks",
        Router::new()
            .route("/", get(list_locks))
            .route("/toggle", post(toggle_lock))
            .route("/bulk", post(bulk_lock))
            .route("/{lock_id}/apply-draft", post(apply_draft)),
    )
}
