//! Routes for backup configuration.

use axum::{
    Router,
    extract::State,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::settings::BackupSettings;
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

/// GET /api/settings/backup
pub async fn get_backup_settings(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<BackupSettings>>, ApiError> {
    let settings = state.settings.backup_settings().await?;
    Ok(ResponseJson(ApiResponse::success(settings)))
}

/// PUT /api/settings/backup
pub async fn put_backup_settings(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<BackupSettings>,
) -> Result<ResponseJson<ApiResponse<BackupSettings>>, ApiError> {
    state.settings.save_backup_settings(&payload).await?;
    Ok(ResponseJson(ApiResponse::success(payload)))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new().route(
        "/settings/backup",
        get(get_backup_settings).put(put_backup_settings),
    )
}
