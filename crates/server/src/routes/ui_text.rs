//! Routes for the translated interface strings document.

use axum::{
    Router,
    extract::State,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::ui_text::UiTextItem;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct SaveUiTextRequest {
    pub items: Vec<UiTextItem>,
}

/// GET /api/ui-text
pub async fn get_ui_text(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<UiTextItem>>>, ApiError> {
    let items = state.ui_text.load().await?;
    Ok(ResponseJson(ApiResponse::success(items)))
}

/// PUT /api/ui-text
///
/// Replaces the whole document; the items are written back in order.
pub async fn put_ui_text(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<SaveUiTextRequest>,
) -> Result<ResponseJson<ApiResponse<usize>>, ApiError> {
    state.ui_text.save(&payload.items).await?;
    Ok(ResponseJson(ApiResponse::success(payload.items.len())))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new().route("/ui-text", get(get_ui_text).put(put_ui_text))
}
