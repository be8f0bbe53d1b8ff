use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use services::services::dev_lock::DevLockError;
use services::services::dispatcher::DispatchError;
use services::services::loader::LoaderError;
use services::services::settings::SettingsError;
use services::services::ui_text::UiTextError;
use services::storage::StorageError;
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    DevLock(#[from] DevLockError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    UiText(#[from] UiTextError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Loader(LoaderError::Storage(e)) | ApiError::Storage(e) => storage_status(e),
            ApiError::Dispatch(e) => dispatch_status(e),
            ApiError::DevLock(e) => match e {
                DevLockError::NotFound(_) => StatusCode::NOT_FOUND,
                DevLockError::NoDraft { .. } => StatusCode::BAD_REQUEST,
                DevLockError::Dispatch(e) => dispatch_status(e),
                DevLockError::Storage(e) => storage_status(e),
            },
            ApiError::Settings(e) => match e {
                SettingsError::Invalid(_) => StatusCode::BAD_REQUEST,
                SettingsError::Dispatch(e) => dispatch_status(e),
                SettingsError::Storage(e) => storage_status(e),
            },
            ApiError::UiText(e) => match e {
                UiTextError::NotFound(_) => StatusCode::NOT_FOUND,
                UiTextError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

fn dispatch_status(e: &DispatchError) -> StatusCode {
    match e {
        DispatchError::Locked { .. } => StatusCode::FORBIDDEN,
        DispatchError::Op(_) => StatusCode::BAD_REQUEST,
        DispatchError::Storage(e) => storage_status(e),
    }
}

fn storage_status(e: &StorageError) -> StatusCode {
    match e {
        StorageError::TableNotFound(_) => StatusCode::NOT_FOUND,
        StorageError::ReadOnly => StatusCode::FORBIDDEN,
        StorageError::InvalidIdentifier(_) | StorageError::TableRef(_) | StorageError::Op(_) => {
            StatusCode::BAD_REQUEST
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::error!(status = %status, error = %self, "request failed");
        (status, Json(ApiResponse::<()>::error(self.to_string()))).into_response()
    }
}
