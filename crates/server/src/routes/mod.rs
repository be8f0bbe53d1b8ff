pub mod dev_locks;
pub mod settings;
pub mod tables;
pub mod ui_text;

use axum::Router;

use crate::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(tables::router(state))
        .merge(dev_locks::router(state))
        .merge(settings::router(state))
        .merge(ui_text::router(state))
}
