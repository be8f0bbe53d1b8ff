pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use services::config::Config;
use services::services::dev_lock::DevLockService;
use services::services::dispatcher::UpdateDispatcher;
use services::services::loader::TableLoader;
use services::services::settings::SettingsService;
use services::services::ui_text::UiTextService;
use services::state::DatabaseState;
use services::storage::{CsvStore, SqliteStore, StorageMode, TableStore};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: DatabaseState,
    pub store: Arc<dyn TableStore>,
    pub loader: Arc<TableLoader>,
    pub dispatcher: Arc<UpdateDispatcher>,
    pub dev_locks: Arc<DevLockService>,
    pub settings: Arc<SettingsService>,
    pub ui_text: Arc<UiTextService>,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store: Arc<dyn TableStore> = match config.mode {
            StorageMode::CsvDebug => Arc::new(CsvStore::new(&config.data_dir, false)),
            StorageMode::CsvWritable => Arc::new(CsvStore::new(&config.data_dir, true)),
            StorageMode::Live => Arc::new(SqliteStore::connect(&config.database_url).await?),
        };
        Ok(Self::with_store(config, store))
    }

    pub fn with_store(config: Config, store: Arc<dyn TableStore>) -> Self {
        let db = DatabaseState::new();
        let loader = Arc::new(TableLoader::new(store.clone(), db.clone()));
        let dispatcher = Arc::new(UpdateDispatcher::new(store.clone(), db.clone()));
        let dev_locks = Arc::new(DevLockService::new(store.clone(), dispatcher.clone()));
        let settings = Arc::new(SettingsService::new(store.clone(), dispatcher.clone()));
        let ui_text = Arc::new(UiTextService::new(&config.data_dir));
        Self {
            config: Arc::new(config),
            db,
            store,
            loader,
            dispatcher,
            dev_locks,
            settings,
            ui_text,
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api", routes::router(&state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
