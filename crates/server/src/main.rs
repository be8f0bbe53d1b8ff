use anyhow::Context;
use server::{AppState, app};
use services::config::Config;
use services::services::backup::BackupService;
use services::services::store_validator::StoreValidator;
use services::storage::StorageMode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    info!(
        mode = %config.mode,
        data_dir = %config.data_dir.display(),
        "starting printdesk server"
    );

    let state = AppState::new(config).await?;

    let validation = StoreValidator::new(state.store.clone()).validate().await?;
    if !validation.is_ok() {
        warn!(summary = %validation.summary(), "starting with storage warnings");
    }

    // Scheduled backups only make sense over the CSV data directory; in live
    // mode the database has its own durability story.
    if state.config.mode != StorageMode::Live {
        BackupService::spawn(state.config.data_dir.clone(), state.settings.clone()).await;
    }

    let addr = format!("{}:{}", state.config.host, state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("listening on http://{addr}");
    axum::serve(listener, app(state)).await?;
    Ok(())
}
