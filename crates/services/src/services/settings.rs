//! Backup configuration over the key/value `settings` table.

use std::sync::Arc;

use db::models::settings::{BackupSettings, SETTINGS_TABLE, schema};
use db::models::table::Table;
use db::models::table_ref::TableRef;
use thiserror::Error;
use tracing::info;

use crate::services::dispatcher::{DispatchError, UpdateDispatcher};
use crate::storage::{StorageError, TableStore};

const ADMIN_TOOL: &str = "admin";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid backup settings: {0}")]
    Invalid(String),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub struct SettingsService {
    store: Arc<dyn TableStore>,
    dispatcher: Arc<UpdateDispatcher>,
}

impl SettingsService {
    pub fn new(store: Arc<dyn TableStore>, dispatcher: Arc<UpdateDispatcher>) -> Self {
        Self { store, dispatcher }
    }

    async fn settings_table(&self) -> Result<Table, SettingsError> {
        match self.store.load_table(&TableRef::shared(SETTINGS_TABLE)).await {
            Ok(table) => Ok(table),
            Err(StorageError::TableNotFound(_)) => Ok(Table::new(schema())),
            Err(e) => Err(e.into()),
        }
    }

    /// Current backup settings; missing or malformed keys read as defaults.
    pub async fn backup_settings(&self) -> Result<BackupSettings, SettingsError> {
        Ok(BackupSettings::from_table(&self.settings_table().await?))
    }

    /// Save backup settings as an upsert batch: keys already present are
    /// updated in place, the rest inserted.
    pub async fn save_backup_settings(
        &self,
        settings: &BackupSettings,
    ) -> Result<(), SettingsError> {
        if settings.hour > 23 {
            return Err(SettingsError::Invalid(format!(
                "hour {} is out of range 0-23",
                settings.hour
            )));
        }
        if settings.retention_days == 0 {
            return Err(SettingsError::Invalid(
                "retention_days must be at least 1".to_string(),
            ));
        }
        let current = self.settings_table().await?;
        let ops = settings.to_ops(&current);
        self.dispatcher
            .update_table(ADMIN_TOOL, &TableRef::shared(SETTINGS_TABLE), ops)
            .await?;
        info!(
            enabled = settings.enabled,
            hour = settings.hour,
            retention_days = settings.retention_days,
            "backup settings saved"
        );
        Ok(())
    }
}
