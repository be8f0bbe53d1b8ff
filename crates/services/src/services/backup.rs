//! Scheduled backups of the CSV data directory.
//!
//! A background loop wakes up once a minute; after the configured hour it
//! copies every `.csv` file into `backups/YYYY-MM-DD/` (once per day) and
//! prunes backup directories older than the retention window.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate, Timelike};
use thiserror::Error;
use tokio::time::interval;
use tracing::{error, info};

use crate::services::settings::{SettingsError, SettingsService};

const BACKUP_DIR: &str = "backups";
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error)]
pub enum BackupError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct BackupService {
    data_dir: PathBuf,
    settings: Arc<SettingsService>,
    poll_interval: Duration,
}

impl BackupService {
    pub async fn spawn(
        data_dir: PathBuf,
        settings: Arc<SettingsService>,
    ) -> tokio::task::JoinHandle<()> {
        let service = Self {
            data_dir,
            settings,
            poll_interval: Duration::from_secs(60),
        };
        tokio::spawn(async move {
            service.start().await;
        })
    }

    async fn start(&self) {
        info!(
            data_dir = %self.data_dir.display(),
            "starting backup service with interval {:?}",
            self.poll_interval
        );
        let mut interval = interval(self.poll_interval);
        let mut last_run: Option<NaiveDate> = None;
        loop {
            interval.tick().await;
            if let Err(e) = self.tick(&mut last_run).await {
                error!(error = %e, "backup tick failed");
            }
        }
    }

    async fn tick(&self, last_run: &mut Option<NaiveDate>) -> Result<(), BackupError> {
        let settings = self.settings.backup_settings().await?;
        if !settings.enabled {
            return Ok(());
        }
        let now = Local::now();
        if now.hour() < settings.hour {
            return Ok(());
        }
        let today = now.date_naive();
        if *last_run == Some(today) {
            return Ok(());
        }

        self.backup_now(today).await?;
        self.prune(today, settings.retention_days).await?;
        *last_run = Some(today);
        Ok(())
    }

    /// Copy every CSV file in the data directory into the dated backup
    /// directory, overwriting an earlier run for the same day.
    pub async fn backup_now(&self, date: NaiveDate) -> Result<usize, BackupError> {
        let target = self
            .data_dir
            .join(BACKUP_DIR)
            .join(date.format(DATE_FORMAT).to_string());
        tokio::fs::create_dir_all(&target).await?;

        let mut copied = 0;
        let mut entries = tokio::fs::read_dir(&self.data_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            if let Some(name) = path.file_name() {
                tokio::fs::copy(&path, target.join(name)).await?;
                copied += 1;
            }
        }
        info!(date = %date, files = copied, "backup complete");
        Ok(copied)
    }

    async fn prune(&self, today: NaiveDate, retention_days: u32) -> Result<(), BackupError> {
        let root = self.data_dir.join(BACKUP_DIR);
        let mut entries = match tokio::fs::read_dir(&root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if is_expired(name, today, retention_days) {
                info!(backup = name, "pruning expired backup");
                tokio::fs::remove_dir_all(entry.path()).await?;
            }
        }
        Ok(())
    }
}

/// A backup directory is expired when its date is older than the retention
/// window. Names that are not dates are left alone.
fn is_expired(name: &str, today: NaiveDate, retention_days: u32) -> bool {
    match NaiveDate::parse_from_str(name, DATE_FORMAT) {
        Ok(date) => today.signed_duration_since(date).num_days() > retention_days as i64,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::dispatcher::UpdateDispatcher;
    use crate::state::DatabaseState;
    use crate::storage::memory::MemoryStore;
    use tempfile::TempDir;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn expiry_is_relative_to_retention_window() {
        let today = date("2026-08-24");
        assert!(is_expired("2026-08-09", today, 14));
        assert!(!is_expired("2026-08-10", today, 14));
        assert!(!is_expired("2026-08-24", today, 14));
    }

    #[test]
    fn non_date_directories_are_never_pruned() {
        assert!(!is_expired("scratch", date("2026-08-24"), 1));
    }

    #[tokio::test]
    async fn backup_copies_only_csv_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("orders.csv"), "id\n1\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignore").unwrap();

        let store = Arc::new(MemoryStore::new());
        let settings = Arc::new(SettingsService::new(
            store.clone(),
            Arc::new(UpdateDispatcher::new(store, DatabaseState::new())),
        ));
        let service = BackupService {
            data_dir: dir.path().to_path_buf(),
            settings,
            poll_interval: Duration::from_secs(60),
        };

        let copied = service.backup_now(date("2026-08-24")).await.unwrap();
        assert_eq!(copied, 1);
        let backed_up = dir.path().join("backups/2026-08-24/orders.csv");
        assert!(backed_up.exists());
        assert!(!dir.path().join("backups/2026-08-24/notes.txt").exists());
    }

    #[tokio::test]
    async fn prune_removes_only_expired_dated_directories() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("backups");
        for name in ["2026-08-01", "2026-08-20", "keep-me"] {
            std::fs::create_dir_all(root.join(name)).unwrap();
        }

        let store = Arc::new(MemoryStore::new());
        let settings = Arc::new(SettingsService::new(
            store.clone(),
            Arc::new(UpdateDispatcher::new(store, DatabaseState::new())),
        ));
        let service = BackupService {
            data_dir: dir.path().to_path_buf(),
            settings,
            poll_interval: Duration::from_secs(60),
        };

        service.prune(date("2026-08-24"), 14).await.unwrap();
        assert!(!root.join("2026-08-01").exists());
        assert!(root.join("2026-08-20").exists());
        assert!(root.join("keep-me").exists());
    }
}
