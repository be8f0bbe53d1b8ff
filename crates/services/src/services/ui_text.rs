//! Reading and saving the `ui_text.csv` resource. Unlike the tabular data
//! this file is edited as a whole document, so it bypasses the table store
//! and goes straight to disk.

use std::path::{Path, PathBuf};

use db::models::ui_text::{UI_TEXT_FILE, UiTextItem, parse_csv, to_csv};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

#[derive(Debug, Error)]
pub enum UiTextError {
    #[error("ui text file not found at {0}")]
    NotFound(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct UiTextService {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl UiTextService {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(UI_TEXT_FILE),
            write_lock: Mutex::new(()),
        }
    }

    pub async fn load(&self) -> Result<Vec<UiTextItem>, UiTextError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(UiTextError::NotFound(self.path.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(parse_csv(&raw))
    }

    /// Replace the whole file. Written to a temp file and renamed so a crash
    /// mid-write never leaves a truncated document.
    pub async fn save(&self, items: &[UiTextItem]) -> Result<(), UiTextError> {
        let _guard = self.write_lock.lock().await;
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let tmp = self.path.with_extension("csv.tmp");
        tokio::fs::write(&tmp, to_csv(items)).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        info!(path = %self.path.display(), items = items.len(), "ui text saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let service = UiTextService::new(dir.path());
        let items = vec![
            UiTextItem::group("Navigation"),
            UiTextItem::entry("nav.home", "Home"),
            UiTextItem::entry("nav.orders", "Orders, open"),
        ];
        service.save(&items).await.unwrap();
        assert_eq!(service.load().await.unwrap(), items);
    }

    #[tokio::test]
    async fn missing_file_is_reported_as_not_found() {
        let dir = TempDir::new().unwrap();
        let service = UiTextService::new(dir.path());
        assert!(matches!(
            service.load().await,
            Err(UiTextError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn save_overwrites_previous_content() {
        let dir = TempDir::new().unwrap();
        let service = UiTextService::new(dir.path());
        service
            .save(&[UiTextItem::entry("a", "1"), UiTextItem::entry("b", "2")])
            .await
            .unwrap();
        service.save(&[UiTextItem::entry("a", "1")]).await.unwrap();
        assert_eq!(service.load().await.unwrap().len(), 1);
    }
}
