//! Environment-driven runtime configuration.

use std::path::PathBuf;

use tracing::warn;

use crate::storage::StorageMode;

pub const DEFAULT_PORT: u16 = 3001;

#[derive(Debug, Clone)]
pub struct Config {
    /// Storage backend selected at runtime: csv-debug, csv-writable, or live.
    pub mode: StorageMode,
    /// Directory holding the CSV table files and ui_text.csv.
    pub data_dir: PathBuf,
    /// SQLite connection string for live mode.
    pub database_url: String,
    pub host: String,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: StorageMode::CsvDebug,
            data_dir: PathBuf::from("./data"),
            database_url: "sqlite://printdesk.db".to_string(),
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let mode = match std::env::var("PRINTDESK_MODE") {
            Ok(raw) => raw.parse::<StorageMode>().unwrap_or_else(|_| {
                warn!(mode = %raw, "unrecognized PRINTDESK_MODE, falling back to csv-debug");
                StorageMode::CsvDebug
            }),
            Err(_) => defaults.mode,
        };
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);
        Self {
            mode,
            data_dir: std::env::var("PRINTDESK_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            database_url: std::env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port,
        }
    }
}
