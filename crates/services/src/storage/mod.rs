//! Pluggable table storage.
//!
//! The same loader/dispatcher pipeline runs against a CSV directory
//! (debug or writable) or a live SQLite database, selected at runtime.

mod csv;
#[cfg(test)]
pub(crate) mod memory;
mod sqlite;

pub use csv::CsvStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use db::models::ops::{OpError, TableOp};
use db::models::table::Table;
use db::models::table_ref::{TableRef, TableRefError};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("table `{0}` not found")]
    TableNotFound(String),
    #[error("storage backend is read-only (csv-debug mode)")]
    ReadOnly,
    #[error("invalid column identifier `{0}`")]
    InvalidIdentifier(String),
    #[error(transparent)]
    TableRef(#[from] TableRefError),
    #[error(transparent)]
    Op(#[from] OpError),
    #[error("csv error: {0}")]
    Csv(#[from] csv_async::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, Default,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum StorageMode {
    /// Read-only CSV directory for local inspection.
    #[default]
    CsvDebug,
    /// CSV directory with write-back.
    CsvWritable,
    /// SQLite database, the production backend.
    Live,
}

/// Backend contract shared by every storage mode. The backend is the sole
/// source of truth on conflict; callers do not reconcile against it.
#[async_trait]
pub trait TableStore: Send + Sync {
    async fn load_table(&self, table: &TableRef) -> Result<Table, StorageError>;

    async fn table_exists(&self, table: &TableRef) -> Result<bool, StorageError>;

    /// Persist an already-validated op batch. Returns the number of rows
    /// affected.
    async fn apply_ops(&self, table: &TableRef, ops: &[TableOp]) -> Result<u64, StorageError>;
}
