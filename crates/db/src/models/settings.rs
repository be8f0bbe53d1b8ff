//! Key/value application settings and the backup configuration mapped onto
//! them.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::ops::TableOp;
use super::table::{CellValue, Column, Row, Table};

pub const SETTINGS_TABLE: &str = "settings";

pub const BACKUP_ENABLED_KEY: &str = "BACKUP_ENABLED";
pub const BACKUP_HOUR_KEY: &str = "BACKUP_HOUR";
pub const BACKUP_RETENTION_DAYS_KEY: &str = "BACKUP_RETENTION_DAYS";

/// Schema of the `settings` table. `key` is the primary key.
pub fn schema() -> Vec<Column> {
    vec![Column::text("key"), Column::text("value")]
}

/// Read the value cell for a settings key, rendered as text.
pub fn value_for(table: &Table, key: &str) -> Option<String> {
    table
        .data
        .iter()
        .find(|row| row.get("key").and_then(CellValue::as_str) == Some(key))
        .and_then(|row| row.get("value"))
        .map(CellValue::to_csv_string)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct BackupSettings {
    pub enabled: bool,
    pub hour: u32,
    pub retention_days: u32,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            hour: 2,
            retention_days: 14,
        }
    }
}

impl BackupSettings {
    /// Tolerant parse from the settings table: missing or malformed keys fall
    /// back to the defaults.
    pub fn from_table(table: &Table) -> Self {
        let defaults = Self::default();
        Self {
            enabled: value_for(table, BACKUP_ENABLED_KEY)
                .map(|v| v == "true")
                .unwrap_or(defaults.enabled),
            hour: value_for(table, BACKUP_HOUR_KEY)
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.hour),
            retention_days: value_for(table, BACKUP_RETENTION_DAYS_KEY)
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.retention_days),
        }
    }

    /// Upsert op list against the current settings table: update keys already
    /// present, insert the rest.
    pub fn to_ops(&self, table: &Table) -> Vec<TableOp> {
        let pairs = [
            (BACKUP_ENABLED_KEY, self.enabled.to_string()),
            (BACKUP_HOUR_KEY, self.hour.to_string()),
            (BACKUP_RETENTION_DAYS_KEY, self.retention_days.to_string()),
        ];
        pairs
            .into_iter()
            .map(|(key, value)| {
                if value_for(table, key).is_some() {
                    TableOp::Update {
                        set: Row::from([("value".to_string(), CellValue::text(value))]),
                        where_: Row::from([("key".to_string(), CellValue::text(key))]),
                    }
                } else {
                    TableOp::Insert {
                        row: Row::from([
                            ("key".to_string(), CellValue::text(key)),
                            ("value".to_string(), CellValue::text(value)),
                        ]),
                    }
                }
            })
            .collect()
    }
}
