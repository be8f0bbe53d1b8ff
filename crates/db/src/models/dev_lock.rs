//! Dev-locks: administrative flags gating edits to a tool or table.
//!
//! Locks live as rows of the `dev_locks` table and flow through the same op
//! pipeline as every other table, so they persist in any storage mode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use super::table::{CellValue, Column, ColumnType, Row, Table};

pub const DEV_LOCKS_TABLE: &str = "dev_locks";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ComponentType {
    Tool,
    Table,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, EnumString, Display, Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LockType {
    /// Hard block: mutations against the component are refused.
    #[default]
    NoEdit,
    /// Edits are permitted but tracked as a draft until explicitly applied.
    CopyOnEdit,
}

/// One action applied across every component of a type in a single save.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BulkLockAction {
    LockNoEdit,
    LockCopyOnEdit,
    Unlock,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct DevLock {
    pub id: Uuid,
    pub component_type: ComponentType,
    pub component_name: String,
    pub is_locked: bool,
    pub lock_type: LockType,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Schema of the `dev_locks` table.
pub fn schema() -> Vec<Column> {
    vec![
        Column::text("id"),
        Column::text("component_type"),
        Column::text("component_name"),
        Column::new("is_locked", "is_locked", ColumnType::Boolean),
        Column::text("lock_type"),
        Column::text("notes"),
        Column::text("created_at"),
        Column::text("updated_at"),
    ]
}

impl DevLock {
    /// A lock record is created implicitly on the first toggle for a
    /// component.
    pub fn new(component_type: ComponentType, component_name: impl Into<String>, lock_type: LockType) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            component_type,
            component_name: component_name.into(),
            is_locked: true,
            lock_type,
            notes: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn matches(&self, component_type: ComponentType, component_name: &str) -> bool {
        self.component_type == component_type && self.component_name == component_name
    }

    /// True when the lock forbids mutation outright.
    pub fn blocks_edit(&self) -> bool {
        self.is_locked && self.lock_type == LockType::NoEdit
    }

    pub fn set_action(&mut self, action: BulkLockAction, now: DateTime<Utc>) {
        match action {
            BulkLockAction::LockNoEdit => {
                self.is_locked = true;
                self.lock_type = LockType::NoEdit;
            }
            BulkLockAction::LockCopyOnEdit => {
                self.is_locked = true;
                self.lock_type = LockType::CopyOnEdit;
            }
            BulkLockAction::Unlock => {
                self.is_locked = false;
            }
        }
        self.updated_at = now;
    }

    /// Copy-on-edit lifecycle: applying the draft stamps the notes with the
    /// application timestamp and reverts the lock type to `no_edit`.
    pub fn apply_draft(&mut self, now: DateTime<Utc>) {
        let stamp = format!("[applied {}]", now.to_rfc3339());
        if self.notes.is_empty() {
            self.notes = stamp;
        } else {
            self.notes = format!("{} {}", self.notes, stamp);
        }
        self.lock_type = LockType::NoEdit;
        self.updated_at = now;
    }

    pub fn from_row(row: &Row) -> Option<Self> {
        let text = |key: &str| row.get(key).and_then(CellValue::as_str);
        let flag = |key: &str| match row.get(key) {
            Some(CellValue::Bool(b)) => Some(*b),
            Some(CellValue::Text(s)) => Some(s == "true" || s == "1"),
            Some(CellValue::Number(n)) => Some(*n != 0.0),
            _ => None,
        };
        let timestamp = |key: &str| {
            text(key)
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|t| t.with_timezone(&Utc))
        };
        Some(Self {
            id: text("id").and_then(|s| Uuid::parse_str(s).ok())?,
            component_type: text("component_type").and_then(|s| s.parse().ok())?,
            component_name: text("component_name")?.to_string(),
            is_locked: flag("is_locked").unwrap_or(false),
            lock_type: text("lock_type").and_then(|s| s.parse().ok()).unwrap_or_default(),
            notes: text("notes").unwrap_or_default().to_string(),
            created_at: timestamp("created_at").unwrap_or_else(Utc::now),
            updated_at: timestamp("updated_at").unwrap_or_else(Utc::now),
        })
    }

    pub fn to_row(&self) -> Row {
        Row::from([
            ("id".to_string(), CellValue::text(self.id.to_string())),
            (
                "component_type".to_string(),
                CellValue::text(self.component_type.to_string()),
            ),
            (
                "component_name".to_string(),
                CellValue::text(self.component_name.clone()),
            ),
            ("is_locked".to_string(), CellValue::Bool(self.is_locked)),
            (
                "lock_type".to_string(),
                CellValue::text(self.lock_type.to_string()),
            ),
            ("notes".to_string(), CellValue::text(self.notes.clone())),
            (
                "created_at".to_string(),
                CellValue::text(self.created_at.to_rfc3339()),
            ),
            (
                "updated_at".to_string(),
                CellValue::text(self.updated_at.to_rfc3339()),
            ),
        ])
    }

    /// Parse every well-formed lock row out of the `dev_locks` table.
    pub fn all_from_table(table: &Table) -> Vec<Self> {
        table.data.iter().filter_map(Self::from_row).collect()
    }
}
