//! In-memory store used by service tests: records load calls and can be
//! told to fail writes.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use db::models::builtin_schema;
use db::models::ops::{TableOp, apply_ops, validate_ops};
use db::models::table::{Database, Table};
use db::models::table_ref::TableRef;
use tokio::sync::RwLock;

use super::{StorageError, TableStore};

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Database>,
    load_calls: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_table(self, name: &str, table: Table) -> Self {
        self.tables.write().await.insert(name.to_string(), table);
        self
    }

    pub fn load_calls(&self) -> usize {
        self.load_calls.load(Ordering::SeqCst)
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn table_snapshot(&self, name: &str) -> Option<Table> {
        self.tables.read().await.get(name).cloned()
    }
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn load_table(&self, table: &TableRef) -> Result<Table, StorageError> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        let physical = table.physical_name();
        self.tables
            .read()
            .await
            .get(&physical)
            .cloned()
            .ok_or(StorageError::TableNotFound(physical))
    }

    async fn table_exists(&self, table: &TableRef) -> Result<bool, StorageError> {
        Ok(self
            .tables
            .read()
            .await
            .contains_key(&table.physical_name()))
    }

    async fn apply_ops(&self, table: &TableRef, ops: &[TableOp]) -> Result<u64, StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::ReadOnly);
        }
        let physical = table.physical_name();
        let mut tables = self.tables.write().await;
        let entry = match tables.get_mut(&physical) {
            Some(entry) => entry,
            None => match builtin_schema(table.logical_name()) {
                Some(schema) => tables.entry(physical.clone()).or_insert(Table::new(schema)),
                None => return Err(StorageError::TableNotFound(physical)),
            },
        };
        validate_ops(&physical, entry, ops)?;
        Ok(apply_ops(entry, ops))
    }
}
