//! Dev-lock administration: toggling, bulk actions, and the copy-on-edit
//! draft lifecycle. All mutations flow through the dispatcher as ordinary
//! table ops, so locks persist in whichever storage mode is active.

use std::sync::Arc;

use chrono::Utc;
use db::models::dev_lock::{
    BulkLockAction, ComponentType, DEV_LOCKS_TABLE, DevLock, LockType, schema,
};
use db::models::ops::TableOp;
use db::models::table::{CellValue, Row, Table};
use db::models::table_ref::TableRef;
use db::tool_deps::{all_known_tables, all_tools};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::services::dispatcher::{DispatchError, UpdateDispatcher};
use crate::storage::{StorageError, TableStore};

/// Tool identity the lock mutations are attributed to.
const ADMIN_TOOL: &str = "admin";

#[derive(Debug, Error)]
pub enum DevLockError {
    #[error("dev lock `{0}` not found")]
    NotFound(Uuid),
    #[error("dev lock for {component_type} `{component_name}` is not in copy-on-edit mode")]
    NoDraft {
        component_type: ComponentType,
        component_name: String,
    },
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub struct DevLockService {
    store: Arc<dyn TableStore>,
    dispatcher: Arc<UpdateDispatcher>,
}

impl DevLockService {
    pub fn new(store: Arc<dyn TableStore>, dispatcher: Arc<UpdateDispatcher>) -> Self {
        Self { store, dispatcher }
    }

    async fn locks_table(&self) -> Result<Table, DevLockError> {
        match self.store.load_table(&TableRef::shared(DEV_LOCKS_TABLE)).await {
            Ok(table) => Ok(table),
            // First run: the table appears on the first write.
            Err(StorageError::TableNotFound(_)) => Ok(Table::new(schema())),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn all_locks(&self) -> Result<Vec<DevLock>, DevLockError> {
        Ok(DevLock::all_from_table(&self.locks_table().await?))
    }

    pub async fn lock_for(
        &self,
        component_type: ComponentType,
        component_name: &str,
    ) -> Result<Option<DevLock>, DevLockError> {
        Ok(self
            .all_locks()
            .await?
            .into_iter()
            .find(|lock| lock.matches(component_type, component_name)))
    }

    /// Toggle the lock on one component. The row is created on the first
    /// toggle; later toggles flip `is_locked`, refreshing the lock type when
    /// the component is being locked.
    pub async fn toggle(
        &self,
        component_type: ComponentType,
        component_name: &str,
        lock_type: LockType,
    ) -> Result<DevLock, DevLockError> {
        let existing = self.lock_for(component_type, component_name).await?;
        let (lock, op) = match existing {
            None => {
                let lock = DevLock::new(component_type, component_name, lock_type);
                let op = TableOp::Insert { row: lock.to_row() };
                (lock, op)
            }
            Some(mut lock) => {
                lock.is_locked = !lock.is_locked;
                if lock.is_locked {
                    lock.lock_type = lock_type;
                }
                lock.updated_at = Utc::now();
                let op = update_op(&lock);
                (lock, op)
            }
        };

        self.persist(vec![op]).await?;
        info!(
            component_type = %lock.component_type,
            component = %lock.component_name,
            locked = lock.is_locked,
            lock_type = %lock.lock_type,
            "dev lock toggled"
        );
        Ok(lock)
    }

    /// Apply one action to every known component of a type in a single save.
    /// Components without a lock row get one.
    pub async fn bulk_apply(
        &self,
        component_type: ComponentType,
        action: BulkLockAction,
    ) -> Result<Vec<DevLock>, DevLockError> {
        let existing = self.all_locks().await?;
        let components: Vec<&str> = match component_type {
            ComponentType::Tool => all_tools(),
            ComponentType::Table => all_known_tables(),
        };

        let now = Utc::now();
        let mut out = Vec::with_capacity(components.len());
        let mut ops = Vec::with_capacity(components.len());
        for name in components {
            match existing.iter().find(|lock| lock.matches(component_type, name)) {
                Some(lock) => {
                    let mut lock = lock.clone();
                    lock.set_action(action, now);
                    ops.push(update_op(&lock));
                    out.push(lock);
                }
                None => {
                    // Unlocking a component that was never locked is a no-op.
                    if action == BulkLockAction::Unlock {
                        continue;
                    }
                    let lock_type = match action {
                        BulkLockAction::LockNoEdit => LockType::NoEdit,
                        BulkLockAction::LockCopyOnEdit => LockType::CopyOnEdit,
                        BulkLockAction::Unlock => unreachable!(),
                    };
                    let lock = DevLock::new(component_type, name, lock_type);
                    ops.push(TableOp::Insert { row: lock.to_row() });
                    out.push(lock);
                }
            }
        }

        if !ops.is_empty() {
            self.persist(ops).await?;
        }
        info!(component_type = %component_type, action = %action, locks = out.len(), "bulk lock action applied");
        Ok(out)
    }

    /// Apply the copy-on-edit draft for one lock: stamp the notes and revert
    /// the lock to plain `no_edit`.
    pub async fn apply_draft(&self, id: Uuid) -> Result<DevLock, DevLockError> {
        let mut lock = self
            .all_locks()
            .await?
            .into_iter()
            .find(|lock| lock.id == id)
            .ok_or(DevLockError::NotFound(id))?;
        if lock.lock_type != LockType::CopyOnEdit {
            return Err(DevLockError::NoDraft {
                component_type: lock.component_type,
                component_name: lock.component_name,
            });
        }

        lock.apply_draft(Utc::now());
        self.persist(vec![update_op(&lock)]).await?;
        Ok(lock)
    }

    async fn persist(&self, ops: Vec<TableOp>) -> Result<(), DevLockError> {
        self.dispatcher
            .update_table(ADMIN_TOOL, &TableRef::shared(DEV_LOCKS_TABLE), ops)
            .await?;
        Ok(())
    }
}

fn update_op(lock: &DevLock) -> TableOp {
    let mut set = lock.to_row();
    set.remove("id");
    TableOp::Update {
        set,
        where_: Row::from([("id".to_string(), CellValue::text(lock.id.to_string()))]),
    }
}
