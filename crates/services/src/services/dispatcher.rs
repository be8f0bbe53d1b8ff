//! The update dispatcher: declarative op batches against one table.
//!
//! A batch is validated and coerced against the schema, gated on dev-locks,
//! applied optimistically to shared in-memory state, then persisted through
//! the storage backend. What happens to local state when persistence fails
//! is a pluggable policy.

use std::sync::Arc;

use db::models::builtin_schema;
use db::models::dev_lock::{ComponentType, DEV_LOCKS_TABLE, DevLock};
use db::models::ops::{OpError, TableOp, apply_ops, coerce_ops, validate_ops};
use db::models::table::Table;
use db::models::table_ref::TableRef;
use thiserror::Error;
use tracing::{info, warn};

use crate::state::DatabaseState;
use crate::storage::{StorageError, TableStore};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{component_type} `{component_name}` is locked for editing")]
    Locked {
        component_type: ComponentType,
        component_name: String,
    },
    #[error(transparent)]
    Op(#[from] OpError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// What to do with the optimistic local mutation when the backend write
/// fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePolicy {
    /// Keep the local mutation; state may diverge from the backend until the
    /// next full reload. This matches the historical behavior.
    #[default]
    KeepOnFailure,
    /// Restore the pre-batch table snapshot.
    RollbackOnFailure,
}

pub struct UpdateDispatcher {
    store: Arc<dyn TableStore>,
    state: DatabaseState,
    policy: WritePolicy,
}

impl UpdateDispatcher {
    pub fn new(store: Arc<dyn TableStore>, state: DatabaseState) -> Self {
        Self {
            store,
            state,
            policy: WritePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: WritePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub async fn update_table(
        &self,
        tool: &str,
        table: &TableRef,
        mut ops: Vec<TableOp>,
    ) -> Result<u64, DispatchError> {
        let physical = table.physical_name();

        self.check_locks(tool, table).await?;

        let mut current = self.current_table(table, &physical).await?;
        validate_ops(&physical, &current, &ops)?;
        coerce_ops(&current, &mut ops);

        // Optimistic local apply before the backend round trip.
        let before = current.clone();
        apply_ops(&mut current, &ops);
        self.state.insert(physical.clone(), current).await;

        match self.store.apply_ops(table, &ops).await {
            Ok(affected) => {
                info!(tool, table = %physical, ops = ops.len(), affected, "table update persisted");
                Ok(affected)
            }
            Err(e) => {
                match self.policy {
                    WritePolicy::KeepOnFailure => {
                        warn!(
                            tool,
                            table = %physical,
                            error = %e,
                            "persist failed; local state kept and may diverge until reload"
                        );
                    }
                    WritePolicy::RollbackOnFailure => {
                        warn!(tool, table = %physical, error = %e, "persist failed; rolling back local state");
                        self.state.insert(physical, before).await;
                    }
                }
                Err(e.into())
            }
        }
    }

    async fn current_table(
        &self,
        table: &TableRef,
        physical: &str,
    ) -> Result<Table, DispatchError> {
        if let Some(current) = self.state.table(physical).await {
            return Ok(current);
        }
        match self.store.load_table(table).await {
            Ok(current) => Ok(current),
            Err(StorageError::TableNotFound(_)) => builtin_schema(table.logical_name())
                .map(Table::new)
                .ok_or(DispatchError::Storage(StorageError::TableNotFound(
                    physical.to_string(),
                ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Centralized dev-lock enforcement: a locked `no_edit` component rejects
    /// the mutation before any state is touched. The dev_locks table itself
    /// is exempt so locks can always be toggled off.
    async fn check_locks(&self, tool: &str, table: &TableRef) -> Result<(), DispatchError> {
        let physical = table.physical_name();
        if physical == DEV_LOCKS_TABLE {
            return Ok(());
        }

        let locks_table = match self.state.table(DEV_LOCKS_TABLE).await {
            Some(locks_table) => locks_table,
            None => match self.store.load_table(&TableRef::shared(DEV_LOCKS_TABLE)).await {
                Ok(locks_table) => locks_table,
                Err(StorageError::TableNotFound(_)) => return Ok(()),
                Err(e) => return Err(e.into()),
            },
        };

        for lock in DevLock::all_from_table(&locks_table) {
            if !lock.blocks_edit() {
                continue;
            }
            let blocked = match lock.component_type {
                ComponentType::Tool => lock.component_name == tool,
                ComponentType::Table => {
                    lock.component_name == physical || lock.component_name == table.logical_name()
                }
            };
            if blocked {
                return Err(DispatchError::Locked {
                    component_type: lock.component_type,
                    component_name: lock.component_name,
                });
            }
        }
        Ok(())
    }
}
