//! Startup validation of the storage backend: the core tables every tool
//! relies on must be present before the server starts taking requests.

use std::sync::Arc;

use db::tool_deps::{CORE_TABLES, tables_for_tool};
use thiserror::Error;
use tracing::{info, warn};

use crate::storage::{StorageError, TableStore};

#[derive(Debug, Error)]
pub enum StoreValidationError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub struct StoreValidator {
    store: Arc<dyn TableStore>,
}

impl StoreValidator {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    /// Check that the core tables exist. Core tables are bootstrapped on
    /// first write, so their absence is a warning rather than a hard error.
    pub async fn validate(&self) -> Result<ValidationResult, StoreValidationError> {
        let mut missing_core = Vec::new();
        for table in CORE_TABLES {
            if !self.exists(table).await? {
                missing_core.push(table.to_string());
            }
        }

        let mut warnings: Vec<String> = missing_core
            .iter()
            .map(|t| format!("core table `{t}` missing; it will be created on first write"))
            .collect();

        for table in tables_for_tool("estimator") {
            if !self.exists(table).await? {
                warnings.push(format!("estimator table `{table}` missing"));
            }
        }

        let result = ValidationResult {
            missing_core,
            warnings,
        };
        if result.is_ok() {
            info!("storage validation complete");
        } else {
            warn!(summary = %result.summary(), "storage validation found issues");
        }
        Ok(result)
    }

    async fn exists(&self, name: &str) -> Result<bool, StoreValidationError> {
        use db::models::table_ref::TableRef;
        Ok(self.store.table_exists(&TableRef::parse(name)).await?)
    }
}

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub missing_core: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn summary(&self) -> String {
        if self.is_ok() {
            "storage OK".to_string()
        } else {
            format!("storage validation warnings: {}", self.warnings.join(", "))
        }
    }
}
