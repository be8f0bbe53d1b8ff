//! On-demand table loading.
//!
//! A tool page requests its tables when it mounts; tables already present in
//! the shared database are never re-fetched. Missing tables are loaded from
//! the storage backend concurrently and shallow-merged into shared state.

use std::sync::Arc;

use db::models::table::Database;
use db::models::table_ref::TableRef;
use db::tool_deps::{ESTIMATOR_PHASES, tables_for_tool};
use futures_util::future::try_join_all;
use thiserror::Error;
use tracing::debug;

use crate::state::DatabaseState;
use crate::storage::{StorageError, TableStore};

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Request context: which tool is asking.
#[derive(Debug, Clone)]
pub struct FetchContext {
    pub tool_name: String,
}

impl FetchContext {
    pub fn for_tool(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
        }
    }
}

pub struct TableLoader {
    store: Arc<dyn TableStore>,
    state: DatabaseState,
}

impl TableLoader {
    pub fn new(store: Arc<dyn TableStore>, state: DatabaseState) -> Self {
        Self { store, state }
    }

    /// Fetch the named tables, or the tool's declared dependencies when no
    /// names are given. Returns only the newly loaded tables; they are also
    /// merged into shared state.
    pub async fn fetch_tables(
        &self,
        names: &[String],
        ctx: &FetchContext,
    ) -> Result<Database, LoaderError> {
        let requested: Vec<String> = if names.is_empty() {
            tables_for_tool(&ctx.tool_name)
                .iter()
                .map(|s| s.to_string())
                .collect()
        } else {
            names.to_vec()
        };

        let mut missing: Vec<String> = Vec::new();
        for name in requested {
            if !missing.contains(&name) && !self.state.contains(&name).await {
                missing.push(name);
            }
        }

        if missing.is_empty() {
            debug!(tool = %ctx.tool_name, "all requested tables already loaded");
            return Ok(Database::new());
        }
        debug!(tool = %ctx.tool_name, tables = ?missing, "fetching missing tables");

        let fetched: Vec<(String, _)> = try_join_all(missing.into_iter().map(|name| {
            let store = self.store.clone();
            async move {
                let table = store.load_table(&TableRef::parse(&name)).await?;
                Ok::<_, LoaderError>((name, table))
            }
        }))
        .await?;

        let fetched: Database = fetched.into_iter().collect();
        self.state.merge(fetched.clone()).await;
        Ok(fetched)
    }

    /// Phased estimator fetch: each phase's table set is loaded concurrently
    /// and the partial results shallow-merged.
    pub async fn fetch_phased(&self, ctx: &FetchContext) -> Result<Database, LoaderError> {
        let parts = try_join_all(ESTIMATOR_PHASES.iter().map(|(phase, tables)| {
            let names: Vec<String> = tables.iter().map(|s| s.to_string()).collect();
            async move {
                let fetched = self.fetch_tables(&names, ctx).await?;
                debug!(phase, tables = fetched.len(), "estimator phase loaded");
                Ok::<_, LoaderError>(fetched)
            }
        }))
        .await?;

        let mut merged = Database::new();
        for part in parts {
            merged.extend(part);
        }
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use db::models::table::{Column, Table};
    use crate::storage::memory::MemoryStore;

    fn empty_table() -> Table {
        Table::new(vec![Column::text("id")])
    }

    async fn store_with(names: &[&str]) -> Arc<MemoryStore> {
        let mut store = MemoryStore::new();
        for name in names {
            store = store.with_table(name, empty_table()).await;
        }
        Arc::new(store)
    }

    #[tokio::test]
    async fn present_tables_are_never_refetched() {
        let store = store_with(&["orders", "customers"]).await;
        let loader = TableLoader::new(store.clone(), DatabaseState::new());
        let ctx = FetchContext::for_tool("orders");

        let first = loader
            .fetch_tables(&["orders".to_string(), "customers".to_string()], &ctx)
            .await
            .unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(store.load_calls(), 2);

        // Second request: both already in memory, the store stays untouched.
        let second = loader
            .fetch_tables(&["orders".to_string(), "customers".to_string()], &ctx)
            .await
            .unwrap();
        assert!(second.is_empty());
        assert_eq!(store.load_calls(), 2);
    }

    #[tokio::test]
    async fn duplicate_names_in_one_request_fetch_once() {
        let store = store_with(&["orders"]).await;
        let loader = TableLoader::new(store.clone(), DatabaseState::new());
        let names = vec!["orders".to_string(), "orders".to_string()];
        loader
            .fetch_tables(&names, &FetchContext::for_tool("orders"))
            .await
            .unwrap();
        assert_eq!(store.load_calls(), 1);
    }

    #[tokio::test]
    async fn empty_request_falls_back_to_tool_dependencies() {
        let store = store_with(&["ink_recipes", "inks"]).await;
        let loader = TableLoader::new(store.clone(), DatabaseState::new());
        let fetched = loader
            .fetch_tables(&[], &FetchContext::for_tool("ink_recipes"))
            .await
            .unwrap();
        assert_eq!(fetched.len(), 2);
        assert!(fetched.contains_key("ink_recipes"));
        assert!(fetched.contains_key("inks"));
    }

    #[tokio::test]
    async fn missing_table_propagates_not_found() {
        let store = store_with(&[]).await;
        let loader = TableLoader::new(store, DatabaseState::new());
        let err = loader
            .fetch_tables(&["orders".to_string()], &FetchContext::for_tool("orders"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LoaderError::Storage(StorageError::TableNotFound(_))
        ));
    }

    #[tokio::test]
    async fn phased_fetch_merges_all_phases() {
        let store = store_with(&[
            "settings",
            "manufacturers",
            "products_master",
            "product_prices",
            "customers",
        ])
        .await;
        let state = DatabaseState::new();
        let loader = TableLoader::new(store.clone(), state.clone());
        let merged = loader
            .fetch_phased(&FetchContext::for_tool("estimator"))
            .await
            .unwrap();
        assert_eq!(merged.len(), 5);
        assert_eq!(state.len().await, 5);
        assert_eq!(store.load_calls(), 5);
    }

    #[tokio::test]
    async fn sharded_names_resolve_to_their_shard() {
        let store = store_with(&["stock_m01"]).await;
        let loader = TableLoader::new(store.clone(), DatabaseState::new());
        let fetched = loader
            .fetch_tables(&["stock_m01".to_string()], &FetchContext::for_tool("inventory"))
            .await
            .unwrap();
        assert!(fetched.contains_key("stock_m01"));
    }
}
