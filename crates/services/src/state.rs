//! The shared in-memory database: the single mutable resource within a
//! process, owned here and handed to services by clone of the handle.

use std::sync::Arc;

use db::models::table::{Database, Table};
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct DatabaseState {
    inner: Arc<RwLock<Database>>,
}

impl DatabaseState {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> Database {
        self.inner.read().await.clone()
    }

    pub async fn table(&self, name: &str) -> Option<Table> {
        self.inner.read().await.get(name).cloned()
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.inner.read().await.contains_key(name)
    }

    /// Shallow merge by table name: fetched tables replace existing entries.
    pub async fn merge(&self, fetched: Database) {
        self.inner.write().await.extend(fetched);
    }

    pub async fn insert(&self, name: String, table: Table) {
        self.inner.write().await.insert(name, table);
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
