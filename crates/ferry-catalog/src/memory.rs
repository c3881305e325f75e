//! In-process catalog store.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ferry_core::{CatalogEntry, CatalogFilter, CatalogStore};
use tokio::sync::RwLock;

#[derive(Default)]
struct CatalogState {
    entries: BTreeMap<String, CatalogEntry>,
    markers: HashMap<String, DateTime<Utc>>,
}

/// Catalog store kept in memory, keyed and ordered by storage path.
#[derive(Default)]
pub struct MemoryCatalogStore {
    state: RwLock<CatalogState>,
}

impl MemoryCatalogStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records.
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn find_one(&self, filter: &CatalogFilter) -> anyhow::Result<Option<CatalogEntry>> {
        let state = self.state.read().await;
        if let CatalogFilter::Path(path) = filter {
            return Ok(state.entries.get(path).cloned());
        }
        Ok(state
            .entries
            .values()
            .find(|entry| filter.matches(entry))
            .cloned())
    }

    async fn upsert(&self, entry: CatalogEntry) -> anyhow::Result<()> {
        self.state
            .write()
            .await
            .entries
            .insert(entry.path.clone(), entry);
        Ok(())
    }

    async fn bulk_replace(&self, entries: Vec<CatalogEntry>) -> anyhow::Result<()> {
        let mut state = self.state.write().await;
        state.entries = entries
            .into_iter()
            .map(|entry| (entry.path.clone(), entry))
            .collect();
        Ok(())
    }

    async fn set_marker(&self, key: &str, at: DateTime<Utc>) -> anyhow::Result<()> {
        self.state.write().await.markers.insert(key.to_string(), at);
        Ok(())
    }

    async fn get_marker(&self, key: &str) -> anyhow::Result<Option<DateTime<Utc>>> {
        Ok(self.state.read().await.markers.get(key).copied())
    }

    async fn list(&self) -> anyhow::Result<Vec<CatalogEntry>> {
        Ok(self.state.read().await.entries.values().cloned().collect())
    }
}
