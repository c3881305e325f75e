//! Catalog writes and the "last index time" marker.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ferry_core::{CatalogEntry, CatalogStore, TransferError, TransferResult};
use tracing::debug;

/// Marker advanced after every catalog write; downstream consumers poll it.
pub const LAST_INDEX_MARKER: &str = "last_index_time";

/// Writes finished transfers into the catalog.
#[derive(Clone)]
pub struct CatalogIndexer {
    store: Arc<dyn CatalogStore>,
}

impl CatalogIndexer {
    /// Indexer backed by `store`.
    #[must_use]
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Create or replace the record at `entry.path`, stamp it, and advance the marker.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::CatalogUnavailable`] when either write fails.
    pub async fn upsert(&self, mut entry: CatalogEntry) -> TransferResult<CatalogEntry> {
        let now = Utc::now();
        entry.indexed_at = Some(now);
        self.store
            .upsert(entry.clone())
            .await
            .map_err(|err| TransferError::catalog("upsert", err))?;
        self.touch(now).await?;
        debug!(path = %entry.path, "catalog record indexed");
        Ok(entry)
    }

    /// Replace the whole catalog with `entries`; later duplicates of a path win.
    ///
    /// Returns the number of records stored.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::CatalogUnavailable`] when either write fails.
    pub async fn bulk_replace(&self, entries: Vec<CatalogEntry>) -> TransferResult<usize> {
        let now = Utc::now();
        let by_path: BTreeMap<String, CatalogEntry> = entries
            .into_iter()
            .map(|mut entry| {
                entry.indexed_at = Some(now);
                (entry.path.clone(), entry)
            })
            .collect();
        let count = by_path.len();
        self.store
            .bulk_replace(by_path.into_values().collect())
            .await
            .map_err(|err| TransferError::catalog("bulk_replace", err))?;
        self.touch(now).await?;
        debug!(records = count, "catalog snapshot replaced");
        Ok(count)
    }

    /// When the catalog was last written.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::CatalogUnavailable`] when the marker cannot be read.
    pub async fn last_indexed(&self) -> TransferResult<Option<DateTime<Utc>>> {
        self.store
            .get_marker(LAST_INDEX_MARKER)
            .await
            .map_err(|err| TransferError::catalog("get_marker", err))
    }

    /// Every record, ordered by path.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::CatalogUnavailable`] when the store cannot be read.
    pub async fn list(&self) -> TransferResult<Vec<CatalogEntry>> {
        self.store
            .list()
            .await
            .map_err(|err| TransferError::catalog("list", err))
    }

    async fn touch(&self, at: DateTime<Utc>) -> TransferResult<()> {
        self.store
            .set_marker(LAST_INDEX_MARKER, at)
            .await
            .map_err(|err| TransferError::catalog("set_marker", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryCatalogStore;
    use ferry_core::CatalogFilter;

    fn entry(path: &str, size_bytes: u64) -> CatalogEntry {
        CatalogEntry {
            path: path.into(),
            name: "Demo".into(),
            file_name: path.rsplit('/').next().unwrap_or(path).into(),
            size_bytes,
            url: format!("https://store.test{path}"),
            title_id: None,
            version: None,
            indexed_at: None,
        }
    }

    #[tokio::test]
    async fn upsert_stamps_entry_and_advances_marker() -> TransferResult<()> {
        let store = Arc::new(MemoryCatalogStore::new());
        let indexer = CatalogIndexer::new(store.clone());
        assert!(indexer.last_indexed().await?.is_none());

        let stored = indexer.upsert(entry("/games/demo.nsp", 5)).await?;
        let stamped = stored.indexed_at.expect("indexed_at set");
        assert_eq!(indexer.last_indexed().await?, Some(stamped));

        let found = store
            .find_one(&CatalogFilter::Path("/games/demo.nsp".into()))
            .await
            .map_err(|err| TransferError::catalog("find_one", err))?;
        assert_eq!(found, Some(stored));
        Ok(())
    }

    #[tokio::test]
    async fn bulk_replace_keeps_one_record_per_path() -> TransferResult<()> {
        let store = Arc::new(MemoryCatalogStore::new());
        let indexer = CatalogIndexer::new(store.clone());
        indexer.upsert(entry("/games/stale.nsp", 1)).await?;

        let stored = indexer
            .bulk_replace(vec![
                entry("/games/a.nsp", 1),
                entry("/games/b.xci", 2),
                entry("/games/a.nsp", 3),
            ])
            .await?;
        assert_eq!(stored, 2);

        let listed = indexer.list().await?;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].size_bytes, 3);
        assert!(listed.iter().all(|record| record.indexed_at.is_some()));
        Ok(())
    }
}
