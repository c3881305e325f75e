//! Catalog store that is always unreachable.

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::bail;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ferry_core::{CatalogEntry, CatalogFilter, CatalogStore};

/// [`CatalogStore`] whose every operation fails with "connection refused".
#[derive(Debug, Default)]
pub struct UnreachableCatalog {
    attempts: AtomicUsize,
}

impl UnreachableCatalog {
    /// Fresh store with no recorded attempts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of operations attempted so far.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn refuse<T>(&self) -> anyhow::Result<T> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        bail!("connection refused")
    }
}

#[async_trait]
impl CatalogStore for UnreachableCatalog {
    async fn find_one(&self, _filter: &CatalogFilter) -> anyhow::Result<Option<CatalogEntry>> {
        self.refuse()
    }

    async fn upsert(&self, _entry: CatalogEntry) -> anyhow::Result<()> {
        self.refuse()
    }

    async fn bulk_replace(&self, _entries: Vec<CatalogEntry>) -> anyhow::Result<()> {
        self.refuse()
    }

    async fn set_marker(&self, _key: &str, _at: DateTime<Utc>) -> anyhow::Result<()> {
        self.refuse()
    }

    async fn get_marker(&self, _key: &str) -> anyhow::Result<Option<DateTime<Utc>>> {
        self.refuse()
    }

    async fn list(&self) -> anyhow::Result<Vec<CatalogEntry>> {
        self.refuse()
    }
}
