//! Duplicate detection against the catalog.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use ferry_core::{CatalogEntry, CatalogFilter, CatalogStore};
use serde::Serialize;
use tracing::warn;

/// Which rule identified a duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Same file name (exact or case-insensitive).
    Filename,
    /// Same title identifier and version under a different file name.
    Logic,
}

impl MatchKind {
    /// Stable label used in logs and error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Filename => "filename",
            Self::Logic => "logic",
        }
    }
}

impl Display for MatchKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// An existing catalog record that collides with a candidate payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateMatch {
    /// Rule that matched.
    pub kind: MatchKind,
    /// The colliding record.
    pub entry: CatalogEntry,
}

/// Consults the catalog before a payload is admitted.
///
/// Lookup failures fail open: the payload is admitted and the failure logged.
#[derive(Clone)]
pub struct DedupGuard {
    store: Arc<dyn CatalogStore>,
}

impl DedupGuard {
    /// Guard backed by `store`.
    #[must_use]
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Look for a record colliding with `file_name` or `(title_id, version)`.
    pub async fn check(
        &self,
        file_name: &str,
        title_id: Option<&str>,
        version: Option<u64>,
    ) -> Option<DuplicateMatch> {
        match self.find(file_name, title_id, version).await {
            Ok(found) => found,
            Err(err) => {
                warn!(
                    file_name,
                    error = %err,
                    "catalog lookup failed; admitting payload"
                );
                None
            }
        }
    }

    async fn find(
        &self,
        file_name: &str,
        title_id: Option<&str>,
        version: Option<u64>,
    ) -> anyhow::Result<Option<DuplicateMatch>> {
        for filter in [
            CatalogFilter::FileName(file_name.to_string()),
            CatalogFilter::FileNameIgnoreCase(file_name.to_string()),
        ] {
            if let Some(entry) = self.store.find_one(&filter).await? {
                return Ok(Some(DuplicateMatch {
                    kind: MatchKind::Filename,
                    entry,
                }));
            }
        }

        let Some(title_id) = title_id else {
            return Ok(None);
        };
        let release = CatalogFilter::Release {
            title_id: title_id.to_string(),
            version,
        };
        Ok(self
            .store
            .find_one(&release)
            .await?
            .map(|entry| DuplicateMatch {
                kind: MatchKind::Logic,
                entry,
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryCatalogStore;
    use ferry_test_support::catalog::UnreachableCatalog;

    fn entry(path: &str, file_name: &str, title_id: Option<&str>, version: Option<u64>) -> CatalogEntry {
        CatalogEntry {
            path: path.into(),
            name: file_name.into(),
            file_name: file_name.into(),
            size_bytes: 1,
            url: format!("https://store.test{path}"),
            title_id: title_id.map(str::to_string),
            version,
            indexed_at: None,
        }
    }

    async fn seeded_guard() -> DedupGuard {
        let store = Arc::new(MemoryCatalogStore::new());
        store
            .upsert(entry(
                "/games/Super Mario Odyssey.nsp",
                "Super Mario Odyssey.nsp",
                Some("0100000000010000"),
                Some(65_536),
            ))
            .await
            .expect("seed");
        DedupGuard::new(store)
    }

    #[tokio::test]
    async fn case_variant_filename_is_a_filename_match() {
        let guard = seeded_guard().await;
        let found = guard
            .check("SUPER MARIO ODYSSEY.NSP", None, None)
            .await
            .expect("duplicate");
        assert_eq!(found.kind, MatchKind::Filename);
    }

    #[tokio::test]
    async fn accented_case_variant_is_a_filename_match() {
        let store = Arc::new(MemoryCatalogStore::new());
        store
            .upsert(entry("/games/Pokémon Violet.nsp", "Pokémon Violet.nsp", None, None))
            .await
            .expect("seed");
        let guard = DedupGuard::new(store);

        let found = guard
            .check("POKÉMON VIOLET.NSP", None, None)
            .await
            .expect("duplicate");
        assert_eq!(found.kind, MatchKind::Filename);
        assert_eq!(found.entry.path, "/games/Pokémon Violet.nsp");
    }

    #[tokio::test]
    async fn same_release_under_new_name_is_a_logic_match() {
        let guard = seeded_guard().await;
        let found = guard
            .check("SMO [0100000000010000][v65536].nsp", Some("0100000000010000"), Some(65_536))
            .await
            .expect("duplicate");
        assert_eq!(found.kind, MatchKind::Logic);
        assert_eq!(found.entry.path, "/games/Super Mario Odyssey.nsp");
    }

    #[tokio::test]
    async fn different_version_or_unrelated_payload_is_admitted() {
        let guard = seeded_guard().await;
        assert!(
            guard
                .check("SMO update.nsp", Some("0100000000010000"), Some(131_072))
                .await
                .is_none()
        );
        assert!(guard.check("Celeste.nsp", None, None).await.is_none());
    }

    #[tokio::test]
    async fn lookup_failures_fail_open() {
        let store = Arc::new(UnreachableCatalog::new());
        let guard = DedupGuard::new(store.clone());
        assert!(
            guard
                .check("anything.nsp", Some("0100000000010000"), None)
                .await
                .is_none()
        );
        assert_eq!(store.attempts(), 1);
    }
}
