//! Full catalog rebuild from the remote folder listing.

use std::sync::Arc;

use ferry_catalog::CatalogIndexer;
use ferry_core::{CatalogEntry, RemoteFile, RemoteStore, TransferError};
use ferry_metadata::{FilenameParser, FuzzyIndex, SharedIndex};
use ferry_swarm::ExtensionAllowList;
use serde::Serialize;
use tracing::info;

use crate::error::{AppError, AppResult};

/// Outcome of one re-scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RescanReport {
    /// Objects returned by the folder listing.
    pub listed: usize,
    /// Records written to the catalog.
    pub indexed: usize,
    /// Objects ignored by the extension allow-list.
    pub skipped: usize,
}

/// Lists the remote root folder and replaces the catalog with what it finds.
#[derive(Clone)]
pub struct CatalogRescan {
    remote: Arc<dyn RemoteStore>,
    indexer: CatalogIndexer,
    parser: FilenameParser,
    index: SharedIndex,
    allowed: ExtensionAllowList,
    root_folder: String,
}

impl CatalogRescan {
    /// Re-scanner over `remote` writing through `indexer`.
    #[must_use]
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        indexer: CatalogIndexer,
        parser: FilenameParser,
        index: SharedIndex,
        allowed: ExtensionAllowList,
        root_folder: impl Into<String>,
    ) -> Self {
        Self {
            remote,
            indexer,
            parser,
            index,
            allowed,
            root_folder: root_folder.into(),
        }
    }

    /// Rebuild the catalog from the remote listing.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Transfer`] when the listing or the catalog write fails;
    /// the catalog is left untouched if the listing fails.
    pub async fn rescan(&self) -> AppResult<RescanReport> {
        let files = self
            .remote
            .list_folder(&self.root_folder)
            .await
            .map_err(|err| {
                AppError::transfer(
                    "rescan.list_folder",
                    TransferError::upload("list_folder", err),
                )
            })?;
        let listed = files.len();
        let index = self.index.current();
        let entries: Vec<CatalogEntry> = files
            .into_iter()
            .filter(|file| self.allowed.allows(&file.name))
            .map(|file| self.entry_for(file, &index))
            .collect();
        let skipped = listed - entries.len();

        let indexed = self
            .indexer
            .bulk_replace(entries)
            .await
            .map_err(|err| AppError::transfer("rescan.bulk_replace", err))?;
        info!(
            root = %self.root_folder,
            listed,
            indexed,
            skipped,
            "catalog re-scan complete"
        );
        Ok(RescanReport {
            listed,
            indexed,
            skipped,
        })
    }

    fn entry_for(&self, file: RemoteFile, index: &FuzzyIndex) -> CatalogEntry {
        let parsed = self.parser.parse(&file.name, index);
        CatalogEntry {
            path: file.path,
            name: parsed.clean_name,
            file_name: file.name,
            size_bytes: file.size_bytes,
            url: file.url,
            title_id: parsed.title_id,
            version: parsed.version,
            indexed_at: None,
        }
    }
}
