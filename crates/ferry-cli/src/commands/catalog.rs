use std::sync::Arc;

use ferry_app::{CatalogRescan, RescanReport, dropbox_store};
use ferry_catalog::{CatalogIndexer, MemoryCatalogStore};
use ferry_core::{CatalogEntry, RemoteStore};
use ferry_metadata::{FilenameParser, FuzzyIndex, SharedIndex};
use ferry_swarm::ExtensionAllowList;

use crate::commands::metadata::build_index;
use crate::context::{CliContext, CliError, CliResult};
use crate::output::render_catalog;

pub(crate) async fn handle_rescan(ctx: &CliContext) -> CliResult<()> {
    let store = dropbox_store(&ctx.config).map_err(CliError::failure)?;
    let (index, _) = build_index(&ctx.config).await?;
    let (report, entries) = rescan_remote(
        Arc::new(store),
        index,
        &ctx.config.acquisition.allowed_extensions,
        &ctx.config.store.root_folder,
    )
    .await?;
    render_catalog(&report, &entries, ctx.output)
}

/// One-shot rescan into a scratch catalog, returning what was indexed.
async fn rescan_remote(
    remote: Arc<dyn RemoteStore>,
    index: FuzzyIndex,
    allowed_extensions: &[String],
    root_folder: &str,
) -> CliResult<(RescanReport, Vec<CatalogEntry>)> {
    let indexer = CatalogIndexer::new(Arc::new(MemoryCatalogStore::new()));
    let rescan = CatalogRescan::new(
        remote,
        indexer.clone(),
        FilenameParser::new().map_err(CliError::failure)?,
        SharedIndex::new(index),
        ExtensionAllowList::new(allowed_extensions),
        root_folder,
    );
    let report = rescan.rescan().await.map_err(CliError::failure)?;
    let entries = indexer.list().await.map_err(CliError::failure)?;
    Ok((report, entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::RemoteFile;
    use ferry_test_support::remote::{RecordingRemoteStore, RemoteCall};

    fn listed(name: &str, size_bytes: u64) -> RemoteFile {
        RemoteFile {
            path: format!("/games/{name}"),
            name: name.to_string(),
            size_bytes,
            url: format!("https://store.test/games/{name}"),
        }
    }

    #[tokio::test]
    async fn rescan_indexes_allowed_files_only() -> anyhow::Result<()> {
        let remote = Arc::new(RecordingRemoteStore::new());
        remote.set_listing(vec![
            listed("Celeste [0100000000020000][v3].nsp", 1_024),
            listed("notes.txt", 12),
        ]);

        let (report, entries) = rescan_remote(
            remote.clone(),
            FuzzyIndex::new(),
            &["nsp".to_string(), "xci".to_string()],
            "/games",
        )
        .await
        .map_err(|err| anyhow::anyhow!(err.display_message()))?;

        assert_eq!(report.listed, 2);
        assert_eq!(report.indexed, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title_id.as_deref(), Some("0100000000020000"));
        assert_eq!(entries[0].version, Some(3));
        assert_eq!(
            remote.calls(),
            vec![RemoteCall::ListFolder {
                path: "/games".to_string(),
            }]
        );
        Ok(())
    }

    #[tokio::test]
    async fn listing_failure_exits_as_operational_error() {
        let remote = Arc::new(RecordingRemoteStore::new());
        remote.fail_step("list_folder");

        let err = rescan_remote(remote, FuzzyIndex::new(), &["nsp".to_string()], "/games")
            .await
            .err()
            .expect("listing failure propagates");
        assert_eq!(err.exit_code(), 3);
    }
}
