use std::sync::Arc;

use ferry_app::{AppError, Collaborators, TransferService};
use ferry_catalog::MemoryCatalogStore;
use ferry_config::{FerryConfig, MetadataEndpoint};
use ferry_core::{RemoteFile, TransferError};
use ferry_events::{Event, EventBus};
use ferry_telemetry::Metrics;
use ferry_test_support::remote::{RecordingRemoteStore, RemoteCall};
use ferry_test_support::swarm::ScriptedSwarm;
use httpmock::prelude::*;
use serde_json::json;
use tokio_stream::StreamExt;

fn remote_file(name: &str, size_bytes: u64) -> RemoteFile {
    RemoteFile {
        path: format!("/games/{name}"),
        name: name.to_string(),
        size_bytes,
        url: format!("https://store.test/games/{name}"),
    }
}

fn service(
    config: &FerryConfig,
    remote: Arc<RecordingRemoteStore>,
) -> anyhow::Result<TransferService> {
    let service = TransferService::new(
        config,
        Collaborators {
            swarm: Arc::new(ScriptedSwarm::new()),
            remote,
            catalog: Arc::new(MemoryCatalogStore::new()),
        },
        EventBus::new(),
        Metrics::new()?,
    )?;
    Ok(service)
}

#[tokio::test]
async fn rebuilt_index_feeds_catalog_rescan() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let titles = server.mock(|when, then| {
        when.method(GET).path("/titles.json");
        then.status(200).json_body(json!([
            {"id": "0100000000010000", "name": "Super Mario Odyssey"}
        ]));
    });
    let mut config = FerryConfig::default();
    config.metadata.sources = vec![MetadataEndpoint {
        name: "titles".to_string(),
        url: server.url("/titles.json"),
    }];
    let remote = Arc::new(RecordingRemoteStore::new());
    remote.set_listing(vec![
        remote_file("Super Mario Odyssey.nsp", 4_096),
        remote_file("notes.txt", 12),
    ]);
    let service = service(&config, remote.clone())?;
    let mut events = service.events().subscribe(None);

    let report = service.rebuild_metadata().await;
    titles.assert();
    assert!(report.failed.is_empty());
    assert!(report.keys > 0);
    assert_eq!(
        service.orchestrator().metrics().snapshot().metadata_index_keys,
        i64::try_from(report.keys)?
    );
    let published = events.next().await.map(|envelope| envelope.event);
    assert_eq!(
        published,
        Some(Event::MetadataIndexRebuilt {
            keys: report.keys,
            sources: 1,
        })
    );

    let rescan = service.rescan().await?;
    assert_eq!((rescan.listed, rescan.indexed, rescan.skipped), (2, 1, 1));
    assert_eq!(
        remote.calls(),
        vec![RemoteCall::ListFolder {
            path: "/games".to_string(),
        }]
    );

    let (entries, last_indexed) = service.catalog().await?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "Super Mario Odyssey");
    assert_eq!(entries[0].title_id.as_deref(), Some("0100000000010000"));
    assert!(last_indexed.is_some());
    Ok(())
}

#[tokio::test]
async fn failed_listing_leaves_catalog_untouched() -> anyhow::Result<()> {
    let mut config = FerryConfig::default();
    config.metadata.sources.clear();
    let remote = Arc::new(RecordingRemoteStore::new());
    remote.set_listing(vec![remote_file("Celeste.nsp", 64)]);
    let service = service(&config, remote.clone())?;
    service.rescan().await?;

    remote.fail_step("list_folder");
    let err = service.rescan().await.err().expect("listing fails");
    assert!(matches!(
        err,
        AppError::Transfer {
            operation: "rescan.list_folder",
            source: TransferError::UploadFailure {
                step: "list_folder",
                ..
            },
        }
    ));
    let (entries, _) = service.catalog().await?;
    assert_eq!(entries.len(), 1);
    Ok(())
}

#[tokio::test]
async fn bundled_store_requires_a_token() {
    let config = FerryConfig::default();
    let result = TransferService::from_config(
        &config,
        Arc::new(ScriptedSwarm::new()),
        Arc::new(MemoryCatalogStore::new()),
    );
    assert!(matches!(
        result,
        Err(AppError::Config {
            operation: "store.access_token",
            ..
        })
    ));
}
