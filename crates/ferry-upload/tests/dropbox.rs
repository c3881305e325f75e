use std::sync::Arc;

use ferry_core::{CommitInfo, NoopProgress, RemoteStore, TransferError};
use ferry_test_support::fixtures::byte_source;
use ferry_upload::{DropboxConfig, DropboxStore, UploadEngine, UploadSettings, UploadStrategy};
use httpmock::MockServer;
use httpmock::prelude::*;
use serde_json::json;

fn store(server: &MockServer) -> DropboxStore {
    DropboxStore::new(DropboxConfig {
        access_token: "test-token".into(),
        api_url: server.base_url(),
        content_url: server.base_url(),
        link_base: "https://www.dropbox.com/home".into(),
    })
}

#[tokio::test]
async fn direct_upload_sends_commit_arg_and_bytes() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let upload = server.mock(|when, then| {
        when.method(POST)
            .path("/2/files/upload")
            .header("authorization", "Bearer test-token")
            .header("content-type", "application/octet-stream")
            .header(
                "dropbox-api-arg",
                r#"{"path":"/games/Celeste.nsp","mode":"add","autorename":true,"mute":true}"#,
            )
            .body("hello");
        then.status(200).json_body(json!({
            "name": "Celeste.nsp",
            "path_display": "/games/Celeste.nsp",
            "size": 5
        }));
    });

    let remote = store(&server)
        .upload(&CommitInfo::add("/games/Celeste.nsp"), b"hello".to_vec())
        .await?;

    upload.assert();
    assert_eq!(remote.path, "/games/Celeste.nsp");
    assert_eq!(remote.size_bytes, 5);
    assert_eq!(remote.url, "https://www.dropbox.com/home/games/Celeste.nsp");
    Ok(())
}

#[tokio::test]
async fn session_upload_walks_start_append_finish() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let start = server.mock(|when, then| {
        when.method(POST)
            .path("/2/files/upload_session/start")
            .header("dropbox-api-arg", r#"{"close":false}"#);
        then.status(200).json_body(json!({"session_id": "sess-1"}));
    });
    let append = server.mock(|when, then| {
        when.method(POST)
            .path("/2/files/upload_session/append_v2")
            .header(
                "dropbox-api-arg",
                r#"{"cursor":{"session_id":"sess-1","offset":4},"close":false}"#,
            );
        then.status(200).json_body(json!(null));
    });
    let finish = server.mock(|when, then| {
        when.method(POST)
            .path("/2/files/upload_session/finish")
            .header(
                "dropbox-api-arg",
                r#"{"cursor":{"session_id":"sess-1","offset":8},"commit":{"path":"/games/Big.xci","mode":"add","autorename":true,"mute":true}}"#,
            );
        then.status(200).json_body(json!({
            "name": "Big.xci",
            "path_display": "/games/Big.xci",
            "size": 10
        }));
    });

    let engine = UploadEngine::new(
        Arc::new(store(&server)),
        UploadSettings {
            threshold_bytes: 5,
            chunk_bytes: 4,
        },
    );
    let uploaded = engine
        .upload(byte_source(10), "/games/Big.xci", 10, &NoopProgress)
        .await?;

    start.assert();
    append.assert();
    finish.assert();
    assert_eq!(uploaded.strategy, UploadStrategy::Chunked);
    assert_eq!(uploaded.path, "/games/Big.xci");
    Ok(())
}

#[tokio::test]
async fn rejected_session_surfaces_status_and_body() {
    let server = MockServer::start_async().await;
    let start = server.mock(|when, then| {
        when.method(POST).path("/2/files/upload_session/start");
        then.status(409).body("insufficient_space");
    });

    let engine = UploadEngine::new(
        Arc::new(store(&server)),
        UploadSettings {
            threshold_bytes: 1,
            chunk_bytes: 4,
        },
    );
    let err = engine
        .upload(byte_source(8), "/games/full.nsp", 8, &NoopProgress)
        .await
        .expect_err("store rejects the session");

    start.assert();
    assert!(matches!(
        err,
        TransferError::UploadFailure {
            step: "session_start",
            ..
        }
    ));
    let described = err.describe();
    assert!(described.contains("409"), "{described}");
    assert!(described.contains("insufficient_space"), "{described}");
}

#[tokio::test]
async fn list_folder_keeps_files_only() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let listing = server.mock(|when, then| {
        when.method(POST)
            .path("/2/files/list_folder")
            .json_body(json!({"path": "/games", "recursive": false}));
        then.status(200).json_body(json!({
            "entries": [
                {".tag": "folder", "name": "updates", "path_display": "/games/updates"},
                {".tag": "file", "name": "Celeste.nsp", "path_display": "/games/Celeste.nsp", "size": 42}
            ],
            "cursor": "c1",
            "has_more": false
        }));
    });

    let files = store(&server).list_folder("/games").await?;

    listing.assert();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].name, "Celeste.nsp");
    assert_eq!(files[0].size_bytes, 42);
    Ok(())
}

#[tokio::test]
async fn list_folder_follows_continuation_cursor() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let first = server.mock(|when, then| {
        when.method(POST).path("/2/files/list_folder");
        then.status(200).json_body(json!({
            "entries": [{".tag": "file", "name": "a.nsp", "path_display": "/games/a.nsp", "size": 1}],
            "cursor": "page-2",
            "has_more": true
        }));
    });
    let second = server.mock(|when, then| {
        when.method(POST)
            .path("/2/files/list_folder/continue")
            .json_body(json!({"cursor": "page-2"}));
        then.status(200).json_body(json!({
            "entries": [{".tag": "file", "name": "b.xci", "path_display": "/games/b.xci", "size": 2}],
            "cursor": "page-3",
            "has_more": false
        }));
    });

    let files = store(&server).list_folder("/games").await?;

    first.assert();
    second.assert();
    let names: Vec<_> = files.iter().map(|file| file.name.as_str()).collect();
    assert_eq!(names, ["a.nsp", "b.xci"]);
    Ok(())
}
