//! Collaborator traits implemented by swarm, remote store and catalog adapters.

use std::sync::Arc;

use anyhow::bail;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::io::AsyncRead;

use crate::model::{
    CatalogEntry, CatalogFilter, CommitInfo, DownloadTelemetry, RemoteFile, SwarmFile, SwarmStats,
    TransferDescriptor,
};

/// Sequential byte stream over a payload file.
pub type ByteSource = Box<dyn AsyncRead + Send + Unpin>;

/// Peer-to-peer client able to admit descriptors.
#[async_trait]
pub trait SwarmClient: Send + Sync {
    /// Admit a descriptor and resolve once its metadata (name and file list) is known.
    async fn add(&self, descriptor: &TransferDescriptor) -> anyhow::Result<Arc<dyn SwarmHandle>>;
}

/// A swarm resource whose metadata has resolved.
#[async_trait]
pub trait SwarmHandle: Send + Sync {
    /// Swarm-reported display name.
    fn name(&self) -> String;

    /// Files contained in the resource, in metadata order.
    fn files(&self) -> Vec<SwarmFile>;

    /// Live download statistics.
    fn stats(&self) -> SwarmStats;

    /// Open a sequential stream over the file at `index`.
    async fn open(&self, index: usize) -> anyhow::Result<ByteSource>;

    /// Tear the resource down and release its peers.
    async fn destroy(&self) -> anyhow::Result<()>;
}

/// Remote object store supporting single-shot and session uploads.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Write a whole object in one request.
    async fn upload(&self, commit: &CommitInfo, bytes: Vec<u8>) -> anyhow::Result<RemoteFile>;

    /// Open an upload session carrying the first chunk; returns the session id.
    async fn session_start(&self, bytes: Vec<u8>) -> anyhow::Result<String>;

    /// Append a chunk at `offset` to an open session.
    async fn session_append(
        &self,
        session_id: &str,
        offset: u64,
        bytes: Vec<u8>,
    ) -> anyhow::Result<()>;

    /// Send the final chunk at `offset` and commit the session.
    async fn session_finish(
        &self,
        session_id: &str,
        offset: u64,
        bytes: Vec<u8>,
        commit: &CommitInfo,
    ) -> anyhow::Result<RemoteFile>;

    /// List files under a folder; default implementation reports lack of support.
    async fn list_folder(&self, path: &str) -> anyhow::Result<Vec<RemoteFile>> {
        let _ = path;
        bail!("folder listing not supported by this store");
    }
}

/// Record store backing the payload catalog.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// First record matching `filter`, if any.
    async fn find_one(&self, filter: &CatalogFilter) -> anyhow::Result<Option<CatalogEntry>>;

    /// Create or replace the record keyed by `entry.path`.
    async fn upsert(&self, entry: CatalogEntry) -> anyhow::Result<()>;

    /// Replace the whole collection with `entries`.
    async fn bulk_replace(&self, entries: Vec<CatalogEntry>) -> anyhow::Result<()>;

    /// Record a named timestamp marker.
    async fn set_marker(&self, key: &str, at: DateTime<Utc>) -> anyhow::Result<()>;

    /// Read a named timestamp marker.
    async fn get_marker(&self, key: &str) -> anyhow::Result<Option<DateTime<Utc>>>;

    /// All records, ordered by path.
    async fn list(&self) -> anyhow::Result<Vec<CatalogEntry>>;
}

/// Receiver for progress notifications raised while a job runs.
pub trait ProgressSink: Send + Sync {
    /// Swarm progress for the payload being acquired.
    fn download(&self, telemetry: DownloadTelemetry);

    /// Cumulative bytes committed to the remote store.
    fn upload(&self, bytes_uploaded: u64, bytes_total: u64);
}

/// Sink that discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn download(&self, _telemetry: DownloadTelemetry) {}

    fn upload(&self, _bytes_uploaded: u64, _bytes_total: u64) {}
}
