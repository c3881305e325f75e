//! In-memory remote store that records every request.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::bail;
use async_trait::async_trait;
use ferry_core::{CommitInfo, RemoteFile, RemoteStore};

/// One request observed by [`RecordingRemoteStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    /// Single-shot upload.
    Upload {
        /// Requested path.
        path: String,
        /// Body length.
        len: u64,
    },
    /// Session opened with its first chunk.
    SessionStart {
        /// Chunk length.
        len: u64,
    },
    /// Chunk appended to an open session.
    SessionAppend {
        /// Session identifier.
        session_id: String,
        /// Offset claimed by the caller.
        offset: u64,
        /// Chunk length.
        len: u64,
    },
    /// Final chunk and commit.
    SessionFinish {
        /// Session identifier.
        session_id: String,
        /// Offset claimed by the caller.
        offset: u64,
        /// Chunk length.
        len: u64,
        /// Requested path.
        path: String,
    },
    /// Folder listing.
    ListFolder {
        /// Listed folder.
        path: String,
    },
}

#[derive(Default)]
struct State {
    calls: Vec<RemoteCall>,
    failing: HashSet<String>,
    listing: Vec<RemoteFile>,
    offsets: HashMap<String, u64>,
    bytes: u64,
}

/// [`RemoteStore`] double with failure injection and optional latency.
///
/// Session chunks are checked against each session's running offset so
/// out-of-order chunks fail the way a real store would.
#[derive(Default)]
pub struct RecordingRemoteStore {
    state: Mutex<State>,
    latency: Option<Duration>,
}

impl RecordingRemoteStore {
    /// Store that accepts every request immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that sleeps for `latency` before answering each request.
    #[must_use]
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    /// Make every request of the named kind fail
    /// (`upload`, `session_start`, `session_append`, `session_finish`, `list_folder`).
    pub fn fail_step(&self, step: &str) {
        self.lock().failing.insert(step.to_string());
    }

    /// Files returned by `list_folder`.
    pub fn set_listing(&self, files: Vec<RemoteFile>) {
        self.lock().listing = files;
    }

    /// Requests observed so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.lock().calls.clone()
    }

    /// Sum of body lengths accepted so far.
    #[must_use]
    pub fn bytes_received(&self) -> u64 {
        self.lock().bytes
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn pause(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn record(&self, step: &str, call: RemoteCall, len: u64) -> anyhow::Result<()> {
        let mut state = self.lock();
        state.calls.push(call);
        if state.failing.contains(step) {
            bail!("{step} rejected by test store");
        }
        state.bytes += len;
        Ok(())
    }

    fn advance_session(&self, session_id: &str, offset: u64, len: u64) -> anyhow::Result<()> {
        let mut state = self.lock();
        let Some(expected) = state.offsets.get_mut(session_id) else {
            bail!("unknown upload session {session_id}");
        };
        if *expected != offset {
            bail!("incorrect_offset: expected {expected}, got {offset}");
        }
        *expected += len;
        Ok(())
    }
}

fn len_of(bytes: &[u8]) -> u64 {
    u64::try_from(bytes.len()).unwrap_or(u64::MAX)
}

fn remote_file(path: &str, size_bytes: u64) -> RemoteFile {
    RemoteFile {
        path: path.to_string(),
        name: path.rsplit('/').next().unwrap_or(path).to_string(),
        size_bytes,
        url: format!("https://store.test{path}"),
    }
}

#[async_trait]
impl RemoteStore for RecordingRemoteStore {
    async fn upload(&self, commit: &CommitInfo, bytes: Vec<u8>) -> anyhow::Result<RemoteFile> {
        self.pause().await;
        let len = len_of(&bytes);
        self.record(
            "upload",
            RemoteCall::Upload {
                path: commit.path.clone(),
                len,
            },
            len,
        )?;
        Ok(remote_file(&commit.path, len))
    }

    async fn session_start(&self, bytes: Vec<u8>) -> anyhow::Result<String> {
        self.pause().await;
        let len = len_of(&bytes);
        self.record("session_start", RemoteCall::SessionStart { len }, len)?;
        let mut state = self.lock();
        let session_id = format!("session-{}", state.offsets.len() + 1);
        state.offsets.insert(session_id.clone(), len);
        Ok(session_id)
    }

    async fn session_append(
        &self,
        session_id: &str,
        offset: u64,
        bytes: Vec<u8>,
    ) -> anyhow::Result<()> {
        self.pause().await;
        let len = len_of(&bytes);
        self.record(
            "session_append",
            RemoteCall::SessionAppend {
                session_id: session_id.to_string(),
                offset,
                len,
            },
            len,
        )?;
        self.advance_session(session_id, offset, len)
    }

    async fn session_finish(
        &self,
        session_id: &str,
        offset: u64,
        bytes: Vec<u8>,
        commit: &CommitInfo,
    ) -> anyhow::Result<RemoteFile> {
        self.pause().await;
        let len = len_of(&bytes);
        self.record(
            "session_finish",
            RemoteCall::SessionFinish {
                session_id: session_id.to_string(),
                offset,
                len,
                path: commit.path.clone(),
            },
            len,
        )?;
        self.advance_session(session_id, offset, len)?;
        Ok(remote_file(&commit.path, offset + len))
    }

    async fn list_folder(&self, path: &str) -> anyhow::Result<Vec<RemoteFile>> {
        self.record(
            "list_folder",
            RemoteCall::ListFolder {
                path: path.to_string(),
            },
            0,
        )?;
        Ok(self.lock().listing.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_calls_and_honours_failures() {
        let store = RecordingRemoteStore::new();
        let session = store.session_start(vec![0; 4]).await.expect("start");
        assert_eq!(session, "session-1");

        store.fail_step("session_append");
        let err = store
            .session_append(&session, 4, vec![0; 4])
            .await
            .expect_err("append rejected");
        assert!(err.to_string().contains("session_append"));
        assert_eq!(store.calls().len(), 2);
        assert_eq!(store.bytes_received(), 4);
    }

    #[tokio::test]
    async fn out_of_order_offsets_are_rejected() {
        let store = RecordingRemoteStore::new();
        let session = store.session_start(vec![0; 4]).await.expect("start");
        let err = store
            .session_append(&session, 8, vec![0; 4])
            .await
            .expect_err("gap in offsets");
        assert!(err.to_string().contains("incorrect_offset"));
    }
}
