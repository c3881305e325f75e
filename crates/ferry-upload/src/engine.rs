//! Streams a byte source into the remote store.
//!
//! # Design
//! - Strategy is a pure function of the declared size.
//! - Session chunks go out strictly in offset order, one request at a time.
//! - Sources that end early or run long are rejected before the final commit.

use std::io;
use std::sync::Arc;

use ferry_core::{
    ByteSource, CommitInfo, ProgressSink, RemoteStore, TransferError, TransferResult,
};
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

use crate::strategy::{UploadSession, UploadSettings, UploadStrategy, UploadedObject};

/// Writes payloads to a [`RemoteStore`] using the direct or chunked strategy.
#[derive(Clone)]
pub struct UploadEngine {
    store: Arc<dyn RemoteStore>,
    settings: UploadSettings,
}

impl UploadEngine {
    /// Engine writing to `store` with the given size tuning.
    #[must_use]
    pub fn new(store: Arc<dyn RemoteStore>, settings: UploadSettings) -> Self {
        Self {
            store,
            settings: UploadSettings {
                chunk_bytes: settings.chunk_bytes.max(1),
                ..settings
            },
        }
    }

    /// Effective size tuning.
    #[must_use]
    pub const fn settings(&self) -> UploadSettings {
        self.settings
    }

    /// Upload exactly `total` bytes from `source` to `destination`.
    ///
    /// # Errors
    ///
    /// - [`TransferError::AcquisitionFailure`] (`read_payload`) when the source
    ///   fails, ends early, or yields more than `total` bytes.
    /// - [`TransferError::UploadFailure`] when the store rejects a request.
    pub async fn upload(
        &self,
        mut source: ByteSource,
        destination: &str,
        total: u64,
        progress: &dyn ProgressSink,
    ) -> TransferResult<UploadedObject> {
        let strategy = UploadStrategy::select(total, self.settings.threshold_bytes);
        debug!(destination, total, strategy = %strategy, "upload starting");
        let commit = CommitInfo::add(destination);
        let remote = match strategy {
            UploadStrategy::Direct => {
                let bytes = read_chunk(&mut source, total).await?;
                ensure_drained(&mut source, total).await?;
                let remote = self
                    .store
                    .upload(&commit, bytes)
                    .await
                    .map_err(|err| TransferError::upload("upload", err))?;
                progress.upload(total, total);
                remote
            }
            UploadStrategy::Chunked => self.chunked(&mut source, &commit, total, progress).await?,
        };
        Ok(UploadedObject {
            path: remote.path,
            url: remote.url,
            size_bytes: total,
            strategy,
        })
    }

    async fn chunked(
        &self,
        source: &mut ByteSource,
        commit: &CommitInfo,
        total: u64,
        progress: &dyn ProgressSink,
    ) -> TransferResult<ferry_core::RemoteFile> {
        let chunk = self.settings.chunk_bytes;
        let first_len = chunk.min(total);
        let first = read_chunk(source, first_len).await?;
        let session_id = self
            .store
            .session_start(first)
            .await
            .map_err(|err| TransferError::upload("session_start", err))?;
        let mut session = UploadSession::opened(session_id, first_len, total);
        progress.upload(session.offset(), total);

        while session.remaining() > chunk {
            let bytes = read_chunk(source, chunk)
                .await
                .inspect_err(|_| abandon(&session))?;
            self.store
                .session_append(session.session_id(), session.offset(), bytes)
                .await
                .map_err(|err| {
                    abandon(&session);
                    TransferError::upload("session_append", err)
                })?;
            session.advance(chunk);
            progress.upload(session.offset(), total);
        }

        let last_len = session.remaining();
        let last = read_chunk(source, last_len)
            .await
            .inspect_err(|_| abandon(&session))?;
        ensure_drained(source, total)
            .await
            .inspect_err(|_| abandon(&session))?;
        let remote = self
            .store
            .session_finish(session.session_id(), session.offset(), last, commit)
            .await
            .map_err(|err| {
                abandon(&session);
                TransferError::upload("session_finish", err)
            })?;
        session.advance(last_len);
        progress.upload(session.offset(), total);
        Ok(remote)
    }
}

fn abandon(session: &UploadSession) {
    warn!(
        session_id = session.session_id(),
        offset = session.offset(),
        "upload session abandoned"
    );
}

async fn read_chunk(source: &mut ByteSource, len: u64) -> TransferResult<Vec<u8>> {
    let mut buffer = Vec::with_capacity(usize::try_from(len).unwrap_or(0));
    let read = (&mut *source)
        .take(len)
        .read_to_end(&mut buffer)
        .await
        .map_err(|err| TransferError::acquisition("read_payload", err))?;
    let read = u64::try_from(read).unwrap_or(u64::MAX);
    if read < len {
        return Err(TransferError::acquisition(
            "read_payload",
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("payload ended after {read} of {len} bytes in chunk"),
            ),
        ));
    }
    Ok(buffer)
}

async fn ensure_drained(source: &mut ByteSource, total: u64) -> TransferResult<()> {
    let mut probe = [0_u8; 1];
    let extra = source
        .read(&mut probe)
        .await
        .map_err(|err| TransferError::acquisition("read_payload", err))?;
    if extra > 0 {
        return Err(TransferError::acquisition(
            "read_payload",
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("payload is longer than the declared {total} bytes"),
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::NoopProgress;
    use ferry_test_support::fixtures::byte_source;
    use ferry_test_support::progress::RecordingProgress;
    use ferry_test_support::remote::{RecordingRemoteStore, RemoteCall};

    fn engine(store: &Arc<RecordingRemoteStore>, threshold: u64, chunk: u64) -> UploadEngine {
        UploadEngine::new(
            store.clone(),
            UploadSettings {
                threshold_bytes: threshold,
                chunk_bytes: chunk,
            },
        )
    }

    #[tokio::test]
    async fn small_payloads_use_one_direct_write() -> TransferResult<()> {
        let store = Arc::new(RecordingRemoteStore::new());
        let uploaded = engine(&store, 100, 10)
            .upload(byte_source(99), "/games/a.nsp", 99, &NoopProgress)
            .await?;

        assert_eq!(uploaded.strategy, UploadStrategy::Direct);
        assert_eq!(uploaded.path, "/games/a.nsp");
        assert_eq!(
            store.calls(),
            vec![RemoteCall::Upload {
                path: "/games/a.nsp".into(),
                len: 99
            }]
        );
        Ok(())
    }

    #[tokio::test]
    async fn chunk_offsets_increase_and_sum_to_total() -> TransferResult<()> {
        let store = Arc::new(RecordingRemoteStore::new());
        let progress = RecordingProgress::new();
        let uploaded = engine(&store, 100, 30)
            .upload(byte_source(100), "/games/big.xci", 100, &progress)
            .await?;

        assert_eq!(uploaded.strategy, UploadStrategy::Chunked);
        let calls = store.calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[0], RemoteCall::SessionStart { len: 30 });
        assert!(matches!(calls[1], RemoteCall::SessionAppend { offset: 30, len: 30, .. }));
        assert!(matches!(calls[2], RemoteCall::SessionAppend { offset: 60, len: 30, .. }));
        assert!(matches!(calls[3], RemoteCall::SessionFinish { offset: 90, len: 10, .. }));
        assert_eq!(store.bytes_received(), 100);
        assert_eq!(
            progress.uploads(),
            vec![(30, 100), (60, 100), (90, 100), (100, 100)]
        );
        Ok(())
    }

    #[tokio::test]
    async fn exact_multiple_finishes_with_final_chunk() -> TransferResult<()> {
        let store = Arc::new(RecordingRemoteStore::new());
        engine(&store, 10, 10)
            .upload(byte_source(20), "/games/even.nsp", 20, &NoopProgress)
            .await?;

        let calls = store.calls();
        assert_eq!(calls[0], RemoteCall::SessionStart { len: 10 });
        assert!(matches!(calls[1], RemoteCall::SessionFinish { offset: 10, len: 10, .. }));
        assert_eq!(calls.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn short_source_is_an_acquisition_failure() {
        let store = Arc::new(RecordingRemoteStore::new());
        let err = engine(&store, 100, 30)
            .upload(byte_source(50), "/games/short.xci", 120, &NoopProgress)
            .await
            .expect_err("short source must fail");
        assert!(matches!(
            err,
            TransferError::AcquisitionFailure {
                operation: "read_payload",
                ..
            }
        ));
        assert!(
            !store
                .calls()
                .iter()
                .any(|call| matches!(call, RemoteCall::SessionFinish { .. }))
        );
    }

    #[tokio::test]
    async fn long_source_is_rejected_before_commit() {
        let store = Arc::new(RecordingRemoteStore::new());
        let err = engine(&store, 100, 30)
            .upload(byte_source(11), "/games/long.nsp", 10, &NoopProgress)
            .await
            .expect_err("long source must fail");
        assert!(matches!(err, TransferError::AcquisitionFailure { .. }));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn append_failure_aborts_with_upload_failure() {
        let store = Arc::new(RecordingRemoteStore::new());
        store.fail_step("session_append");
        let err = engine(&store, 10, 10)
            .upload(byte_source(30), "/games/fail.nsp", 30, &NoopProgress)
            .await
            .expect_err("append failure");
        assert!(matches!(
            err,
            TransferError::UploadFailure {
                step: "session_append",
                ..
            }
        ));
    }
}
