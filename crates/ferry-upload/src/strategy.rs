//! Strategy selection and session bookkeeping.

use std::fmt::{self, Display, Formatter};

use serde::Serialize;

/// Payloads strictly smaller than this are written in one request.
pub const DEFAULT_THRESHOLD_BYTES: u64 = 150 * 1024 * 1024;
/// Chunk size for session uploads.
pub const DEFAULT_CHUNK_BYTES: u64 = 8 * 1024 * 1024;

/// How a payload is written to the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStrategy {
    /// Whole payload buffered and written atomically.
    Direct,
    /// Start/append/finish session, one chunk in flight.
    Chunked,
}

impl UploadStrategy {
    /// `size < threshold` writes directly; everything else uses a session.
    #[must_use]
    pub const fn select(size_bytes: u64, threshold_bytes: u64) -> Self {
        if size_bytes < threshold_bytes {
            Self::Direct
        } else {
            Self::Chunked
        }
    }

    /// Stable label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Chunked => "chunked",
        }
    }
}

impl Display for UploadStrategy {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Size tuning for the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadSettings {
    /// Direct/chunked boundary.
    pub threshold_bytes: u64,
    /// Session chunk size; values below one byte are raised to one.
    pub chunk_bytes: u64,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            threshold_bytes: DEFAULT_THRESHOLD_BYTES,
            chunk_bytes: DEFAULT_CHUNK_BYTES,
        }
    }
}

/// Live state of one chunked upload. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSession {
    session_id: String,
    offset: u64,
    total: u64,
}

impl UploadSession {
    /// Session opened with `first_chunk` bytes already sent.
    #[must_use]
    pub const fn opened(session_id: String, first_chunk: u64, total: u64) -> Self {
        Self {
            session_id,
            offset: first_chunk,
            total,
        }
    }

    /// Remote session handle.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Bytes committed so far.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Bytes still to send.
    #[must_use]
    pub const fn remaining(&self) -> u64 {
        self.total.saturating_sub(self.offset)
    }

    /// Record `bytes` more as sent.
    pub const fn advance(&mut self, bytes: u64) {
        self.offset += bytes;
    }
}

/// Object committed by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedObject {
    /// Final remote path (after any autorename).
    pub path: String,
    /// Public URL.
    pub url: String,
    /// Bytes written.
    pub size_bytes: u64,
    /// Strategy used.
    pub strategy: UploadStrategy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_boundary_selects_chunked() {
        let threshold = DEFAULT_THRESHOLD_BYTES;
        assert_eq!(UploadStrategy::select(threshold - 1, threshold), UploadStrategy::Direct);
        assert_eq!(UploadStrategy::select(threshold, threshold), UploadStrategy::Chunked);
        assert_eq!(UploadStrategy::select(threshold + 1, threshold), UploadStrategy::Chunked);
        assert_eq!(UploadStrategy::select(0, threshold), UploadStrategy::Direct);
    }

    #[test]
    fn session_tracks_remaining_bytes() {
        let mut session = UploadSession::opened("s-1".into(), 8, 20);
        assert_eq!(session.remaining(), 12);
        session.advance(8);
        assert_eq!(session.offset(), 16);
        assert_eq!(session.remaining(), 4);
        assert_eq!(session.session_id(), "s-1");
    }
}
