//! Core transfer domain types and DTOs shared across the workspace.

use chrono::{DateTime, Utc};
use ferry_events::{JobPhase, SourceKind};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::error::{TransferError, TransferResult};

/// Upper bound on raw `.torrent` payloads accepted at submission.
pub const MAX_TORRENT_FILE_BYTES: usize = 10 * 1024 * 1024;

const MAGNET_PREFIX: &str = "magnet:?";

/// Opaque input identifying a swarm payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransferDescriptor {
    /// Magnet URI that should be resolved by the swarm.
    Magnet {
        /// Magnet URI text.
        uri: String,
    },
    /// Raw `.torrent` metainfo bytes.
    TorrentFile {
        /// Bencoded metainfo payload.
        bytes: Vec<u8>,
    },
}

impl TransferDescriptor {
    #[must_use]
    /// Convenience constructor for magnet-based descriptors.
    pub fn magnet(uri: impl Into<String>) -> Self {
        Self::Magnet { uri: uri.into() }
    }

    #[must_use]
    /// Convenience constructor for metainfo-based descriptors.
    pub fn torrent_file(bytes: impl Into<Vec<u8>>) -> Self {
        Self::TorrentFile {
            bytes: bytes.into(),
        }
    }

    /// How the descriptor was supplied.
    #[must_use]
    pub const fn kind(&self) -> SourceKind {
        match self {
            Self::Magnet { .. } => SourceKind::Magnet,
            Self::TorrentFile { .. } => SourceKind::TorrentFile,
        }
    }

    /// Reject empty or malformed descriptors before any job record exists.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::InvalidDescriptor`] naming the failed check.
    pub fn validate(&self) -> TransferResult<()> {
        let reason = match self {
            Self::Magnet { uri } => {
                let trimmed = uri.trim();
                if trimmed.is_empty() {
                    Some("empty")
                } else if !trimmed
                    .get(..MAGNET_PREFIX.len())
                    .is_some_and(|prefix| prefix.eq_ignore_ascii_case(MAGNET_PREFIX))
                {
                    Some("not_magnet_uri")
                } else if !trimmed.contains("xt=") {
                    Some("missing_exact_topic")
                } else {
                    None
                }
            }
            Self::TorrentFile { bytes } => {
                if bytes.is_empty() {
                    Some("empty")
                } else if bytes.len() > MAX_TORRENT_FILE_BYTES {
                    Some("too_large")
                } else if bytes.first() != Some(&b'd') {
                    Some("not_bencoded")
                } else {
                    None
                }
            }
        };
        reason.map_or(Ok(()), |reason| {
            Err(TransferError::InvalidDescriptor { reason })
        })
    }

    /// Best-effort display name available before metadata resolves.
    #[must_use]
    pub fn display_name(&self) -> String {
        match self {
            Self::Magnet { uri } => magnet_name(uri.trim()),
            Self::TorrentFile { bytes } => {
                metainfo_name(bytes).unwrap_or_else(|| "torrent file".to_string())
            }
        }
    }
}

fn magnet_name(uri: &str) -> String {
    let Ok(parsed) = Url::parse(uri) else {
        return "magnet link".to_string();
    };
    let mut hash = None;
    for (key, value) in parsed.query_pairs() {
        match key.as_ref() {
            "dn" if !value.trim().is_empty() => return value.trim().to_string(),
            "xt" => {
                hash = value
                    .rsplit(':')
                    .next()
                    .map(|digest| digest.chars().take(12).collect::<String>());
            }
            _ => {}
        }
    }
    hash.filter(|digest| !digest.is_empty())
        .map_or_else(|| "magnet link".to_string(), |digest| format!("magnet:{digest}"))
}

/// Pull the `info.name` string out of bencoded metainfo without a full decode.
fn metainfo_name(bytes: &[u8]) -> Option<String> {
    const KEY: &[u8] = b"4:name";
    let start = bytes.windows(KEY.len()).position(|window| window == KEY)? + KEY.len();
    let rest = bytes.get(start..)?;
    let colon = rest.iter().position(|byte| *byte == b':')?;
    let length: usize = std::str::from_utf8(rest.get(..colon)?).ok()?.parse().ok()?;
    let value = rest.get(colon + 1..colon + 1 + length)?;
    let name = String::from_utf8_lossy(value).trim().to_string();
    (!name.is_empty()).then_some(name)
}

/// Point-in-time progress figures for a transfer job.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TransferProgress {
    /// Swarm completion percentage (0-100).
    pub download_percent: f64,
    /// Remote commit percentage (0-100).
    pub upload_percent: f64,
    /// Current download rate in bytes per second.
    pub download_bps: u64,
    /// Connected peer count.
    pub peers: u32,
    /// Estimated seconds until the download completes.
    pub eta_seconds: Option<u64>,
    /// Bytes committed to the remote store so far.
    pub bytes_uploaded: u64,
}

/// Observable record of one descriptor's journey through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransferJob {
    /// Unique job identifier.
    pub id: Uuid,
    /// Display name; replaced by the swarm name once metadata resolves.
    pub name: String,
    /// How the descriptor was supplied.
    pub source: SourceKind,
    /// Current lifecycle phase.
    pub phase: JobPhase,
    /// Latest progress figures.
    pub progress: TransferProgress,
    /// Failure cause, set only in the `error` phase.
    pub error: Option<String>,
    /// One-based queue position while queued.
    pub queue_position: Option<usize>,
    /// Name of the selected payload file.
    pub file_name: Option<String>,
    /// Size of the selected payload file in bytes.
    pub size_bytes: Option<u64>,
    /// Storage path of the committed object.
    pub remote_path: Option<String>,
    /// Public URL of the committed object.
    pub url: Option<String>,
    /// When the job was submitted.
    pub created_at: DateTime<Utc>,
    /// Last time any field changed.
    pub updated_at: DateTime<Utc>,
    /// When the job reached a terminal phase.
    pub finished_at: Option<DateTime<Utc>>,
}

impl TransferJob {
    /// Create a fresh job record in the given starting phase.
    #[must_use]
    pub fn new(id: Uuid, name: String, source: SourceKind, phase: JobPhase) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            source,
            phase,
            progress: TransferProgress::default(),
            error: None,
            queue_position: None,
            file_name: None,
            size_bytes: None,
            remote_path: None,
            url: None,
            created_at: now,
            updated_at: now,
            finished_at: None,
        }
    }

    /// Move the job into `next` when the transition is legal.
    ///
    /// Returns `false` and leaves the record untouched otherwise; terminal
    /// records are never modified.
    pub fn advance(&mut self, next: JobPhase) -> bool {
        if !self.phase.can_transition_to(next) {
            return false;
        }
        self.phase = next;
        self.updated_at = Utc::now();
        if next != JobPhase::Queued {
            self.queue_position = None;
        }
        if next.is_terminal() {
            self.finished_at = Some(self.updated_at);
        }
        true
    }
}

/// Snapshot returned by job listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct JobListing {
    /// Non-terminal jobs that are not waiting in the queue.
    pub active: Vec<TransferJob>,
    /// Queued jobs in FIFO order.
    pub queued: Vec<TransferJob>,
    /// Terminal jobs, most recent first.
    pub history: Vec<TransferJob>,
}

/// Progress telemetry for the job holding the acquisition slot.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DownloadTelemetry {
    /// Completion percentage (0-100).
    pub percent: f64,
    /// Current download rate in bytes per second.
    pub download_bps: u64,
    /// Connected peer count.
    pub peers: u32,
    /// Estimated seconds until completion; `None` when stalled.
    pub eta_seconds: Option<u64>,
}

/// A file inside a swarm resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwarmFile {
    /// File name as listed in the metadata.
    pub name: String,
    /// File length in bytes.
    pub length: u64,
}

/// Live statistics reported by a swarm resource.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SwarmStats {
    /// Completion ratio in `[0, 1]`.
    pub progress: f64,
    /// Current download rate in bytes per second.
    pub download_bps: u64,
    /// Connected peer count.
    pub peers: u32,
    /// Bytes verified so far.
    pub downloaded: u64,
}

/// Commit parameters for a remote write. Writes always add, never overwrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    /// Destination path within the remote store.
    pub path: String,
    /// Let the store pick a free name when the path is taken.
    pub autorename: bool,
    /// Suppress client notifications on the store side.
    pub mute: bool,
}

impl CommitInfo {
    /// Add-mode commit with autorename and mute enabled.
    #[must_use]
    pub fn add(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            autorename: true,
            mute: true,
        }
    }
}

/// Object committed to or listed from the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    /// Final storage path (may differ from the requested path after autorename).
    pub path: String,
    /// File name component of the path.
    pub name: String,
    /// Object size in bytes.
    pub size_bytes: u64,
    /// Public URL for the object.
    pub url: String,
}

/// Catalog record describing one stored payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Storage path; unique key of the record.
    pub path: String,
    /// Human-readable title.
    pub name: String,
    /// File name of the payload.
    pub file_name: String,
    /// Payload size in bytes.
    pub size_bytes: u64,
    /// Public URL of the payload.
    pub url: String,
    /// 16-hex-digit title identifier when known.
    pub title_id: Option<String>,
    /// Release version when known.
    pub version: Option<u64>,
    /// When the record was last written.
    pub indexed_at: Option<DateTime<Utc>>,
}

/// Query shapes supported by catalog stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogFilter {
    /// Exact storage path.
    Path(String),
    /// Exact file name.
    FileName(String),
    /// File name compared without regard to ASCII case.
    FileNameIgnoreCase(String),
    /// Same title identifier and version (both compared exactly, absent == absent).
    Release {
        /// Title identifier to match.
        title_id: String,
        /// Version to match.
        version: Option<u64>,
    },
}

impl CatalogFilter {
    /// Whether `entry` satisfies this filter.
    #[must_use]
    pub fn matches(&self, entry: &CatalogEntry) -> bool {
        match self {
            Self::Path(path) => entry.path == *path,
            Self::FileName(name) => entry.file_name == *name,
            Self::FileNameIgnoreCase(name) => {
                entry.file_name.to_lowercase() == name.to_lowercase()
            }
            Self::Release { title_id, version } => {
                entry.title_id.as_deref() == Some(title_id.as_str()) && entry.version == *version
            }
        }
    }
}
