//! Event payload types carried across the pipeline.

use std::fmt::{self, Display, Formatter};

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Identifier assigned to each event emitted by the pipeline.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
pub const DEFAULT_REPLAY_CAPACITY: usize = 1_024;

/// How a transfer descriptor was supplied.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Magnet URI.
    Magnet,
    /// Raw `.torrent` metainfo bytes.
    TorrentFile,
}

impl SourceKind {
    /// Stable label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Magnet => "magnet",
            Self::TorrentFile => "torrent-file",
        }
    }
}

impl Display for SourceKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Lifecycle phase of a transfer job.
///
/// Phases only move forward (`queued → connecting → downloading → uploading →
/// done`); `error` and `cancelled` can be reached from any non-terminal phase.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    /// Waiting in the FIFO queue for the acquisition slot.
    Queued,
    /// Descriptor submitted to the swarm; waiting for metadata and peers.
    Connecting,
    /// Payload bytes are arriving from the swarm.
    Downloading,
    /// Acquisition finished; remaining bytes are being committed remotely.
    Uploading,
    /// Upload committed successfully.
    Done,
    /// Job failed; the cause is recorded on the job.
    Error,
    /// Job was cancelled by a caller.
    Cancelled,
}

impl JobPhase {
    /// Whether the phase is terminal.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error | Self::Cancelled)
    }

    /// Whether the phase occupies the shared acquisition slot.
    #[must_use]
    pub const fn is_acquiring(self) -> bool {
        matches!(self, Self::Connecting | Self::Downloading)
    }

    const fn rank(self) -> u8 {
        match self {
            Self::Queued => 0,
            Self::Connecting => 1,
            Self::Downloading => 2,
            Self::Uploading => 3,
            Self::Done => 4,
            Self::Error | Self::Cancelled => 5,
        }
    }

    /// Whether moving from `self` to `next` is a legal transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            Self::Error | Self::Cancelled => true,
            _ => next.rank() > self.rank(),
        }
    }

    /// Stable label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Connecting => "connecting",
            Self::Downloading => "downloading",
            Self::Uploading => "uploading",
            Self::Done => "done",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        }
    }
}

impl Display for JobPhase {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Typed domain events surfaced across the pipeline.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A descriptor was accepted and a job record created.
    JobSubmitted {
        /// Identifier of the new job.
        job_id: Uuid,
        /// Display name derived from the descriptor.
        name: String,
        /// How the descriptor was supplied.
        source: SourceKind,
    },
    /// A job was placed behind the active acquisition.
    JobQueued {
        /// Identifier of the queued job.
        job_id: Uuid,
        /// One-based queue position.
        position: usize,
    },
    /// A job moved into a new lifecycle phase.
    PhaseChanged {
        /// Identifier of the job.
        job_id: Uuid,
        /// Phase that was entered.
        phase: JobPhase,
    },
    /// Periodic swarm progress for the job holding the acquisition slot.
    DownloadProgress {
        /// Identifier of the job.
        job_id: Uuid,
        /// Completion percentage (0-100).
        percent: f64,
        /// Current download rate in bytes per second.
        download_bps: u64,
        /// Connected peer count.
        peers: u32,
    },
    /// Bytes acknowledged by the remote store so far.
    UploadProgress {
        /// Identifier of the job.
        job_id: Uuid,
        /// Cumulative bytes committed.
        bytes_uploaded: u64,
        /// Total payload size.
        bytes_total: u64,
    },
    /// Upload committed and the job finished.
    JobCompleted {
        /// Identifier of the job.
        job_id: Uuid,
        /// Remote URL of the committed object.
        url: String,
    },
    /// Job ended in the error phase.
    JobFailed {
        /// Identifier of the job.
        job_id: Uuid,
        /// Human-readable failure cause.
        message: String,
    },
    /// Job was cancelled.
    JobCancelled {
        /// Identifier of the job.
        job_id: Uuid,
    },
    /// A catalog record was created or replaced.
    CatalogIndexed {
        /// Storage path of the record.
        path: String,
    },
    /// The fuzzy metadata index was rebuilt.
    MetadataIndexRebuilt {
        /// Number of lookup keys in the new index.
        keys: usize,
        /// Number of sources that contributed records.
        sources: usize,
    },
}

impl Event {
    /// Machine-friendly discriminator for consumers and metrics labels.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::JobSubmitted { .. } => "job_submitted",
            Self::JobQueued { .. } => "job_queued",
            Self::PhaseChanged { .. } => "phase_changed",
            Self::DownloadProgress { .. } => "download_progress",
            Self::UploadProgress { .. } => "upload_progress",
            Self::JobCompleted { .. } => "job_completed",
            Self::JobFailed { .. } => "job_failed",
            Self::JobCancelled { .. } => "job_cancelled",
            Self::CatalogIndexed { .. } => "catalog_indexed",
            Self::MetadataIndexRebuilt { .. } => "metadata_index_rebuilt",
        }
    }

    /// Job identifier carried by the event, if any.
    #[must_use]
    pub const fn job_id(&self) -> Option<Uuid> {
        match self {
            Self::JobSubmitted { job_id, .. }
            | Self::JobQueued { job_id, .. }
            | Self::PhaseChanged { job_id, .. }
            | Self::DownloadProgress { job_id, .. }
            | Self::UploadProgress { job_id, .. }
            | Self::JobCompleted { job_id, .. }
            | Self::JobFailed { job_id, .. }
            | Self::JobCancelled { job_id } => Some(*job_id),
            Self::CatalogIndexed { .. } | Self::MetadataIndexRebuilt { .. } => None,
        }
    }
}

/// Metadata wrapper around events. Each envelope tracks the event id and emission timestamp.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct EventEnvelope {
    /// Monotonic identifier assigned to the wrapped event.
    pub id: EventId,
    /// Timestamp recording when the envelope was produced.
    pub timestamp: DateTime<Utc>,
    /// Wrapped event payload.
    pub event: Event,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_PHASES: [JobPhase; 7] = [
        JobPhase::Queued,
        JobPhase::Connecting,
        JobPhase::Downloading,
        JobPhase::Uploading,
        JobPhase::Done,
        JobPhase::Error,
        JobPhase::Cancelled,
    ];

    #[test]
    fn terminal_phases_never_transition() {
        for from in [JobPhase::Done, JobPhase::Error, JobPhase::Cancelled] {
            for to in ALL_PHASES {
                assert!(!from.can_transition_to(to), "{from} -> {to} must be rejected");
            }
        }
    }

    #[test]
    fn forward_transitions_are_monotonic() {
        assert!(JobPhase::Queued.can_transition_to(JobPhase::Connecting));
        assert!(JobPhase::Connecting.can_transition_to(JobPhase::Downloading));
        assert!(JobPhase::Downloading.can_transition_to(JobPhase::Uploading));
        assert!(JobPhase::Uploading.can_transition_to(JobPhase::Done));
        assert!(!JobPhase::Uploading.can_transition_to(JobPhase::Downloading));
        assert!(!JobPhase::Downloading.can_transition_to(JobPhase::Connecting));
        assert!(!JobPhase::Connecting.can_transition_to(JobPhase::Connecting));
    }

    #[test]
    fn escapes_reachable_from_every_live_phase() {
        for from in ALL_PHASES.into_iter().filter(|phase| !phase.is_terminal()) {
            assert!(from.can_transition_to(JobPhase::Error));
            assert!(from.can_transition_to(JobPhase::Cancelled));
        }
    }

    #[test]
    fn event_kind_and_job_id() {
        let id = Uuid::now_v7();
        let event = Event::JobQueued {
            job_id: id,
            position: 2,
        };
        assert_eq!(event.kind(), "job_queued");
        assert_eq!(event.job_id(), Some(id));

        let rebuilt = Event::MetadataIndexRebuilt {
            keys: 10,
            sources: 2,
        };
        assert_eq!(rebuilt.kind(), "metadata_index_rebuilt");
        assert_eq!(rebuilt.job_id(), None);
    }

    #[test]
    fn labels_serialize_in_kebab_and_snake_case() {
        assert_eq!(SourceKind::TorrentFile.to_string(), "torrent-file");
        assert_eq!(JobPhase::Uploading.to_string(), "uploading");
    }
}
