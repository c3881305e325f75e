//! Error types for the transfer pipeline.
//!
//! # Design
//! - Keep variant messages short; context lives in fields.
//! - Preserve collaborator failures as boxed sources.
//! - `describe` renders the full chain for the job record.

use std::error::Error;

use ferry_events::JobPhase;
use thiserror::Error;
use uuid::Uuid;

/// Boxed error used to carry collaborator failures.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Primary error type for transfer operations.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Descriptor was empty or malformed; no job is created.
    #[error("invalid descriptor ({reason})")]
    InvalidDescriptor {
        /// Machine-readable reason for the rejection.
        reason: &'static str,
    },
    /// Selected payload failed the extension allow-list.
    #[error("unsupported payload {file_name}")]
    UnsupportedPayload {
        /// Name of the rejected file.
        file_name: String,
    },
    /// The payload already exists in the catalog.
    #[error("payload already cataloged as {existing_path} ({kind} match)")]
    DuplicatePayload {
        /// Name of the payload that was rejected.
        file_name: String,
        /// Storage path of the existing catalog record.
        existing_path: String,
        /// Which guard rule matched.
        kind: &'static str,
    },
    /// No peers were found before the watchdog fired.
    #[error("no peers found within {waited_secs}s")]
    AcquisitionTimeout {
        /// Watchdog window in seconds.
        waited_secs: u64,
    },
    /// Swarm or network failure while acquiring the payload.
    #[error("acquisition failed during {operation}")]
    AcquisitionFailure {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying failure.
        #[source]
        source: BoxError,
    },
    /// Remote store rejected a call.
    #[error("upload failed during {step}")]
    UploadFailure {
        /// Remote store step (`upload`, `session_start`, `session_append`,
        /// `session_finish`, `list_folder`).
        step: &'static str,
        /// Underlying failure.
        #[source]
        source: BoxError,
    },
    /// Catalog store could not be reached.
    #[error("catalog unavailable during {operation}")]
    CatalogUnavailable {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying failure.
        #[source]
        source: BoxError,
    },
    /// Job identifier is unknown.
    #[error("job {job_id} not found")]
    JobNotFound {
        /// Missing job identifier.
        job_id: Uuid,
    },
    /// Job already reached a terminal phase.
    #[error("job {job_id} already {phase}")]
    JobFinished {
        /// Job identifier.
        job_id: Uuid,
        /// Terminal phase the job is in.
        phase: JobPhase,
    },
}

impl TransferError {
    /// Wrap a swarm failure.
    pub fn acquisition(operation: &'static str, source: impl Into<BoxError>) -> Self {
        Self::AcquisitionFailure {
            operation,
            source: source.into(),
        }
    }

    /// Wrap a remote store failure.
    pub fn upload(step: &'static str, source: impl Into<BoxError>) -> Self {
        Self::UploadFailure {
            step,
            source: source.into(),
        }
    }

    /// Wrap a catalog store failure.
    pub fn catalog(operation: &'static str, source: impl Into<BoxError>) -> Self {
        Self::CatalogUnavailable {
            operation,
            source: source.into(),
        }
    }

    /// Render the error and its source chain as one human-readable line.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut message = self.to_string();
        let mut current = self.source();
        while let Some(cause) = current {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            current = cause.source();
        }
        message
    }
}

/// Convenience alias for transfer results.
pub type TransferResult<T> = Result<T, TransferError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn describe_includes_source_chain() {
        let err = TransferError::upload("session_append", io::Error::other("connection reset"));
        assert_eq!(
            err.describe(),
            "upload failed during session_append: connection reset"
        );
    }

    #[test]
    fn anyhow_errors_convert_into_sources() {
        let err = TransferError::acquisition("add", anyhow::anyhow!("tracker unreachable"));
        assert!(matches!(
            err,
            TransferError::AcquisitionFailure {
                operation: "add",
                ..
            }
        ));
        assert!(err.describe().ends_with("tracker unreachable"));
    }

    #[test]
    fn timeout_message_names_window() {
        let err = TransferError::AcquisitionTimeout { waited_secs: 120 };
        assert_eq!(err.describe(), "no peers found within 120s");
    }
}
