//! Progress sink that keeps every notification.

use std::sync::{Mutex, MutexGuard, PoisonError};

use ferry_core::{DownloadTelemetry, ProgressSink};

#[derive(Default)]
struct Seen {
    downloads: Vec<DownloadTelemetry>,
    uploads: Vec<(u64, u64)>,
}

/// [`ProgressSink`] recording downloads and uploads in arrival order.
#[derive(Default)]
pub struct RecordingProgress {
    seen: Mutex<Seen>,
}

impl RecordingProgress {
    /// Empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Download telemetry received so far.
    #[must_use]
    pub fn downloads(&self) -> Vec<DownloadTelemetry> {
        self.lock().downloads.clone()
    }

    /// `(bytes_uploaded, bytes_total)` pairs received so far.
    #[must_use]
    pub fn uploads(&self) -> Vec<(u64, u64)> {
        self.lock().uploads.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Seen> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ProgressSink for RecordingProgress {
    fn download(&self, telemetry: DownloadTelemetry) {
        self.lock().downloads.push(telemetry);
    }

    fn upload(&self, bytes_uploaded: u64, bytes_total: u64) {
        self.lock().uploads.push((bytes_uploaded, bytes_total));
    }
}
