//! Bridges pipeline telemetry into job records, events and metrics.

use std::sync::Arc;

use ferry_core::{DownloadTelemetry, JobPhase, ProgressSink};
use ferry_events::Event;
use uuid::Uuid;

use crate::orchestrator::TransferOrchestrator;

/// Progress sink bound to one job.
pub(crate) struct JobProgress {
    orchestrator: Arc<TransferOrchestrator>,
    job_id: Uuid,
}

impl JobProgress {
    pub(crate) const fn new(orchestrator: Arc<TransferOrchestrator>, job_id: Uuid) -> Self {
        Self {
            orchestrator,
            job_id,
        }
    }
}

impl ProgressSink for JobProgress {
    fn download(&self, telemetry: DownloadTelemetry) {
        let updated = self.orchestrator.update_job(self.job_id, |job| {
            job.progress.download_percent = telemetry.percent;
            job.progress.download_bps = telemetry.download_bps;
            job.progress.peers = telemetry.peers;
            job.progress.eta_seconds = telemetry.eta_seconds;
        });
        if !updated {
            return;
        }
        self.orchestrator.emit(Event::DownloadProgress {
            job_id: self.job_id,
            percent: telemetry.percent,
            download_bps: telemetry.download_bps,
            peers: telemetry.peers,
        });
        if telemetry.percent >= 100.0 && self.orchestrator.advance(self.job_id, JobPhase::Uploading)
        {
            self.orchestrator.release(self.job_id);
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn upload(&self, bytes_uploaded: u64, bytes_total: u64) {
        let percent = if bytes_total == 0 {
            100.0
        } else {
            (bytes_uploaded as f64 / bytes_total as f64 * 100.0).min(100.0)
        };
        let updated = self.orchestrator.update_job(self.job_id, |job| {
            job.progress.bytes_uploaded = bytes_uploaded;
            job.progress.upload_percent = percent;
        });
        if updated {
            self.orchestrator.emit(Event::UploadProgress {
                job_id: self.job_id,
                bytes_uploaded,
                bytes_total,
            });
        }
    }
}
