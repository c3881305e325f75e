//! Periodic download telemetry.

use std::sync::Arc;
use std::time::Duration;

use ferry_core::{DownloadTelemetry, ProgressSink, SwarmHandle, SwarmStats};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Derive sink telemetry from raw swarm stats for a payload of `payload_len` bytes.
///
/// ETA is `remaining / rate`, rounded up, and absent while the rate is zero.
#[must_use]
pub fn telemetry_for(stats: SwarmStats, payload_len: u64) -> DownloadTelemetry {
    let percent = if stats.progress.is_finite() {
        (stats.progress * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    };
    let remaining = payload_len.saturating_sub(stats.downloaded);
    let eta_seconds = (stats.download_bps > 0).then(|| remaining.div_ceil(stats.download_bps));
    DownloadTelemetry {
        percent,
        download_bps: stats.download_bps,
        peers: stats.peers,
        eta_seconds,
    }
}

/// Background task sampling swarm stats into a sink; aborted on drop.
#[derive(Debug)]
pub struct ProgressPump {
    task: JoinHandle<()>,
}

impl ProgressPump {
    /// Sample `handle` every `interval` until the download completes.
    ///
    /// The first sample is taken immediately. The last sample sent is the one
    /// reporting 100 percent.
    #[must_use]
    pub fn spawn(
        handle: Arc<dyn SwarmHandle>,
        payload_len: u64,
        interval: Duration,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        let period = interval.max(Duration::from_millis(1));
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let telemetry = telemetry_for(handle.stats(), payload_len);
                sink.download(telemetry);
                if telemetry.percent >= 100.0 {
                    break;
                }
            }
        });
        Self { task }
    }

    /// Whether the pump has stopped on its own.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop sampling.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for ProgressPump {
    fn drop(&mut self) {
        self.task.abort();
    }
}
