//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes the counters and gauges the transfer pipeline reports.

use std::sync::Arc;

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared across the pipeline.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    jobs_total: IntCounterVec,
    events_emitted_total: IntCounterVec,
    uploads_total: IntCounterVec,
    active_jobs: IntGauge,
    queue_depth: IntGauge,
    bytes_uploaded_total: IntCounter,
    metadata_index_keys: IntGauge,
}

/// Snapshot of selected gauges and counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Jobs currently holding a non-terminal phase outside the queue.
    pub active_jobs: i64,
    /// Jobs waiting for the acquisition slot.
    pub queue_depth: i64,
    /// Bytes committed to the remote store since start.
    pub bytes_uploaded_total: u64,
    /// Keys in the most recent fuzzy metadata index.
    pub metadata_index_keys: i64,
}

fn counter_vec(name: &'static str, help: &str, labels: &[&str]) -> Result<IntCounterVec> {
    IntCounterVec::new(Opts::new(name, help), labels)
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn gauge(name: &'static str, help: &str) -> Result<IntGauge> {
    IntGauge::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> Result<()>
where
    C: prometheus::core::Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be built or
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let jobs_total = counter_vec(
            "jobs_total",
            "Transfer jobs that reached a terminal phase, by outcome",
            &["outcome"],
        )?;
        let events_emitted_total = counter_vec(
            "events_emitted_total",
            "Domain events emitted by type",
            &["type"],
        )?;
        let uploads_total = counter_vec(
            "uploads_total",
            "Committed uploads by strategy",
            &["strategy"],
        )?;
        let active_jobs = gauge("active_jobs", "Jobs in a live phase outside the queue")?;
        let queue_depth = gauge("queue_depth", "Jobs waiting for the acquisition slot")?;
        let bytes_uploaded_total = IntCounter::with_opts(Opts::new(
            "bytes_uploaded_total",
            "Bytes committed to the remote store",
        ))
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "bytes_uploaded_total",
            source,
        })?;
        let metadata_index_keys = gauge(
            "metadata_index_keys",
            "Lookup keys in the current fuzzy metadata index",
        )?;

        register(&registry, "jobs_total", &jobs_total)?;
        register(&registry, "events_emitted_total", &events_emitted_total)?;
        register(&registry, "uploads_total", &uploads_total)?;
        register(&registry, "active_jobs", &active_jobs)?;
        register(&registry, "queue_depth", &queue_depth)?;
        register(&registry, "bytes_uploaded_total", &bytes_uploaded_total)?;
        register(&registry, "metadata_index_keys", &metadata_index_keys)?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                jobs_total,
                events_emitted_total,
                uploads_total,
                active_jobs,
                queue_depth,
                bytes_uploaded_total,
                metadata_index_keys,
            }),
        })
    }

    /// Count a job reaching a terminal phase (`done`, `error`, `cancelled`).
    pub fn inc_job_outcome(&self, outcome: &str) {
        self.inner.jobs_total.with_label_values(&[outcome]).inc();
    }

    /// Increment the emitted event counter for the specific event type.
    pub fn inc_event(&self, event_type: &str) {
        self.inner
            .events_emitted_total
            .with_label_values(&[event_type])
            .inc();
    }

    /// Count a committed upload by strategy (`direct`, `chunked`).
    pub fn inc_upload(&self, strategy: &str) {
        self.inner
            .uploads_total
            .with_label_values(&[strategy])
            .inc();
    }

    /// Set the active job gauge.
    pub fn set_active_jobs(&self, count: i64) {
        self.inner.active_jobs.set(count);
    }

    /// Set the queue depth gauge.
    pub fn set_queue_depth(&self, depth: i64) {
        self.inner.queue_depth.set(depth);
    }

    /// Add committed bytes to the upload counter.
    pub fn add_bytes_uploaded(&self, bytes: u64) {
        self.inner.bytes_uploaded_total.inc_by(bytes);
    }

    /// Record the key count of a freshly built metadata index.
    pub fn set_metadata_index_keys(&self, keys: usize) {
        self.inner
            .metadata_index_keys
            .set(i64::try_from(keys).unwrap_or(i64::MAX));
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of the most relevant gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            active_jobs: self.inner.active_jobs.get(),
            queue_depth: self.inner.queue_depth.get(),
            bytes_uploaded_total: self.inner.bytes_uploaded_total.get(),
            metadata_index_keys: self.inner.metadata_index_keys.get(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_updates() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.set_active_jobs(2);
        metrics.set_queue_depth(3);
        metrics.add_bytes_uploaded(1_024);
        metrics.add_bytes_uploaded(1);
        metrics.set_metadata_index_keys(42);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.active_jobs, 2);
        assert_eq!(snapshot.queue_depth, 3);
        assert_eq!(snapshot.bytes_uploaded_total, 1_025);
        assert_eq!(snapshot.metadata_index_keys, 42);
        Ok(())
    }

    #[test]
    fn render_includes_labelled_counters() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_job_outcome("done");
        metrics.inc_event("phase_changed");
        metrics.inc_upload("chunked");

        let rendered = metrics.render()?;
        assert!(rendered.contains("jobs_total{outcome=\"done\"} 1"));
        assert!(rendered.contains("events_emitted_total{type=\"phase_changed\"} 1"));
        assert!(rendered.contains("uploads_total{strategy=\"chunked\"} 1"));
        Ok(())
    }

    #[test]
    fn snapshot_serializes_to_json() -> Result<()> {
        let metrics = Metrics::new()?;
        let value = serde_json::to_value(metrics.snapshot()).map_err(|_| {
            TelemetryError::MetricsEncode {
                source: prometheus::Error::Msg("serialize".into()),
            }
        })?;
        assert_eq!(value["queue_depth"], 0);
        Ok(())
    }
}
