//! Transfer orchestrator: one task per job, one shared acquisition slot.
//!
//! # Design
//! - The job store is the single owner of job records; callers get snapshots.
//! - A job only touches the swarm while it holds the slot ticket.
//! - The slot is released as soon as the download completes so the next job
//!   can start acquiring while this one finishes uploading.
//! - Terminal jobs stay visible for the retention window, then move to history.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use ferry_catalog::{CatalogIndexer, DedupGuard};
use ferry_config::FerryConfig;
use ferry_core::{
    CatalogEntry, JobListing, JobPhase, TransferDescriptor, TransferError, TransferJob,
    TransferResult,
};
use ferry_events::{Event, EventBus};
use ferry_metadata::{FilenameParser, SharedIndex};
use ferry_swarm::{AcquiredPayload, AcquisitionAdapter};
use ferry_telemetry::{Metrics, job_span};
use ferry_upload::{UploadEngine, UploadedObject};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, warn};
use uuid::Uuid;

use crate::jobs::{Admission, JobStore, SlotGrant};
use crate::progress::JobProgress;

/// Lifecycle tuning for [`TransferOrchestrator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorSettings {
    /// Peer-discovery watchdog window.
    pub peer_timeout: Duration,
    /// How long terminal jobs stay in the active set.
    pub retention: Duration,
    /// Maximum number of jobs kept in history.
    pub history_limit: usize,
    /// Remote folder receiving uploads.
    pub root_folder: String,
}

impl OrchestratorSettings {
    /// Settings taken from the loaded configuration.
    #[must_use]
    pub fn from_config(config: &FerryConfig) -> Self {
        Self {
            peer_timeout: config.acquisition.peer_timeout,
            retention: config.orchestrator.retention,
            history_limit: config.orchestrator.history_limit,
            root_folder: config.store.root_folder.clone(),
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from_config(&FerryConfig::default())
    }
}

/// Collaborators driven by the orchestrator.
#[derive(Clone)]
pub struct Pipeline {
    /// Swarm acquisition.
    pub adapter: AcquisitionAdapter,
    /// Remote uploads.
    pub uploads: UploadEngine,
    /// Catalog duplicate detection.
    pub guard: DedupGuard,
    /// Catalog writes.
    pub indexer: CatalogIndexer,
    /// Filename identity extraction.
    pub parser: FilenameParser,
    /// Current fuzzy metadata index.
    pub index: SharedIndex,
    /// Lifecycle event fan-out.
    pub events: EventBus,
    /// Prometheus collectors.
    pub metrics: Metrics,
}

enum Stop {
    Cancelled,
    Failed(TransferError),
}

impl From<TransferError> for Stop {
    fn from(err: TransferError) -> Self {
        Self::Failed(err)
    }
}

/// Owns every transfer job from submission to history.
pub struct TransferOrchestrator {
    pipeline: Pipeline,
    settings: OrchestratorSettings,
    jobs: JobStore,
    cancels: Mutex<HashMap<Uuid, watch::Sender<bool>>>,
}

impl TransferOrchestrator {
    /// Orchestrator over `pipeline`.
    #[must_use]
    pub fn new(pipeline: Pipeline, settings: OrchestratorSettings) -> Arc<Self> {
        Arc::new(Self {
            jobs: JobStore::new(settings.history_limit),
            pipeline,
            settings,
            cancels: Mutex::new(HashMap::new()),
        })
    }

    /// Lifecycle event bus.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.pipeline.events
    }

    /// Metrics registry.
    #[must_use]
    pub const fn metrics(&self) -> &Metrics {
        &self.pipeline.metrics
    }

    /// Active settings.
    #[must_use]
    pub const fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Validate `descriptor`, create a job and start or queue it.
    ///
    /// Must be called from within a Tokio runtime; the job runs on its own task.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::InvalidDescriptor`] and creates no job when the
    /// descriptor is empty or malformed.
    pub fn submit(self: &Arc<Self>, descriptor: TransferDescriptor) -> TransferResult<Uuid> {
        descriptor.validate()?;
        let id = Uuid::now_v7();
        let source = descriptor.kind();
        let job = TransferJob::new(id, descriptor.display_name(), source, JobPhase::Queued);
        let name = job.name.clone();

        let (cancel_tx, cancel_rx) = watch::channel(false);
        self.lock_cancels().insert(id, cancel_tx);
        let admission = self.jobs.admit(job);

        self.emit(Event::JobSubmitted {
            job_id: id,
            name: name.clone(),
            source,
        });
        let grant = match admission {
            Admission::Started => {
                self.emit(Event::PhaseChanged {
                    job_id: id,
                    phase: JobPhase::Connecting,
                });
                None
            }
            Admission::Queued { position, grant } => {
                self.emit(Event::JobQueued {
                    job_id: id,
                    position,
                });
                Some(grant)
            }
        };
        self.refresh_gauges();
        info!(job_id = %id, source = %source, name = %name, queued = grant.is_some(), "transfer submitted");

        let orchestrator = Arc::clone(self);
        tokio::spawn(
            async move { orchestrator.run(id, descriptor, grant, cancel_rx).await }
                .instrument(job_span(id, source.as_str())),
        );
        Ok(id)
    }

    /// Cancel a live job, tearing down its swarm resource and promoting the queue.
    ///
    /// # Errors
    ///
    /// - [`TransferError::JobNotFound`] for unknown identifiers.
    /// - [`TransferError::JobFinished`] when the job is already terminal.
    pub fn cancel(self: &Arc<Self>, job_id: Uuid) -> TransferResult<()> {
        let job = self
            .jobs
            .get(job_id)
            .ok_or(TransferError::JobNotFound { job_id })?;
        if job.phase.is_terminal() {
            return Err(TransferError::JobFinished {
                job_id,
                phase: job.phase,
            });
        }

        let shifted = self.jobs.dequeue(job_id);
        if self.jobs.transition(job_id, JobPhase::Cancelled).is_none() {
            let phase = self.jobs.get(job_id).map_or(JobPhase::Cancelled, |job| job.phase);
            return Err(TransferError::JobFinished { job_id, phase });
        }
        if let Some(sender) = self.lock_cancels().get(&job_id) {
            sender.send_replace(true);
        }

        info!(job_id = %job_id, "transfer cancelled");
        self.emit(Event::PhaseChanged {
            job_id,
            phase: JobPhase::Cancelled,
        });
        self.emit(Event::JobCancelled { job_id });
        self.pipeline.metrics.inc_job_outcome(JobPhase::Cancelled.as_str());
        for (queued, position) in shifted.unwrap_or_default() {
            self.emit(Event::JobQueued {
                job_id: queued,
                position,
            });
        }
        self.release(job_id);
        self.schedule_eviction(job_id);
        Ok(())
    }

    /// Active, queued and historical jobs.
    #[must_use]
    pub fn list(&self) -> JobListing {
        self.jobs.listing()
    }

    /// Snapshot of one job, live or historical.
    #[must_use]
    pub fn get(&self, job_id: Uuid) -> Option<TransferJob> {
        self.jobs.get(job_id)
    }

    async fn run(
        self: Arc<Self>,
        id: Uuid,
        descriptor: TransferDescriptor,
        grant: Option<SlotGrant>,
        mut cancel: watch::Receiver<bool>,
    ) {
        if let Some(grant) = grant {
            let granted = tokio::select! {
                biased;
                () = cancelled(&mut cancel) => false,
                granted = grant => granted.is_ok(),
            };
            if !granted {
                debug!("job left the queue before acquiring");
                self.forget(id);
                return;
            }
        }

        match self.drive(id, &descriptor, &mut cancel).await {
            Ok(()) => {}
            Err(Stop::Cancelled) => debug!("job task observed cancellation"),
            Err(Stop::Failed(err)) => self.fail(id, &err),
        }
        self.release(id);
        self.forget(id);
    }

    async fn drive(
        self: &Arc<Self>,
        id: Uuid,
        descriptor: &TransferDescriptor,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<(), Stop> {
        let adapter = self.pipeline.adapter.clone();
        let request = descriptor.clone();
        let mut acquiring = tokio::spawn(async move { adapter.acquire(&request).await });
        let watchdog = tokio::time::sleep(self.settings.peer_timeout);

        let payload = tokio::select! {
            biased;
            () = cancelled(cancel) => {
                reap(acquiring);
                return Err(Stop::Cancelled);
            }
            joined = &mut acquiring => {
                joined.map_err(|err| TransferError::acquisition("add", err))??
            }
            () = watchdog => {
                reap(acquiring);
                let waited_secs = self.settings.peer_timeout.as_secs();
                warn!(waited_secs, "no peers before watchdog fired");
                return Err(Stop::Failed(TransferError::AcquisitionTimeout { waited_secs }));
            }
        };

        let result = self.transfer(id, &payload, cancel).await;
        payload.destroy().await;
        result
    }

    async fn transfer(
        self: &Arc<Self>,
        id: Uuid,
        payload: &AcquiredPayload,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<(), Stop> {
        let file = payload.file().clone();
        let index = self.pipeline.index.current();
        let parsed = self.pipeline.parser.parse(&file.name, &index);
        self.jobs.update(id, |job| {
            job.file_name = Some(file.name.clone());
            job.size_bytes = Some(file.length);
        });

        if let Some(found) = self
            .pipeline
            .guard
            .check(&file.name, parsed.title_id.as_deref(), parsed.version)
            .await
        {
            return Err(Stop::Failed(TransferError::DuplicatePayload {
                file_name: file.name,
                existing_path: found.entry.path,
                kind: found.kind.as_str(),
            }));
        }
        if !self.advance(id, JobPhase::Downloading) {
            return Err(Stop::Cancelled);
        }

        let sink = Arc::new(JobProgress::new(Arc::clone(self), id));
        let pump = payload.spawn_progress(sink.clone());
        let source = payload.open().await?;
        let destination = remote_path(&self.settings.root_folder, &file.name);

        let upload = self
            .pipeline
            .uploads
            .upload(source, &destination, file.length, sink.as_ref());
        tokio::pin!(upload);
        let mut torn_down = false;
        let uploaded = loop {
            tokio::select! {
                result = &mut upload => break result,
                () = cancelled(cancel), if !torn_down => {
                    // In-flight store calls finish on their own; the source dies with the resource.
                    payload.destroy().await;
                    torn_down = true;
                }
            }
        };
        drop(pump);
        if *cancel.borrow() {
            return Err(Stop::Cancelled);
        }
        let uploaded = uploaded?;
        self.pipeline.metrics.inc_upload(uploaded.strategy.as_str());
        self.pipeline.metrics.add_bytes_uploaded(uploaded.size_bytes);
        self.advance(id, JobPhase::Uploading);

        let entry = CatalogEntry {
            path: uploaded.path.clone(),
            name: parsed.clean_name,
            file_name: file.name,
            size_bytes: uploaded.size_bytes,
            url: uploaded.url.clone(),
            title_id: parsed.title_id,
            version: parsed.version,
            indexed_at: None,
        };
        match self.pipeline.indexer.upsert(entry).await {
            Ok(stored) => self.emit(Event::CatalogIndexed { path: stored.path }),
            Err(err) => warn!(
                path = %uploaded.path,
                error = %err.describe(),
                "catalog write failed after upload; keeping the uploaded object"
            ),
        }

        self.complete(id, &uploaded);
        Ok(())
    }

    fn complete(self: &Arc<Self>, id: Uuid, uploaded: &UploadedObject) {
        self.jobs.update(id, |job| {
            job.remote_path = Some(uploaded.path.clone());
            job.url = Some(uploaded.url.clone());
            job.progress.upload_percent = 100.0;
            job.progress.bytes_uploaded = uploaded.size_bytes;
        });
        if self.jobs.transition(id, JobPhase::Done).is_none() {
            return;
        }
        info!(path = %uploaded.path, strategy = %uploaded.strategy, "transfer complete");
        self.emit(Event::PhaseChanged {
            job_id: id,
            phase: JobPhase::Done,
        });
        self.emit(Event::JobCompleted {
            job_id: id,
            url: uploaded.url.clone(),
        });
        self.pipeline.metrics.inc_job_outcome(JobPhase::Done.as_str());
        self.schedule_eviction(id);
    }

    fn fail(self: &Arc<Self>, id: Uuid, err: &TransferError) {
        let message = err.describe();
        if self.jobs.fail(id, message.clone()).is_none() {
            return;
        }
        warn!(error = %message, "transfer failed");
        self.emit(Event::PhaseChanged {
            job_id: id,
            phase: JobPhase::Error,
        });
        self.emit(Event::JobFailed {
            job_id: id,
            message,
        });
        self.pipeline.metrics.inc_job_outcome(JobPhase::Error.as_str());
        self.schedule_eviction(id);
    }

    /// Move `id` forward and announce it; `false` when the job already ended.
    pub(crate) fn advance(&self, id: Uuid, phase: JobPhase) -> bool {
        let Some(job) = self.jobs.get(id) else {
            return false;
        };
        if job.phase == phase {
            return true;
        }
        if self.jobs.transition(id, phase).is_none() {
            return false;
        }
        debug!(phase = %phase, "phase changed");
        self.emit(Event::PhaseChanged { job_id: id, phase });
        true
    }

    /// Give up the acquisition slot if `id` holds it.
    pub(crate) fn release(&self, id: Uuid) {
        let change = self.jobs.release_slot(id);
        if let Some(next) = change.promoted {
            info!(job_id = %next, "queued transfer promoted");
            self.emit(Event::PhaseChanged {
                job_id: next,
                phase: JobPhase::Connecting,
            });
        }
        for (queued, position) in change.shifted {
            self.emit(Event::JobQueued {
                job_id: queued,
                position,
            });
        }
        self.refresh_gauges();
    }

    pub(crate) fn update_job<F>(&self, id: Uuid, update: F) -> bool
    where
        F: FnOnce(&mut TransferJob),
    {
        self.jobs.update(id, update).is_some()
    }

    pub(crate) fn emit(&self, event: Event) {
        self.pipeline.metrics.inc_event(event.kind());
        let _ = self.pipeline.events.publish(event);
    }

    fn schedule_eviction(self: &Arc<Self>, id: Uuid) {
        self.refresh_gauges();
        let orchestrator = Arc::downgrade(self);
        let retention = self.settings.retention;
        tokio::spawn(async move {
            tokio::time::sleep(retention).await;
            if let Some(orchestrator) = orchestrator.upgrade()
                && orchestrator.jobs.evict(id)
            {
                debug!(job_id = %id, "job moved to history");
                orchestrator.refresh_gauges();
            }
        });
    }

    fn refresh_gauges(&self) {
        let (running, queued) = self.jobs.counts();
        self.pipeline
            .metrics
            .set_active_jobs(i64::try_from(running).unwrap_or(i64::MAX));
        self.pipeline
            .metrics
            .set_queue_depth(i64::try_from(queued).unwrap_or(i64::MAX));
    }

    fn forget(&self, id: Uuid) {
        self.lock_cancels().remove(&id);
    }

    fn lock_cancels(&self) -> MutexGuard<'_, HashMap<Uuid, watch::Sender<bool>>> {
        self.cancels.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Resolves once cancellation is requested; pends forever if the sender is gone.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    if cancel.wait_for(|requested| *requested).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Abort a pending acquisition so its `add` call is dropped before the slot
/// moves on; a payload that already resolved is destroyed.
fn reap(acquiring: JoinHandle<TransferResult<AcquiredPayload>>) {
    acquiring.abort();
    tokio::spawn(async move {
        if let Ok(Ok(payload)) = acquiring.await {
            debug!("late swarm resolution torn down");
            payload.destroy().await;
        }
    });
}

fn remote_path(root_folder: &str, file_name: &str) -> String {
    format!("{}/{file_name}", root_folder.trim_end_matches('/'))
}
