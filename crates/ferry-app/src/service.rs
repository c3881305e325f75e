//! Service wiring: builds every pipeline component from configuration.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use ferry_catalog::{CatalogIndexer, DedupGuard};
use ferry_config::FerryConfig;
use ferry_core::{
    CatalogEntry, CatalogStore, JobListing, RemoteStore, SwarmClient, TransferDescriptor,
    TransferJob, TransferResult,
};
use ferry_events::{Event, EventBus};
use ferry_metadata::{AggregationReport, Aggregator, FilenameParser, MetadataSource, SharedIndex};
use ferry_swarm::{AcquisitionAdapter, AcquisitionSettings, ExtensionAllowList};
use ferry_telemetry::Metrics;
use ferry_upload::{DropboxConfig, DropboxStore, UploadEngine, UploadSettings};
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::orchestrator::{OrchestratorSettings, Pipeline, TransferOrchestrator};
use crate::rescan::{CatalogRescan, RescanReport};

/// External systems the service drives.
#[derive(Clone)]
pub struct Collaborators {
    /// Process-wide swarm client.
    pub swarm: Arc<dyn SwarmClient>,
    /// Remote object store.
    pub remote: Arc<dyn RemoteStore>,
    /// Catalog record store.
    pub catalog: Arc<dyn CatalogStore>,
}

/// Fully wired transfer pipeline.
pub struct TransferService {
    orchestrator: Arc<TransferOrchestrator>,
    aggregator: Aggregator,
    index: SharedIndex,
    indexer: CatalogIndexer,
    rescan: CatalogRescan,
}

impl TransferService {
    /// Wire the pipeline over explicit collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Metadata`] when the metadata HTTP client or the
    /// filename patterns cannot be built.
    pub fn new(
        config: &FerryConfig,
        collaborators: Collaborators,
        events: EventBus,
        metrics: Metrics,
    ) -> AppResult<Self> {
        let sources = MetadataSource::ranked(
            config
                .metadata
                .sources
                .iter()
                .map(|source| (source.name.clone(), source.url.clone())),
        );
        let aggregator = Aggregator::new(sources, config.metadata.request_timeout)
            .map_err(|err| AppError::metadata("metadata.aggregator", err))?;
        let parser =
            FilenameParser::new().map_err(|err| AppError::metadata("metadata.parser", err))?;
        let index = SharedIndex::default();
        let allowed = ExtensionAllowList::new(&config.acquisition.allowed_extensions);
        let indexer = CatalogIndexer::new(Arc::clone(&collaborators.catalog));

        let adapter = AcquisitionAdapter::new(
            collaborators.swarm,
            AcquisitionSettings {
                allowed: allowed.clone(),
                progress_interval: config.acquisition.progress_interval,
            },
        );
        let uploads = UploadEngine::new(
            Arc::clone(&collaborators.remote),
            UploadSettings {
                threshold_bytes: config.upload.threshold_bytes,
                chunk_bytes: config.upload.chunk_bytes,
            },
        );
        let rescan = CatalogRescan::new(
            collaborators.remote,
            indexer.clone(),
            parser.clone(),
            index.clone(),
            allowed,
            config.store.root_folder.clone(),
        );
        let orchestrator = TransferOrchestrator::new(
            Pipeline {
                adapter,
                uploads,
                guard: DedupGuard::new(collaborators.catalog),
                indexer: indexer.clone(),
                parser,
                index: index.clone(),
                events,
                metrics,
            },
            OrchestratorSettings::from_config(config),
        );

        Ok(Self {
            orchestrator,
            aggregator,
            index,
            indexer,
            rescan,
        })
    }

    /// Wire the pipeline with the bundled HTTP remote store and fresh telemetry.
    ///
    /// # Errors
    ///
    /// - [`AppError::Config`] when the store token is missing.
    /// - [`AppError::Telemetry`] when the metrics registry cannot be built.
    /// - [`AppError::Metadata`] as for [`Self::new`].
    pub fn from_config(
        config: &FerryConfig,
        swarm: Arc<dyn SwarmClient>,
        catalog: Arc<dyn CatalogStore>,
    ) -> AppResult<Self> {
        let remote = dropbox_store(config)?;
        let metrics = Metrics::new().map_err(|err| AppError::telemetry("metrics.new", err))?;
        Self::new(
            config,
            Collaborators {
                swarm,
                remote: Arc::new(remote),
                catalog,
            },
            EventBus::new(),
            metrics,
        )
    }

    /// Underlying orchestrator.
    #[must_use]
    pub const fn orchestrator(&self) -> &Arc<TransferOrchestrator> {
        &self.orchestrator
    }

    /// Lifecycle event bus.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        self.orchestrator.events()
    }

    /// Current metadata index handle.
    #[must_use]
    pub const fn index(&self) -> &SharedIndex {
        &self.index
    }

    /// See [`TransferOrchestrator::submit`].
    ///
    /// # Errors
    ///
    /// Propagates descriptor validation failures.
    pub fn submit(&self, descriptor: TransferDescriptor) -> TransferResult<Uuid> {
        self.orchestrator.submit(descriptor)
    }

    /// See [`TransferOrchestrator::cancel`].
    ///
    /// # Errors
    ///
    /// Propagates unknown or finished job failures.
    pub fn cancel(&self, job_id: Uuid) -> TransferResult<()> {
        self.orchestrator.cancel(job_id)
    }

    /// See [`TransferOrchestrator::list`].
    #[must_use]
    pub fn list(&self) -> JobListing {
        self.orchestrator.list()
    }

    /// See [`TransferOrchestrator::get`].
    #[must_use]
    pub fn get(&self, job_id: Uuid) -> Option<TransferJob> {
        self.orchestrator.get(job_id)
    }

    /// Rebuild the metadata index from every configured source and swap it in.
    pub async fn rebuild_metadata(&self) -> AggregationReport {
        let (index, report) = self.aggregator.aggregate().await;
        self.index.replace(index);
        self.orchestrator.metrics().set_metadata_index_keys(report.keys);
        info!(
            keys = report.keys,
            sources = report.sources.len(),
            failed = report.failed.len(),
            "metadata index rebuilt"
        );
        self.orchestrator.emit(Event::MetadataIndexRebuilt {
            keys: report.keys,
            sources: report.sources.len(),
        });
        report
    }

    /// Rebuild the catalog from the remote root folder.
    ///
    /// # Errors
    ///
    /// See [`CatalogRescan::rescan`].
    pub async fn rescan(&self) -> AppResult<RescanReport> {
        self.rescan.rescan().await
    }

    /// Every catalog record and the last indexing time.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Transfer`] when the catalog store cannot be read.
    pub async fn catalog(&self) -> AppResult<(Vec<CatalogEntry>, Option<DateTime<Utc>>)> {
        let entries = self
            .indexer
            .list()
            .await
            .map_err(|err| AppError::transfer("catalog.list", err))?;
        let last_indexed = self
            .indexer
            .last_indexed()
            .await
            .map_err(|err| AppError::transfer("catalog.last_indexed", err))?;
        Ok((entries, last_indexed))
    }
}

/// Build the bundled HTTP remote store from the `store` section.
///
/// # Errors
///
/// Returns [`AppError::Config`] when the store token is missing.
pub fn dropbox_store(config: &FerryConfig) -> AppResult<DropboxStore> {
    let token = config
        .require_store_token()
        .map_err(|err| AppError::config("store.access_token", err))?;
    Ok(DropboxStore::new(DropboxConfig {
        access_token: token.to_string(),
        api_url: config.store.api_url.clone(),
        content_url: config.store.content_url.clone(),
        link_base: config.store.link_base.clone(),
    }))
}
