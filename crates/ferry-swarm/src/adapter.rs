//! Descriptor → payload resolution over the shared swarm client.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use ferry_core::{
    ByteSource, ProgressSink, SwarmClient, SwarmFile, SwarmHandle, TransferDescriptor,
    TransferError, TransferResult,
};
use tracing::{debug, info, warn};

use crate::progress::ProgressPump;
use crate::selection::{ExtensionAllowList, select_largest};

/// Tuning for [`AcquisitionAdapter`].
#[derive(Debug, Clone)]
pub struct AcquisitionSettings {
    /// Accepted payload extensions.
    pub allowed: ExtensionAllowList,
    /// Cadence of download telemetry.
    pub progress_interval: Duration,
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self {
            allowed: ExtensionAllowList::new(["nsp", "xci", "nsz"]),
            progress_interval: Duration::from_secs(1),
        }
    }
}

/// Wraps the process-wide swarm client.
#[derive(Clone)]
pub struct AcquisitionAdapter {
    client: Arc<dyn SwarmClient>,
    settings: AcquisitionSettings,
}

impl AcquisitionAdapter {
    /// Adapter over `client`.
    #[must_use]
    pub fn new(client: Arc<dyn SwarmClient>, settings: AcquisitionSettings) -> Self {
        Self { client, settings }
    }

    /// Active settings.
    #[must_use]
    pub const fn settings(&self) -> &AcquisitionSettings {
        &self.settings
    }

    /// Submit `descriptor`, wait for metadata and select the payload file.
    ///
    /// # Errors
    ///
    /// - [`TransferError::InvalidDescriptor`] when the descriptor is malformed.
    /// - [`TransferError::AcquisitionFailure`] (`add`) when the swarm rejects it.
    /// - [`TransferError::UnsupportedPayload`] when the largest file is not
    ///   allow-listed; the resource is destroyed first.
    pub async fn acquire(&self, descriptor: &TransferDescriptor) -> TransferResult<AcquiredPayload> {
        descriptor.validate()?;
        let handle = self
            .client
            .add(descriptor)
            .await
            .map_err(|err| TransferError::acquisition("add", err))?;

        let files = handle.files();
        let Some((index, file)) = select_largest(&files) else {
            let file_name = handle.name();
            teardown(handle.as_ref()).await;
            return Err(TransferError::UnsupportedPayload { file_name });
        };
        if !self.settings.allowed.allows(&file.name) {
            let file_name = file.name.clone();
            teardown(handle.as_ref()).await;
            return Err(TransferError::UnsupportedPayload { file_name });
        }

        info!(
            resource = %handle.name(),
            file = %file.name,
            size_bytes = file.length,
            "payload selected"
        );
        Ok(AcquiredPayload {
            file: file.clone(),
            index,
            handle,
            progress_interval: self.settings.progress_interval,
            destroyed: AtomicBool::new(false),
        })
    }
}

/// A resolved swarm resource and the file chosen from it.
pub struct AcquiredPayload {
    handle: Arc<dyn SwarmHandle>,
    index: usize,
    file: SwarmFile,
    progress_interval: Duration,
    destroyed: AtomicBool,
}

impl AcquiredPayload {
    /// Swarm-reported resource name.
    #[must_use]
    pub fn name(&self) -> String {
        self.handle.name()
    }

    /// Selected payload file.
    #[must_use]
    pub const fn file(&self) -> &SwarmFile {
        &self.file
    }

    /// Position of the selected file in the resource listing.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Open a sequential stream over the selected file.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::AcquisitionFailure`] (`open`) when the swarm
    /// cannot provide a reader.
    pub async fn open(&self) -> TransferResult<ByteSource> {
        self.handle
            .open(self.index)
            .await
            .map_err(|err| TransferError::acquisition("open", err))
    }

    /// Start reporting download telemetry to `sink`.
    #[must_use]
    pub fn spawn_progress(&self, sink: Arc<dyn ProgressSink>) -> ProgressPump {
        ProgressPump::spawn(
            Arc::clone(&self.handle),
            self.file.length,
            self.progress_interval,
            sink,
        )
    }

    /// Tear the resource down; only the first call reaches the swarm.
    pub async fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        teardown(self.handle.as_ref()).await;
    }

    /// Whether [`Self::destroy`] has run.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }
}

async fn teardown(handle: &dyn SwarmHandle) {
    match handle.destroy().await {
        Ok(()) => debug!(resource = %handle.name(), "swarm resource destroyed"),
        Err(err) => warn!(
            resource = %handle.name(),
            error = %err,
            "failed to destroy swarm resource"
        ),
    }
}
