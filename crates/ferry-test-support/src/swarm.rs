//! Scripted swarm client for acquisition and orchestrator tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use ferry_core::{
    ByteSource, SwarmClient, SwarmFile, SwarmHandle, SwarmStats, TransferDescriptor,
};

use crate::fixtures::byte_source;

/// What the next `add` call resolves to.
#[derive(Debug, Clone)]
pub struct StubTorrent {
    name: String,
    files: Vec<SwarmFile>,
    stats: SwarmStats,
    resolve_after: Duration,
    add_error: Option<String>,
    open_error: Option<String>,
    truncate_to: Option<u64>,
}

impl StubTorrent {
    /// Resource named `name` with no files, fully downloaded.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            files: Vec::new(),
            stats: SwarmStats {
                progress: 1.0,
                download_bps: 0,
                peers: 1,
                downloaded: 0,
            },
            resolve_after: Duration::ZERO,
            add_error: None,
            open_error: None,
            truncate_to: None,
        }
    }

    /// Append a file to the metadata listing.
    #[must_use]
    pub fn file(mut self, name: &str, length: u64) -> Self {
        self.files.push(SwarmFile {
            name: name.to_string(),
            length,
        });
        self
    }

    /// Initial download statistics.
    #[must_use]
    pub const fn stats(mut self, stats: SwarmStats) -> Self {
        self.stats = stats;
        self
    }

    /// Delay before metadata resolves.
    #[must_use]
    pub const fn resolve_after(mut self, delay: Duration) -> Self {
        self.resolve_after = delay;
        self
    }

    /// Make `add` fail with `message` once the delay elapses.
    #[must_use]
    pub fn fail_add(mut self, message: &str) -> Self {
        self.add_error = Some(message.to_string());
        self
    }

    /// Make `open` fail with `message`.
    #[must_use]
    pub fn fail_open(mut self, message: &str) -> Self {
        self.open_error = Some(message.to_string());
        self
    }

    /// Serve at most `len` bytes from every opened file.
    #[must_use]
    pub const fn truncate_to(mut self, len: u64) -> Self {
        self.truncate_to = Some(len);
        self
    }
}

/// Resource handed out by [`ScriptedSwarm`].
pub struct StubHandle {
    script: StubTorrent,
    stats: Mutex<SwarmStats>,
    destroyed: AtomicBool,
    opened: AtomicUsize,
}

impl StubHandle {
    fn new(script: StubTorrent) -> Self {
        Self {
            stats: Mutex::new(script.stats),
            script,
            destroyed: AtomicBool::new(false),
            opened: AtomicUsize::new(0),
        }
    }

    /// Replace the reported statistics.
    pub fn set_stats(&self, stats: SwarmStats) {
        *self.lock_stats() = stats;
    }

    /// Whether `destroy` has been called.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// How many streams were opened.
    #[must_use]
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    fn lock_stats(&self) -> MutexGuard<'_, SwarmStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SwarmHandle for StubHandle {
    fn name(&self) -> String {
        self.script.name.clone()
    }

    fn files(&self) -> Vec<SwarmFile> {
        self.script.files.clone()
    }

    fn stats(&self) -> SwarmStats {
        *self.lock_stats()
    }

    async fn open(&self, index: usize) -> anyhow::Result<ByteSource> {
        if let Some(message) = &self.script.open_error {
            bail!("{message}");
        }
        let file = self
            .script
            .files
            .get(index)
            .ok_or_else(|| anyhow!("no file at index {index}"))?;
        self.opened.fetch_add(1, Ordering::SeqCst);
        let len = self
            .script
            .truncate_to
            .map_or(file.length, |limit| limit.min(file.length));
        Ok(byte_source(len))
    }

    async fn destroy(&self) -> anyhow::Result<()> {
        self.destroyed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct Script {
    pending: VecDeque<StubTorrent>,
    handles: Vec<Arc<StubHandle>>,
    added: Vec<TransferDescriptor>,
    in_flight: usize,
    peak_in_flight: usize,
}

/// Decrements the in-flight count even when the `add` future is dropped.
struct InFlight<'a>(&'a ScriptedSwarm);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut script = self.0.lock();
        script.in_flight = script.in_flight.saturating_sub(1);
    }
}

/// [`SwarmClient`] that resolves queued [`StubTorrent`]s in order.
#[derive(Default)]
pub struct ScriptedSwarm {
    script: Mutex<Script>,
}

impl ScriptedSwarm {
    /// Client with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the resource the next `add` call resolves to.
    pub fn push(&self, torrent: StubTorrent) {
        self.lock().pending.push_back(torrent);
    }

    /// Handles resolved so far, in `add` order.
    #[must_use]
    pub fn handles(&self) -> Vec<Arc<StubHandle>> {
        self.lock().handles.clone()
    }

    /// Descriptors received so far, in `add` order.
    #[must_use]
    pub fn added(&self) -> Vec<TransferDescriptor> {
        self.lock().added.clone()
    }

    /// Highest number of `add` calls pending at the same time.
    #[must_use]
    pub fn peak_concurrent_adds(&self) -> usize {
        self.lock().peak_in_flight
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SwarmClient for ScriptedSwarm {
    async fn add(&self, descriptor: &TransferDescriptor) -> anyhow::Result<Arc<dyn SwarmHandle>> {
        let next = {
            let mut script = self.lock();
            script.added.push(descriptor.clone());
            script.in_flight += 1;
            script.peak_in_flight = script.peak_in_flight.max(script.in_flight);
            script.pending.pop_front()
        };
        let _in_flight = InFlight(self);
        let torrent = next.ok_or_else(|| anyhow!("no scripted resource for descriptor"))?;
        if !torrent.resolve_after.is_zero() {
            tokio::time::sleep(torrent.resolve_after).await;
        }
        if let Some(message) = &torrent.add_error {
            bail!("{message}");
        }
        let handle = Arc::new(StubHandle::new(torrent));
        self.lock().handles.push(Arc::clone(&handle));
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::magnet;

    #[tokio::test]
    async fn resolves_scripted_resources_in_order() {
        let swarm = ScriptedSwarm::new();
        swarm.push(StubTorrent::new("first").file("a.nsp", 3));
        swarm.push(StubTorrent::new("second").fail_add("tracker unreachable"));

        let handle = swarm.add(&magnet("first")).await.expect("first resolves");
        assert_eq!(handle.name(), "first");
        assert_eq!(handle.files().len(), 1);

        let err = swarm
            .add(&magnet("second"))
            .await
            .err()
            .expect("second fails");
        assert!(err.to_string().contains("tracker unreachable"));
        assert!(swarm.add(&magnet("third")).await.is_err());
        assert_eq!(swarm.added().len(), 3);
        assert_eq!(swarm.peak_concurrent_adds(), 1);

        handle.destroy().await.expect("destroy");
        assert!(swarm.handles()[0].is_destroyed());
    }
}
