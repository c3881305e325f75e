//! Job records, the FIFO queue and the single acquisition slot.
//!
//! All state sits behind one mutex; every operation is a short critical
//! section returning snapshots, so callers never hold the lock across awaits.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use ferry_core::{JobListing, JobPhase, TransferJob};
use tokio::sync::oneshot;
use uuid::Uuid;

/// Signal that a queued job now holds the acquisition slot.
pub(crate) type SlotGrant = oneshot::Receiver<()>;

/// Result of admitting a job.
pub(crate) enum Admission {
    /// The slot was free; the job is `connecting`.
    Started,
    /// The job waits at `position` (1-based) until `grant` fires.
    Queued { position: usize, grant: SlotGrant },
}

/// Jobs whose queue position changed, and the job promoted into the slot.
#[derive(Debug, Default)]
pub(crate) struct SlotChange {
    pub(crate) promoted: Option<Uuid>,
    pub(crate) shifted: Vec<(Uuid, usize)>,
}

struct Waiting {
    id: Uuid,
    grant: oneshot::Sender<()>,
}

#[derive(Default)]
struct JobState {
    jobs: HashMap<Uuid, TransferJob>,
    order: Vec<Uuid>,
    queue: VecDeque<Waiting>,
    slot: Option<Uuid>,
    history: VecDeque<TransferJob>,
}

impl JobState {
    fn renumber(&mut self) -> Vec<(Uuid, usize)> {
        let mut shifted = Vec::new();
        for (index, waiting) in self.queue.iter().enumerate() {
            let position = index + 1;
            if let Some(job) = self.jobs.get_mut(&waiting.id)
                && job.queue_position != Some(position)
            {
                job.queue_position = Some(position);
                job.updated_at = Utc::now();
                shifted.push((waiting.id, position));
            }
        }
        shifted
    }

    fn promote(&mut self) -> Option<Uuid> {
        while let Some(next) = self.queue.pop_front() {
            let Some(job) = self.jobs.get_mut(&next.id) else {
                continue;
            };
            if !job.advance(JobPhase::Connecting) {
                continue;
            }
            if next.grant.send(()).is_err() {
                // Task is gone; nothing will drive this job.
                job.advance(JobPhase::Error);
                job.error = Some("job task exited before acquiring".to_string());
                continue;
            }
            self.slot = Some(next.id);
            return Some(next.id);
        }
        None
    }
}

/// Orchestrator-owned job store.
pub(crate) struct JobStore {
    state: Mutex<JobState>,
    history_limit: usize,
}

impl JobStore {
    pub(crate) fn new(history_limit: usize) -> Self {
        Self {
            state: Mutex::new(JobState::default()),
            history_limit,
        }
    }

    fn lock(&self) -> MutexGuard<'_, JobState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a fresh `queued` job and either give it the slot or enqueue it.
    pub(crate) fn admit(&self, mut job: TransferJob) -> Admission {
        let mut state = self.lock();
        let id = job.id;
        state.order.push(id);
        if state.slot.is_none() {
            job.advance(JobPhase::Connecting);
            state.slot = Some(id);
            state.jobs.insert(id, job);
            return Admission::Started;
        }
        let (grant_tx, grant) = oneshot::channel();
        let position = state.queue.len() + 1;
        job.queue_position = Some(position);
        state.jobs.insert(id, job);
        state.queue.push_back(Waiting { id, grant: grant_tx });
        Admission::Queued { position, grant }
    }

    /// Free the slot if `id` holds it and hand it to the queue head.
    pub(crate) fn release_slot(&self, id: Uuid) -> SlotChange {
        let mut state = self.lock();
        if state.slot != Some(id) {
            return SlotChange::default();
        }
        state.slot = None;
        let promoted = state.promote();
        let shifted = state.renumber();
        SlotChange { promoted, shifted }
    }

    /// Drop `id` from the queue; returns the renumbered jobs when it was queued.
    pub(crate) fn dequeue(&self, id: Uuid) -> Option<Vec<(Uuid, usize)>> {
        let mut state = self.lock();
        let index = state.queue.iter().position(|waiting| waiting.id == id)?;
        state.queue.remove(index);
        if let Some(job) = state.jobs.get_mut(&id) {
            job.queue_position = None;
        }
        Some(state.renumber())
    }

    /// Move `id` to `next`; returns the updated snapshot when the transition was legal.
    pub(crate) fn transition(&self, id: Uuid, next: JobPhase) -> Option<TransferJob> {
        let mut state = self.lock();
        let job = state.jobs.get_mut(&id)?;
        job.advance(next).then(|| job.clone())
    }

    /// Mark `id` as failed with `message`, unless it already finished.
    pub(crate) fn fail(&self, id: Uuid, message: String) -> Option<TransferJob> {
        let mut state = self.lock();
        let job = state.jobs.get_mut(&id)?;
        if !job.advance(JobPhase::Error) {
            return None;
        }
        job.error = Some(message);
        Some(job.clone())
    }

    /// Apply `update` to a live job and return the new snapshot.
    pub(crate) fn update<F>(&self, id: Uuid, update: F) -> Option<TransferJob>
    where
        F: FnOnce(&mut TransferJob),
    {
        let mut state = self.lock();
        let job = state.jobs.get_mut(&id)?;
        if job.phase.is_terminal() {
            return None;
        }
        update(job);
        job.updated_at = Utc::now();
        Some(job.clone())
    }

    /// Move a terminal job from the active set into bounded history.
    pub(crate) fn evict(&self, id: Uuid) -> bool {
        let mut state = self.lock();
        let terminal = state
            .jobs
            .get(&id)
            .is_some_and(|job| job.phase.is_terminal());
        if !terminal {
            return false;
        }
        let Some(job) = state.jobs.remove(&id) else {
            return false;
        };
        state.order.retain(|entry| *entry != id);
        state.history.push_front(job);
        state.history.truncate(self.history_limit);
        true
    }

    pub(crate) fn get(&self, id: Uuid) -> Option<TransferJob> {
        let state = self.lock();
        state
            .jobs
            .get(&id)
            .cloned()
            .or_else(|| state.history.iter().find(|job| job.id == id).cloned())
    }

    pub(crate) fn listing(&self) -> JobListing {
        let state = self.lock();
        let mut active = Vec::new();
        let mut queued = Vec::new();
        for id in &state.order {
            let Some(job) = state.jobs.get(id) else {
                continue;
            };
            if job.phase == JobPhase::Queued {
                queued.push(job.clone());
            } else {
                active.push(job.clone());
            }
        }
        queued.sort_by_key(|job| job.queue_position);
        JobListing {
            active,
            queued,
            history: state.history.iter().cloned().collect(),
        }
    }

    /// `(running, queued)` counts for the gauges.
    pub(crate) fn counts(&self) -> (usize, usize) {
        let state = self.lock();
        let running = state
            .jobs
            .values()
            .filter(|job| !job.phase.is_terminal() && job.phase != JobPhase::Queued)
            .count();
        (running, state.queue.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::SourceKind;

    fn job(name: &str) -> TransferJob {
        TransferJob::new(
            Uuid::now_v7(),
            name.to_string(),
            SourceKind::Magnet,
            JobPhase::Queued,
        )
    }

    fn queued_position(admission: &Admission) -> Option<usize> {
        match admission {
            Admission::Started => None,
            Admission::Queued { position, .. } => Some(*position),
        }
    }

    #[test]
    fn first_job_takes_slot_and_rest_queue_in_order() {
        let store = JobStore::new(10);
        let first = job("a");
        let first_id = first.id;
        assert!(queued_position(&store.admit(first)).is_none());
        assert_eq!(
            store.get(first_id).map(|job| job.phase),
            Some(JobPhase::Connecting)
        );

        let positions: Vec<_> = (0..3)
            .map(|index| queued_position(&store.admit(job(&format!("q{index}")))))
            .collect();
        assert_eq!(positions, vec![Some(1), Some(2), Some(3)]);
        assert_eq!(store.counts(), (1, 3));
    }

    #[test]
    fn release_promotes_head_and_shifts_queue() {
        let store = JobStore::new(10);
        let active = job("active");
        let active_id = active.id;
        let _ = store.admit(active);
        let mut grants = Vec::new();
        let mut ids = Vec::new();
        for name in ["one", "two", "three"] {
            let queued = job(name);
            ids.push(queued.id);
            if let Admission::Queued { grant, .. } = store.admit(queued) {
                grants.push(grant);
            }
        }

        let change = store.release_slot(active_id);
        assert_eq!(change.promoted, Some(ids[0]));
        assert_eq!(change.shifted, vec![(ids[1], 1), (ids[2], 2)]);
        assert!(grants[0].try_recv().is_ok());
        assert_eq!(store.get(ids[0]).map(|job| job.phase), Some(JobPhase::Connecting));
        assert_eq!(store.get(ids[0]).and_then(|job| job.queue_position), None);

        assert!(store.release_slot(active_id).promoted.is_none());
    }

    #[test]
    fn promotion_skips_jobs_whose_task_is_gone() {
        let store = JobStore::new(10);
        let active = job("active");
        let active_id = active.id;
        let _ = store.admit(active);
        let orphan = job("orphan");
        let orphan_id = orphan.id;
        let live = job("live");
        let live_id = live.id;
        drop(store.admit(orphan));
        let _grant = store.admit(live);

        let change = store.release_slot(active_id);
        assert_eq!(change.promoted, Some(live_id));
        assert_eq!(store.get(orphan_id).map(|job| job.phase), Some(JobPhase::Error));
    }

    #[test]
    fn terminal_jobs_reject_updates_and_move_to_bounded_history() {
        let store = JobStore::new(1);
        let mut ids = Vec::new();
        for name in ["a", "b"] {
            let record = job(name);
            let id = record.id;
            ids.push(id);
            let _ = store.admit(record);
            let _ = store.transition(id, JobPhase::Cancelled);
            let _ = store.release_slot(id);
        }
        assert!(store.transition(ids[0], JobPhase::Downloading).is_none());
        assert!(store.update(ids[0], |job| job.name = "renamed".into()).is_none());
        assert!(store.fail(ids[0], "late".into()).is_none());

        assert!(store.evict(ids[0]));
        assert!(store.evict(ids[1]));
        let listing = store.listing();
        assert!(listing.active.is_empty());
        assert_eq!(listing.history.len(), 1);
        assert_eq!(listing.history[0].id, ids[1]);
        assert!(store.get(ids[0]).is_none());
    }
}
