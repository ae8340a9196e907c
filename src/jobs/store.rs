//! Job Store
//!
//! The single source of truth for job state, read by pollers, streamers and
//! workers alike. Transitions are validated against the forward-only state
//! machine, persisted, and then announced on a broadcast channel.

use super::types::*;
use crate::canonical::Fingerprint;
use crate::error::StoreError;
use crate::storage::memory::DurableMap;

use async_trait::async_trait;
use std::path::Path;
use tokio::sync::{Mutex, broadcast};

/// Capacity of the transition broadcast. Slow subscribers that fall further
/// behind get `Lagged` and simply re-read the store.
const EVENT_CAPACITY: usize = 256;

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Creates a `Queued` job. Returns only after the record is durable.
    async fn create(&self, fingerprint: Fingerprint) -> Result<JobRecord, StoreError>;

    fn get(&self, id: &JobId) -> Option<JobRecord>;

    /// Moves `id` to `next` if that is a legal forward step.
    async fn transition(&self, id: &JobId, next: JobState) -> Result<JobRecord, StoreError>;

    /// Jobs not yet `Finished`/`Failed`.
    fn unfinished(&self) -> Vec<JobRecord>;

    /// Receives the id of every job whose state changed.
    fn subscribe(&self) -> broadcast::Receiver<JobId>;
}

/// `JobStore` over a [`DurableMap`]: in-memory for tests, directory-backed in
/// production.
pub struct JobTable {
    jobs: DurableMap<JobId, JobRecord>,
    /// Serializes check-then-write of transitions. Held only for the
    /// duration of one record write.
    write_lock: Mutex<()>,
    events: broadcast::Sender<JobId>,
}

impl JobTable {
    pub fn in_memory() -> Self {
        Self::with_map(DurableMap::in_memory())
    }

    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        Ok(Self::with_map(DurableMap::open(dir).await?))
    }

    fn with_map(jobs: DurableMap<JobId, JobRecord>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            jobs,
            write_lock: Mutex::new(()),
            events,
        }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[async_trait]
impl JobStore for JobTable {
    async fn create(&self, fingerprint: Fingerprint) -> Result<JobRecord, StoreError> {
        let record = JobRecord::new(fingerprint);
        self.jobs.put(record.id.clone(), record.clone()).await?;
        tracing::info!(
            "Created job {} for fingerprint {}",
            record.id,
            record.fingerprint.short()
        );
        Ok(record)
    }

    fn get(&self, id: &JobId) -> Option<JobRecord> {
        self.jobs.get(id)
    }

    async fn transition(&self, id: &JobId, next: JobState) -> Result<JobRecord, StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut record = self
            .jobs
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if !record.state.can_transition_to(&next) {
            tracing::warn!(
                "Rejected transition for job {}: {} -> {}",
                id,
                record.state.label(),
                next.label()
            );
            return Err(StoreError::InvalidTransition {
                id: id.to_string(),
                from: record.state.label(),
                to: next.label(),
            });
        }

        tracing::debug!(
            "Job {}: {} -> {}",
            id,
            record.state.label(),
            next.label()
        );
        record.state = next;
        record.updated_at = now_ms();
        self.jobs.put(id.clone(), record.clone()).await?;

        // No subscribers is fine.
        let _ = self.events.send(id.clone());
        Ok(record)
    }

    fn unfinished(&self) -> Vec<JobRecord> {
        let mut jobs: Vec<JobRecord> = self
            .jobs
            .values()
            .into_iter()
            .filter(|job| !job.state.is_terminal())
            .collect();
        jobs.sort_by_key(|job| job.created_at);
        jobs
    }

    fn subscribe(&self) -> broadcast::Receiver<JobId> {
        self.events.subscribe()
    }
}
