//! Bounded Work Queue
//!
//! Hand-off between the submission path and the worker pool. The channel is
//! bounded, so a burst of uploads yields `Busy` instead of an unbounded number
//! of concurrent backend calls.

use super::types::JobId;
use crate::canonical::Fingerprint;
use crate::error::PipelineError;

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// One unit of generation work.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub job_id: JobId,
    pub fingerprint: Fingerprint,
    /// Canonical PNG bytes.
    pub image: Vec<u8>,
}

pub struct WorkQueue {
    sender: mpsc::Sender<WorkItem>,
    /// Shared by all workers; whoever holds the lock waits for the next item.
    receiver: Mutex<mpsc::Receiver<WorkItem>>,
    capacity: usize,
}

impl WorkQueue {
    pub fn new(capacity: usize) -> Arc<Self> {
        let (sender, receiver) = mpsc::channel(capacity);
        Arc::new(Self {
            sender,
            receiver: Mutex::new(receiver),
            capacity,
        })
    }

    /// Claims a free slot without blocking. Dropping the permit unused gives
    /// the slot back.
    pub fn try_reserve(&self) -> Result<mpsc::OwnedPermit<WorkItem>, PipelineError> {
        self.sender
            .clone()
            .try_reserve_owned()
            .map_err(|_| PipelineError::Busy)
    }

    /// Waits for a free slot. Used by the startup recovery pass only.
    pub async fn push(&self, item: WorkItem) -> Result<(), PipelineError> {
        self.sender.send(item).await.map_err(|_| PipelineError::Busy)
    }

    /// Next item, or `None` once every sender is gone.
    pub async fn next(&self) -> Option<WorkItem> {
        self.receiver.lock().await.recv().await
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Items waiting for a worker.
    pub fn depth(&self) -> usize {
        self.capacity - self.sender.capacity()
    }
}

/// Fingerprints with a job that has not reached a terminal state yet.
///
/// Lets a second upload of the same content attach to the running job
/// instead of starting another backend call.
#[derive(Default)]
pub struct InFlight {
    markers: DashMap<Fingerprint, JobId>,
}

impl InFlight {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn get(&self, fingerprint: &Fingerprint) -> Option<JobId> {
        self.markers.get(fingerprint).map(|id| id.clone())
    }

    pub fn insert(&self, fingerprint: Fingerprint, job_id: JobId) {
        self.markers.insert(fingerprint, job_id);
    }

    /// Clears the marker if it still points at `job_id`.
    pub fn release(&self, fingerprint: &Fingerprint, job_id: &JobId) {
        self.markers.remove_if(fingerprint, |_, owner| owner == job_id);
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}
