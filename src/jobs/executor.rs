//! Worker Pool Implementation
//!
//! Drains the `WorkQueue` with a fixed number of tokio tasks. Each item is one
//! job, processed strictly in order:
//! `Queued -> Started -> (backend call) -> Finished | Failed`.
//!
//! ## Responsibilities
//! - **Claiming**: Moves the job to `Started` before any real work.
//! - **Execution**: Calls the backend under a timeout, in its own task so a panic
//!   becomes a failed job instead of a dead worker.
//! - **Publishing**: Stores the model, writes the cache entry, then finishes the job.

use super::backend::{GenerationBackend, validate_model};
use super::queue::{InFlight, WorkItem, WorkQueue};
use super::store::JobStore;
use super::types::*;
use crate::canonical::Fingerprint;
use crate::error::{BackendError, StoreError, truncate_error};
use crate::storage::artifacts::ArtifactStore;
use crate::storage::cache::ArtifactCache;

use std::sync::Arc;
use std::time::Duration;

/// The engine that drives generation jobs.
pub struct GenerationWorker {
    queue: Arc<WorkQueue>,
    jobs: Arc<dyn JobStore>,
    cache: Arc<ArtifactCache>,
    artifacts: Arc<ArtifactStore>,
    backend: Arc<dyn GenerationBackend>,
    in_flight: Arc<InFlight>,
    backend_timeout: Duration,
    /// Number of concurrent worker tasks.
    worker_count: usize,
}

impl GenerationWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        queue: Arc<WorkQueue>,
        jobs: Arc<dyn JobStore>,
        cache: Arc<ArtifactCache>,
        artifacts: Arc<ArtifactStore>,
        backend: Arc<dyn GenerationBackend>,
        in_flight: Arc<InFlight>,
        backend_timeout: Duration,
        worker_count: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            queue,
            jobs,
            cache,
            artifacts,
            backend,
            in_flight,
            backend_timeout,
            worker_count,
        })
    }

    /// Spawns the worker tasks and returns immediately.
    pub fn start(self: Arc<Self>) -> Vec<tokio::task::JoinHandle<()>> {
        tracing::info!("Starting {} generation workers", self.worker_count);

        (0..self.worker_count)
            .map(|worker_id| {
                let worker = self.clone();
                tokio::spawn(async move {
                    worker.worker_loop(worker_id).await;
                })
            })
            .collect()
    }

    async fn worker_loop(&self, worker_id: usize) {
        tracing::debug!("Worker {} started", worker_id);

        while let Some(item) = self.queue.next().await {
            tracing::info!(
                "Worker {} picked job {} (fp {})",
                worker_id,
                item.job_id,
                item.fingerprint.short()
            );
            self.process(item).await;
        }

        tracing::debug!("Worker {} stopped: queue closed", worker_id);
    }

    /// Runs one job to a terminal state.
    pub async fn process(&self, item: WorkItem) {
        let WorkItem {
            job_id,
            fingerprint,
            image,
        } = item;

        if let Err(e) = self.jobs.transition(&job_id, JobState::Started).await {
            tracing::error!("Cannot start job {}: {}", job_id, e);
            self.in_flight.release(&fingerprint, &job_id);
            return;
        }

        let outcome = match self.call_backend(image).await {
            Ok(model) => self.publish(&job_id, &fingerprint, &model).await,
            Err(e) => Err(e.to_string()),
        };

        let next = match outcome {
            Ok(artifact_ref) => JobState::Finished { artifact_ref },
            Err(message) => {
                tracing::warn!("Job {} failed: {}", job_id, message);
                JobState::Failed {
                    error: truncate_error(&message),
                }
            }
        };

        match self.jobs.transition(&job_id, next).await {
            Ok(record) => {
                tracing::info!("Job {} {}", job_id, record.state.label());
            }
            Err(StoreError::InvalidTransition { from, .. }) => {
                tracing::warn!(
                    "Job {} was already settled as {}; outcome discarded",
                    job_id,
                    from
                );
            }
            Err(e) => {
                tracing::error!("Failed to record outcome of job {}: {}", job_id, e);
            }
        }

        self.in_flight.release(&fingerprint, &job_id);
    }

    async fn call_backend(&self, image: Vec<u8>) -> Result<Vec<u8>, BackendError> {
        let backend = self.backend.clone();
        let mut call = tokio::spawn(async move { backend.generate(image).await });

        let model = match tokio::time::timeout(self.backend_timeout, &mut call).await {
            Ok(Ok(result)) => result?,
            Ok(Err(join_error)) => {
                return Err(BackendError::Malformed(format!(
                    "backend call aborted: {}",
                    join_error
                )));
            }
            Err(_) => {
                call.abort();
                return Err(BackendError::Timeout(self.backend_timeout));
            }
        };

        validate_model(&model)?;
        Ok(model)
    }

    /// Stores the model and its cache entry. Returns the artifact reference.
    async fn publish(
        &self,
        job_id: &JobId,
        fingerprint: &Fingerprint,
        model: &[u8],
    ) -> Result<String, String> {
        let artifact_ref = self
            .artifacts
            .store_model(fingerprint, model)
            .await
            .map_err(|e| format!("storing artifact: {}", e))?;

        self.cache
            .put(fingerprint.clone(), artifact_ref.clone())
            .await
            .map_err(|e| format!("writing cache entry: {}", e))?;

        tracing::debug!("Job {} published {}", job_id, artifact_ref);
        Ok(artifact_ref)
    }
}
