//! Generation Service
//!
//! The request-facing side of the pipeline:
//! upload -> canonicalize -> fingerprint -> cache lookup -> (job + queue) or hit.
//! It never waits for a backend call; workers do that.

use super::notifier::{self, StatusEvent};
use super::queue::{InFlight, WorkItem, WorkQueue};
use super::store::JobStore;
use super::types::*;
use crate::canonical::{CanonicalImage, Fingerprint, canonicalize};
use crate::error::{PipelineError, PipelineResult, StoreError};
use crate::storage::artifacts::ArtifactStore;
use crate::storage::cache::ArtifactCache;

use futures_util::Stream;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, broadcast};

/// Error text stored on jobs that a restart interrupted.
pub const INTERRUPTED_ERROR: &str = "generation interrupted by a service restart";

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Uploads above this size are rejected before decoding.
    pub max_upload_bytes: usize,
    /// A `Started` job older than this is reconciled against the cache on read.
    pub stale_after: Duration,
    /// Liveness interval of status streams.
    pub heartbeat: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_upload_bytes: 15 * 1024 * 1024,
            stale_after: Duration::from_secs(600),
            heartbeat: Duration::from_secs(15),
        }
    }
}

/// Result of a job submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// A previous job already produced this artifact.
    Cached { artifact_ref: String },
    /// A new job was created and queued.
    Queued { job_id: JobId },
    /// The same content is already being generated by this job.
    InFlight { job_id: JobId },
}

/// Counts from the startup recovery pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryReport {
    pub reconciled: usize,
    pub requeued: usize,
    pub failed: usize,
}

pub struct GenerationService {
    jobs: Arc<dyn JobStore>,
    cache: Arc<ArtifactCache>,
    artifacts: Arc<ArtifactStore>,
    queue: Arc<WorkQueue>,
    in_flight: Arc<InFlight>,
    settings: PipelineSettings,
    /// Serializes the marker check -> job create -> marker insert sequence,
    /// so two uploads of the same content cannot both start a job.
    submit_lock: Mutex<()>,
}

impl GenerationService {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        cache: Arc<ArtifactCache>,
        artifacts: Arc<ArtifactStore>,
        queue: Arc<WorkQueue>,
        in_flight: Arc<InFlight>,
        settings: PipelineSettings,
    ) -> Arc<Self> {
        Arc::new(Self {
            jobs,
            cache,
            artifacts,
            queue,
            in_flight,
            settings,
            submit_lock: Mutex::new(()),
        })
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Accepts an upload.
    ///
    /// Input errors are returned before any state is created. On a cache
    /// miss the job record is durable before this returns.
    pub async fn submit(&self, raw: Vec<u8>) -> PipelineResult<Submission> {
        let max = self.settings.max_upload_bytes;
        if raw.len() > max {
            return Err(PipelineError::TooLarge {
                size: raw.len(),
                limit: max,
            });
        }

        // Decoding is CPU-bound; keep it off the async workers.
        let canonical = tokio::task::spawn_blocking(move || canonicalize(&raw, max))
            .await
            .map_err(|e| PipelineError::InvalidInput(format!("decode aborted: {}", e)))??;

        self.submit_canonical(canonical).await
    }

    async fn submit_canonical(&self, canonical: CanonicalImage) -> PipelineResult<Submission> {
        let CanonicalImage {
            bytes, fingerprint, ..
        } = canonical;

        if let Some(artifact_ref) = self.cache.lookup(&fingerprint) {
            tracing::info!("Cache hit for {} -> {}", fingerprint.short(), artifact_ref);
            return Ok(Submission::Cached { artifact_ref });
        }

        let _guard = self.submit_lock.lock().await;

        if let Some(job_id) = self.in_flight.get(&fingerprint) {
            tracing::info!(
                "Fingerprint {} already in flight as job {}",
                fingerprint.short(),
                job_id
            );
            return Ok(Submission::InFlight { job_id });
        }

        // A worker may have finished this fingerprint while we waited.
        if let Some(artifact_ref) = self.cache.lookup(&fingerprint) {
            return Ok(Submission::Cached { artifact_ref });
        }

        let permit = self.queue.try_reserve()?;

        // Restart recovery requeues a `Queued` job from this copy.
        if let Err(e) = self.artifacts.store_upload(&fingerprint, &bytes).await {
            tracing::warn!(
                "Could not keep input copy for {}: {}",
                fingerprint.short(),
                e
            );
        }
        let record = self.jobs.create(fingerprint.clone()).await?;
        self.in_flight.insert(fingerprint.clone(), record.id.clone());

        tracing::info!(
            "Cache miss for {}: queued job {} (queue depth {}/{})",
            fingerprint.short(),
            record.id,
            self.queue.depth(),
            self.queue.capacity()
        );

        permit.send(WorkItem {
            job_id: record.id.clone(),
            fingerprint,
            image: bytes,
        });

        Ok(Submission::Queued { job_id: record.id })
    }

    /// Current state of a job (the poll operation).
    ///
    /// A job stuck in `Started` past the grace period is re-derived as
    /// `Finished` when the cache already holds its fingerprint: the cache
    /// write happens before the job's terminal write, so this repairs a crash
    /// between the two.
    pub async fn status(&self, job_id: &JobId) -> PipelineResult<JobRecord> {
        let record = self
            .jobs
            .get(job_id)
            .ok_or_else(|| PipelineError::NotFound(format!("job {}", job_id)))?;

        if record.state != JobState::Started {
            return Ok(record);
        }
        let age = now_ms().saturating_sub(record.updated_at);
        if age < self.settings.stale_after.as_millis() as u64 {
            return Ok(record);
        }
        match self.cache.lookup(&record.fingerprint) {
            Some(artifact_ref) => self.reconcile(record, artifact_ref).await,
            None => Ok(record),
        }
    }

    async fn reconcile(&self, record: JobRecord, artifact_ref: String) -> PipelineResult<JobRecord> {
        tracing::warn!(
            "Job {} stuck in {}; cache has {}, marking finished",
            record.id,
            record.state.label(),
            artifact_ref
        );
        match self
            .jobs
            .transition(&record.id, JobState::Finished { artifact_ref })
            .await
        {
            Ok(updated) => {
                self.in_flight.release(&updated.fingerprint, &updated.id);
                Ok(updated)
            }
            // Someone else moved it first; report what is stored now.
            Err(StoreError::InvalidTransition { .. }) => self
                .jobs
                .get(&record.id)
                .ok_or_else(|| PipelineError::NotFound(format!("job {}", record.id))),
            Err(e) => Err(e.into()),
        }
    }

    /// Opens a live status session (the stream operation).
    pub fn watch(
        self: &Arc<Self>,
        job_id: &JobId,
    ) -> PipelineResult<impl Stream<Item = StatusEvent> + Send + use<>> {
        if self.jobs.get(job_id).is_none() {
            return Err(PipelineError::NotFound(format!("job {}", job_id)));
        }
        Ok(notifier::watch(
            self.clone(),
            job_id.clone(),
            self.settings.heartbeat,
        ))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobId> {
        self.jobs.subscribe()
    }

    /// Brings non-terminal jobs left by a previous process to a consistent
    /// state. Must run after the workers are started, since it may queue work.
    ///
    /// - cache already has the fingerprint: finish the job with that artifact;
    /// - still `Queued` and the input copy exists: queue it again;
    /// - otherwise: fail it with [`INTERRUPTED_ERROR`].
    pub async fn recover(&self) -> PipelineResult<RecoveryReport> {
        let mut report = RecoveryReport::default();

        for record in self.jobs.unfinished() {
            if let Some(artifact_ref) = self.cache.lookup(&record.fingerprint) {
                self.step_to(&record, JobState::Finished { artifact_ref }).await?;
                report.reconciled += 1;
                continue;
            }

            if record.state == JobState::Queued
                && self.in_flight.get(&record.fingerprint).is_none()
                && let Some(image) = self.artifacts.load_upload(&record.fingerprint).await
            {
                self.in_flight
                    .insert(record.fingerprint.clone(), record.id.clone());
                self.queue
                    .push(WorkItem {
                        job_id: record.id.clone(),
                        fingerprint: record.fingerprint.clone(),
                        image,
                    })
                    .await?;
                report.requeued += 1;
                continue;
            }

            self.step_to(
                &record,
                JobState::Failed {
                    error: INTERRUPTED_ERROR.to_string(),
                },
            )
            .await?;
            report.failed += 1;
        }

        if report != RecoveryReport::default() {
            tracing::info!(
                "Recovery: {} reconciled, {} requeued, {} failed",
                report.reconciled,
                report.requeued,
                report.failed
            );
        }
        Ok(report)
    }

    /// Walks a job forward to a terminal state through `Started`.
    async fn step_to(&self, record: &JobRecord, terminal: JobState) -> PipelineResult<()> {
        if record.state == JobState::Queued {
            self.jobs.transition(&record.id, JobState::Started).await?;
        }
        self.jobs.transition(&record.id, terminal).await?;
        Ok(())
    }

    /// Fingerprints currently being generated.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    pub fn lookup_cached(&self, fingerprint: &Fingerprint) -> Option<String> {
        self.cache.lookup(fingerprint)
    }
}
