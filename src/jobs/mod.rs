//! Generation Jobs Module
//!
//! Asynchronous image-to-model pipeline with content-addressed dedup.
//!
//! ## Architecture Overview
//! 1. **Submission**: `GenerationService` canonicalizes the upload and consults the
//!    `ArtifactCache`. A hit returns at once; nothing is queued.
//! 2. **Dedup**: On a miss, an in-flight marker per fingerprint makes concurrent uploads of the
//!    same content share one job.
//! 3. **Queueing**: A slot is reserved on the bounded `WorkQueue` before the job record is
//!    created, so a full queue rejects the upload without leaving a stray job behind.
//! 4. **Execution**: `GenerationWorker` tasks drain the queue and drive each job through
//!    `queued -> started -> finished | failed`.
//! 5. **Observation**: Clients poll the `JobStore` or hold a status stream that wakes on
//!    store transitions and sends heartbeats in between.
//!
//! ## Submodules
//! - **`types`**: Job id, state machine and record.
//! - **`store`**: `JobStore` trait and its `DurableMap`-backed implementation.
//! - **`queue`**: Bounded work queue and in-flight markers.
//! - **`backend`**: External generator abstraction and its HTTP client.
//! - **`executor`**: Worker pool.
//! - **`notifier`**: Status streams.
//! - **`service`**: Submission, polling, reconciliation and restart recovery.
//! - **`protocol`** / **`handlers`**: HTTP surface.

pub mod backend;
pub mod executor;
pub mod handlers;
pub mod notifier;
pub mod protocol;
pub mod queue;
pub mod service;
pub mod store;
pub mod types;
