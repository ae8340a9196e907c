//! Status Notifier
//!
//! Live view of one job as a stream of events. The session re-reads the job
//! whenever the store announces a transition for it, and at least once per
//! heartbeat interval. It emits:
//! - `Status` only when the status label differs from the last one sent,
//! - `Heartbeat` when a whole interval passes without a change,
//! and ends right after the first terminal status.
//!
//! Peer disconnection drops the stream, which is the only cancellation path.

use super::service::GenerationService;
use super::types::{JobId, JobRecord};

use futures_util::Stream;
use futures_util::stream;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};

#[derive(Debug, Clone, PartialEq)]
pub enum StatusEvent {
    Status(JobRecord),
    Heartbeat,
}

struct Session {
    service: Arc<GenerationService>,
    job_id: JobId,
    events: broadcast::Receiver<JobId>,
    heartbeat: Duration,
    last_sent: Option<&'static str>,
    done: bool,
}

/// Opens a status session. The caller has already checked that the job
/// exists; if it vanishes the stream simply ends.
pub fn watch(
    service: Arc<GenerationService>,
    job_id: JobId,
    heartbeat: Duration,
) -> impl Stream<Item = StatusEvent> + Send + 'static {
    // Subscribe before the first read so no transition falls in between.
    let events = service.subscribe();
    let session = Session {
        service,
        job_id,
        events,
        heartbeat,
        last_sent: None,
        done: false,
    };

    tracing::debug!("Status session opened for job {}", session.job_id);
    stream::unfold(session, next_event)
}

async fn next_event(mut session: Session) -> Option<(StatusEvent, Session)> {
    if session.done {
        tracing::debug!("Status session closed for job {}", session.job_id);
        return None;
    }

    loop {
        let record = session.service.status(&session.job_id).await.ok()?;
        let label = record.state.label();
        if session.last_sent != Some(label) {
            session.last_sent = Some(label);
            session.done = record.state.is_terminal();
            return Some((StatusEvent::Status(record), session));
        }

        let woke = tokio::time::timeout(
            session.heartbeat,
            wait_for(&mut session.events, &session.job_id),
        )
        .await;
        if woke.is_err() {
            return Some((StatusEvent::Heartbeat, session));
        }
    }
}

/// Resolves when `job_id` is announced, or when announcements were lost and
/// the caller should re-read anyway.
async fn wait_for(events: &mut broadcast::Receiver<JobId>, job_id: &JobId) {
    loop {
        match events.recv().await {
            Ok(id) if &id == job_id => return,
            Ok(_) => continue,
            Err(RecvError::Lagged(_)) => return,
            // Store is gone: only the heartbeat re-read is left.
            Err(RecvError::Closed) => std::future::pending::<()>().await,
        }
    }
}
