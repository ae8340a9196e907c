use super::notifier::StatusEvent;
use super::protocol::*;
use super::service::{GenerationService, Submission};
use super::types::JobId;
use crate::error::{PipelineError, PipelineResult};
use crate::storage::artifacts::display_name;

use axum::body::Bytes;
use axum::extract::Path;
use axum::extract::rejection::BytesRejection;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use futures_util::{Stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;

/// Comment line sent as the SSE liveness marker.
const KEEP_ALIVE_TEXT: &str = "keep-alive";

pub async fn handle_submit_job(
    Extension(service): Extension<Arc<GenerationService>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> PipelineResult<(StatusCode, Json<SubmitJobResponse>)> {
    let body = body.map_err(|rejection| {
        body_rejection(rejection, &headers, service.settings().max_upload_bytes)
    })?;
    let submission = service.submit(body.to_vec()).await?;
    let status = match submission {
        Submission::Cached { .. } => StatusCode::OK,
        Submission::Queued { .. } | Submission::InFlight { .. } => StatusCode::ACCEPTED,
    };
    Ok((status, Json(submission.into())))
}

pub async fn handle_job_status(
    Extension(service): Extension<Arc<GenerationService>>,
    Path(job_id): Path<String>,
) -> PipelineResult<Json<JobStatusResponse>> {
    let job_id = parse_job_id(&job_id)?;
    let record = service.status(&job_id).await?;
    tracing::debug!("Job status query: {} -> {}", job_id, record.state.label());
    Ok(Json(JobStatusResponse::from(&record)))
}

pub async fn handle_job_events(
    Extension(service): Extension<Arc<GenerationService>>,
    Path(job_id): Path<String>,
) -> PipelineResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let job_id = parse_job_id(&job_id)?;
    let events = service.watch(&job_id)?.map(|event| Ok(to_sse(event)));

    // The session emits its own heartbeats; this only covers the gap before
    // the first event reaches the client.
    let keep_alive = KeepAlive::new()
        .interval(service.settings().heartbeat)
        .text(KEEP_ALIVE_TEXT);
    Ok(Sse::new(events).keep_alive(keep_alive))
}

pub async fn handle_get_artifact(
    Extension(service): Extension<Arc<GenerationService>>,
    Path(name): Path<String>,
) -> PipelineResult<Response> {
    let (name, bytes) = service.artifacts().load_model(&name).await?;
    Ok(model_response(&display_name(&name), bytes))
}

/// `application/octet-stream` download with an attachment file name.
pub fn model_response(file_name: &str, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        bytes,
    )
        .into_response()
}

pub(crate) fn to_sse(event: StatusEvent) -> Event {
    match event {
        StatusEvent::Status(record) => {
            let body = JobStatusResponse::from(&record);
            match serde_json::to_string(&body) {
                Ok(json) => Event::default().event(STATUS_EVENT).data(json),
                Err(e) => {
                    tracing::error!("Failed to encode status of job {}: {}", record.id, e);
                    Event::default().comment(KEEP_ALIVE_TEXT)
                }
            }
        }
        StatusEvent::Heartbeat => Event::default().comment(KEEP_ALIVE_TEXT),
    }
}

/// Maps a body that could not be buffered onto the pipeline's errors, so an
/// upload cut off by the body limit still gets the JSON error body.
fn body_rejection(rejection: BytesRejection, headers: &HeaderMap, limit: usize) -> PipelineError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        let declared = headers
            .get(header::CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<usize>().ok());
        return PipelineError::TooLarge {
            size: declared.unwrap_or(limit).max(limit.saturating_add(1)),
            limit,
        };
    }
    PipelineError::InvalidInput(rejection.body_text())
}

fn parse_job_id(raw: &str) -> PipelineResult<JobId> {
    raw.parse()
        .map_err(|_| PipelineError::NotFound(format!("job {}", raw)))
}
