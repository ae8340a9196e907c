//! Error Taxonomy
//!
//! Every fallible operation in the pipeline returns [`PipelineResult`].
//! Input errors surface synchronously to the caller; backend and storage errors
//! raised inside a worker are recorded on the job instead.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Result alias used across the crate.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Upper bound (in characters) for error text stored on a failed job.
pub const MAX_ERROR_LEN: usize = 512;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Upload larger than the configured ceiling. `size` is a lower bound when
    /// the body was cut off before its end.
    #[error("upload of at least {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },

    /// Upload is not a decodable image.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("generation backend failed: {0}")]
    Backend(#[from] BackendError),

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),

    /// The work queue has no free slot.
    #[error("generation queue is full, retry later")]
    Busy,
}

/// Failure kinds of the external generation call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("backend timed out after {0:?}")]
    Timeout(Duration),

    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("backend returned unusable output: {0}")]
    Malformed(String),

    #[error("backend unreachable: {0}")]
    Transport(String),
}

/// Failures of the durable job/cache tables.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("job {0} not found")]
    NotFound(String),

    #[error("illegal transition for job {id}: {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: &'static str,
        to: &'static str,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("record encoding error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl StoreError {
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

/// Cuts `message` down to [`MAX_ERROR_LEN`] characters, keeping it non-empty.
pub fn truncate_error(message: &str) -> String {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return "unknown error".to_string();
    }
    if trimmed.chars().count() <= MAX_ERROR_LEN {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(MAX_ERROR_LEN - 3).collect();
    out.push_str("...");
    out
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl PipelineError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PipelineError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            PipelineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            PipelineError::NotFound(_) => StatusCode::NOT_FOUND,
            PipelineError::Backend(_) => StatusCode::BAD_GATEWAY,
            PipelineError::Storage(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            PipelineError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PipelineError::Busy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
