//! HTTP Protocol Definitions
//!
//! Endpoints and response bodies of the job API.

use super::service::Submission;
use super::types::*;
use serde::{Deserialize, Serialize};

pub const ENDPOINT_SUBMIT_JOB: &str = "/jobs";
pub const ENDPOINT_JOB_STATUS: &str = "/jobs/:id";
pub const ENDPOINT_JOB_EVENTS: &str = "/jobs/:id/events";
pub const ENDPOINT_ARTIFACT: &str = "/artifacts/:name";

/// Public URL prefix of generated artifacts.
pub const ARTIFACT_URL_PREFIX: &str = "/artifacts";

/// Name of the SSE event carrying a status update.
pub const STATUS_EVENT: &str = "status";

pub fn artifact_url(artifact_ref: &str) -> String {
    format!("{}/{}", ARTIFACT_URL_PREFIX, artifact_ref)
}

/// Body of `POST /jobs`: either an immediate cache hit or a job handle.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SubmitJobResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_url: Option<String>,
    /// `cache`, `queued` or `in_flight`.
    pub source: String,
}

impl From<Submission> for SubmitJobResponse {
    fn from(submission: Submission) -> Self {
        match submission {
            Submission::Cached { artifact_ref } => Self {
                job_id: None,
                artifact_url: Some(artifact_url(&artifact_ref)),
                artifact_ref: Some(artifact_ref),
                source: "cache".to_string(),
            },
            Submission::Queued { job_id } => Self {
                job_id: Some(job_id.0),
                artifact_ref: None,
                artifact_url: None,
                source: "queued".to_string(),
            },
            Submission::InFlight { job_id } => Self {
                job_id: Some(job_id.0),
                artifact_ref: None,
                artifact_url: None,
                source: "in_flight".to_string(),
            },
        }
    }
}

/// Body of `GET /jobs/:id` and data of each `status` SSE event.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl From<&JobRecord> for JobStatusResponse {
    fn from(record: &JobRecord) -> Self {
        Self {
            job_id: record.id.0.clone(),
            status: record.state.label().to_string(),
            artifact_ref: record.artifact_ref().map(str::to_string),
            artifact_url: record.artifact_ref().map(artifact_url),
            error: record.error().map(str::to_string),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}
