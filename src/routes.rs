//! HTTP router: every endpoint, its shared state and the request layers.

use crate::catalog::engine::Catalog;
use crate::catalog::handlers::*;
use crate::jobs::handlers::*;
use crate::jobs::protocol::*;
use crate::jobs::service::GenerationService;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::Extension,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Builds the application router.
///
/// Request bodies are capped at the upload limit; an upload cut off there is
/// answered with the same JSON 413 as one the pipeline rejects itself. CORS is
/// permissive since the clients are browser front ends served from other
/// origins.
pub fn router(service: Arc<GenerationService>, catalog: Arc<Catalog>) -> Router {
    let body_limit = service.settings().max_upload_bytes;

    Router::new()
        .route(ENDPOINT_SUBMIT_JOB, post(handle_submit_job))
        .route(ENDPOINT_JOB_STATUS, get(handle_job_status))
        .route(ENDPOINT_JOB_EVENTS, get(handle_job_events))
        .route(ENDPOINT_ARTIFACT, get(handle_get_artifact))
        .route(ENDPOINT_GENERATE_MODEL, post(handle_generate_model))
        .route(ENDPOINT_AVAILABLE_MODELS, get(handle_available_models))
        .route(ENDPOINT_MODEL, get(handle_get_model))
        .route(ENDPOINT_HEALTH, get(handle_health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(Extension(service))
        .layer(Extension(catalog))
        .layer(CorsLayer::permissive())
}
