use super::engine::Catalog;
use super::types::{
    AvailableModelsResponse, GenerateModelRequest, GenerateModelResponse, HealthResponse,
};
use crate::error::{PipelineError, PipelineResult};
use crate::jobs::handlers::model_response;
use crate::jobs::service::GenerationService;
use crate::jobs::types::now_ms;

use axum::extract::Path;
use axum::response::Response;
use axum::{Extension, Json};
use std::sync::Arc;

pub const ENDPOINT_GENERATE_MODEL: &str = "/generate-model";
pub const ENDPOINT_AVAILABLE_MODELS: &str = "/available-models";
pub const ENDPOINT_MODEL: &str = "/models/:name";
pub const ENDPOINT_HEALTH: &str = "/health";

pub async fn handle_generate_model(
    Extension(catalog): Extension<Arc<Catalog>>,
    Json(req): Json<GenerateModelRequest>,
) -> PipelineResult<Json<GenerateModelResponse>> {
    let entry = catalog.best_match(&req.prompt).ok_or_else(|| {
        PipelineError::NotFound(format!("no catalog model matches {:?}", req.prompt))
    })?;

    tracing::info!("Prompt {:?} -> {}", req.prompt, entry.file_name);
    Ok(Json(GenerateModelResponse {
        status: "success".to_string(),
        model_url: format!("/models/{}", entry.file_name),
        model_filename: entry.file_name.clone(),
        prompt: req.prompt,
        x: req.x,
        z: req.z,
    }))
}

pub async fn handle_available_models(
    Extension(catalog): Extension<Arc<Catalog>>,
) -> Json<AvailableModelsResponse> {
    Json(AvailableModelsResponse {
        models: catalog.listing(),
        count: catalog.len(),
    })
}

pub async fn handle_get_model(
    Extension(catalog): Extension<Arc<Catalog>>,
    Path(name): Path<String>,
) -> PipelineResult<Response> {
    let (name, bytes) = catalog.load_model(&name).await?;
    Ok(model_response(&name, bytes))
}

pub async fn handle_health(
    Extension(catalog): Extension<Arc<Catalog>>,
    Extension(service): Extension<Arc<GenerationService>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: now_ms(),
        models_loaded: catalog.len(),
        jobs_in_flight: service.in_flight_count(),
        cached_artifacts: service.cached_count(),
    })
}
