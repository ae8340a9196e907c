use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One static model and the keywords that select it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogEntry {
    pub file_name: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateModelRequest {
    pub prompt: String,
    /// Placement hints, echoed back untouched.
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub z: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct GenerateModelResponse {
    pub status: String,
    pub prompt: String,
    pub model_filename: String,
    pub model_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AvailableModelsResponse {
    /// File name -> keywords, in catalog order.
    pub models: IndexMap<String, Vec<String>>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub models_loaded: usize,
    pub jobs_in_flight: usize,
    pub cached_artifacts: usize,
}
