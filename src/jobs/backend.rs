//! External Generation Backend
//!
//! The model generator is an opaque call: canonical PNG bytes in, binary glTF
//! bytes out, or an error. The worker bounds every call with its own timeout.

use crate::error::BackendError;

use async_trait::async_trait;
use std::time::Duration;

/// Magic header of a binary glTF (`.glb`) file.
pub const GLB_MAGIC: &[u8; 4] = b"glTF";

/// Longest backend response body kept in an error message.
const MAX_BODY_SNIPPET: usize = 256;

#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(&self, image_png: Vec<u8>) -> Result<Vec<u8>, BackendError>;
}

/// Checks that backend output looks like a GLB payload.
pub fn validate_model(bytes: &[u8]) -> Result<(), BackendError> {
    if bytes.is_empty() {
        return Err(BackendError::Malformed("empty response body".to_string()));
    }
    if !bytes.starts_with(GLB_MAGIC) {
        return Err(BackendError::Malformed(
            "response is not a binary glTF file".to_string(),
        ));
    }
    Ok(())
}

/// Posts the image to an HTTP endpoint and returns the response body.
pub struct HttpBackend {
    url: String,
    timeout: Duration,
    http_client: reqwest::Client,
}

impl HttpBackend {
    /// `timeout` bounds the whole request at the transport level as well.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        Ok(Self {
            url: url.into(),
            timeout,
            http_client,
        })
    }
}

#[async_trait]
impl GenerationBackend for HttpBackend {
    async fn generate(&self, image_png: Vec<u8>) -> Result<Vec<u8>, BackendError> {
        tracing::debug!(
            "POST {} ({} bytes of image data)",
            self.url,
            image_png.len()
        );

        let response = self
            .http_client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "image/png")
            .body(image_png)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::Timeout(self.timeout)
                } else {
                    BackendError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_BODY_SNIPPET).collect(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| BackendError::Malformed(format!("failed to read body: {}", e)))?;
        Ok(bytes.to_vec())
    }
}
