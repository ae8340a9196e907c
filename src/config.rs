//! Process configuration from command-line flags, with `MESHFORGE_*`
//! environment fallbacks.

use crate::jobs::service::PipelineSettings;

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Meshforge - prompt and image to 3D model service
#[derive(Parser, Debug, Clone)]
#[command(name = "meshforge")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// HTTP listen address
    #[arg(long, env = "MESHFORGE_BIND", default_value = "127.0.0.1:8000")]
    pub bind: SocketAddr,

    /// Root for the job table, cache table, uploads and generated models
    #[arg(long, env = "MESHFORGE_DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Directory of static catalog models
    #[arg(long, env = "MESHFORGE_MODELS_DIR", default_value = "./models")]
    pub models_dir: PathBuf,

    /// Endpoint of the external generation backend
    #[arg(
        long,
        env = "MESHFORGE_BACKEND_URL",
        default_value = "http://127.0.0.1:8001/generate"
    )]
    pub backend_url: String,

    /// Upper bound for one backend call, in seconds
    #[arg(long, env = "MESHFORGE_BACKEND_TIMEOUT_SECS", default_value_t = 300)]
    pub backend_timeout_secs: u64,

    /// Largest accepted upload, in bytes
    #[arg(long, env = "MESHFORGE_MAX_UPLOAD_BYTES", default_value_t = 15 * 1024 * 1024)]
    pub max_upload_bytes: usize,

    /// Number of generation workers
    #[arg(long, env = "MESHFORGE_WORKERS", default_value_t = 2)]
    pub workers: usize,

    /// Jobs that may wait for a worker before uploads are refused
    #[arg(long, env = "MESHFORGE_QUEUE_CAPACITY", default_value_t = 32)]
    pub queue_capacity: usize,

    /// Liveness interval of status streams, in seconds
    #[arg(long, env = "MESHFORGE_HEARTBEAT_SECS", default_value_t = 15)]
    pub heartbeat_secs: u64,

    /// Age after which a started job is checked against the cache, in seconds
    #[arg(long, env = "MESHFORGE_STALE_AFTER_SECS", default_value_t = 600)]
    pub stale_after_secs: u64,

    /// Emit logs as JSON lines
    #[arg(long, env = "MESHFORGE_LOG_JSON")]
    pub log_json: bool,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("--{0} must be greater than zero")]
    Zero(&'static str),

    #[error("--backend-url must be an http(s) URL, got {0:?}")]
    BackendUrl(String),

    /// A job could be reconciled from the cache while its worker is still
    /// inside the backend call.
    #[error("--stale-after-secs ({stale_after}) must exceed --backend-timeout-secs ({timeout})")]
    StaleBeforeTimeout { stale_after: u64, timeout: u64 },
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("workers", self.workers as u64),
            ("queue-capacity", self.queue_capacity as u64),
            ("heartbeat-secs", self.heartbeat_secs),
            ("backend-timeout-secs", self.backend_timeout_secs),
            ("max-upload-bytes", self.max_upload_bytes as u64),
        ];
        if let Some((flag, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Zero(*flag));
        }

        if !(self.backend_url.starts_with("http://") || self.backend_url.starts_with("https://"))
        {
            return Err(ConfigError::BackendUrl(self.backend_url.clone()));
        }

        if self.stale_after_secs <= self.backend_timeout_secs {
            return Err(ConfigError::StaleBeforeTimeout {
                stale_after: self.stale_after_secs,
                timeout: self.backend_timeout_secs,
            });
        }
        Ok(())
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend_timeout_secs)
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            max_upload_bytes: self.max_upload_bytes,
            stale_after: Duration::from_secs(self.stale_after_secs),
            heartbeat: Duration::from_secs(self.heartbeat_secs),
        }
    }
}
