use crate::canonical::Fingerprint;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque job handle (UUID v4).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    /// Only canonical UUIDs are accepted, so a job id is always safe to use
    /// as a file name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(uuid::Uuid::parse_str(s)?.to_string()))
    }
}

/// Lifecycle of a job. Moves forward only:
/// `Queued -> Started -> Finished | Failed`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Started,
    Finished { artifact_ref: String },
    Failed { error: String },
}

impl JobState {
    pub fn label(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Started => "started",
            JobState::Finished { .. } => "finished",
            JobState::Failed { .. } => "failed",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            JobState::Queued => 0,
            JobState::Started => 1,
            JobState::Finished { .. } | JobState::Failed { .. } => 2,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.rank() == 2
    }

    /// Whether `next` is exactly one step forward from `self`.
    pub fn can_transition_to(&self, next: &JobState) -> bool {
        next.rank() == self.rank() + 1
    }
}

/// The durable record of one generation attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobRecord {
    pub id: JobId,
    /// Fingerprint of the input this job generates for.
    pub fingerprint: Fingerprint,
    #[serde(flatten)]
    pub state: JobState,
    /// Timestamp (ms) when the job was created.
    pub created_at: u64,
    /// Timestamp (ms) of the last state change.
    pub updated_at: u64,
}

impl JobRecord {
    pub fn new(fingerprint: Fingerprint) -> Self {
        let now = now_ms();
        Self {
            id: JobId::new(),
            fingerprint,
            state: JobState::Queued,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn artifact_ref(&self) -> Option<&str> {
        match &self.state {
            JobState::Finished { artifact_ref } => Some(artifact_ref),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            JobState::Failed { error } => Some(error),
            _ => None,
        }
    }
}

/// Helper to get the current system time in milliseconds.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
