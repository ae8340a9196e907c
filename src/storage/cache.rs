use super::memory::DurableMap;
use crate::canonical::Fingerprint;
use crate::error::StoreError;

use serde::{Deserialize, Serialize};
use std::path::Path;

/// One cached generation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub artifact_ref: String,
    pub created_at: u64,
}

/// Fingerprint -> artifact reference table.
///
/// Consulted synchronously by the submission path before any work is queued,
/// written only by a worker after a successful generation. There is no delete:
/// eviction, if ever needed, belongs in a layer on top of this type.
pub struct ArtifactCache {
    entries: DurableMap<Fingerprint, CacheEntry>,
}

impl ArtifactCache {
    pub fn in_memory() -> Self {
        Self {
            entries: DurableMap::in_memory(),
        }
    }

    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        Ok(Self {
            entries: DurableMap::open(dir).await?,
        })
    }

    /// Pure read, never waits on generation work.
    pub fn lookup(&self, fingerprint: &Fingerprint) -> Option<String> {
        self.entries
            .get(fingerprint)
            .map(|entry| entry.artifact_ref)
    }

    /// Idempotent upsert. Two workers finishing the same fingerprint both
    /// write a complete record; the last rename wins.
    pub async fn put(
        &self,
        fingerprint: Fingerprint,
        artifact_ref: String,
    ) -> Result<(), StoreError> {
        tracing::debug!(
            "Caching artifact {} for fingerprint {}",
            artifact_ref,
            fingerprint.short()
        );
        self.entries
            .put(
                fingerprint,
                CacheEntry {
                    artifact_ref,
                    created_at: crate::jobs::types::now_ms(),
                },
            )
            .await
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
