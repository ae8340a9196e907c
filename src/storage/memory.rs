use crate::error::StoreError;

use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

const RECORD_EXT: &str = "json";
const TMP_EXT: &str = "tmp";

/// A concurrent key-value table with optional on-disk durability.
///
/// Reads are served from the in-memory `DashMap` and never touch disk.
/// Writes go to disk first (temp file, fsync, rename over the record file) and
/// only then replace the in-memory value, so a concurrent reader observes
/// either the whole previous record or the whole new one.
pub struct DurableMap<K, V> {
    local_data: Arc<DashMap<K, V>>,
    dir: Option<PathBuf>,
}

impl<K, V> DurableMap<K, V>
where
    K: ToString + FromStr + Clone + Hash + Eq + Send + Sync,
    <K as FromStr>::Err: std::fmt::Display,
    V: Clone + Serialize + DeserializeOwned + Send + Sync,
{
    /// A table that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            local_data: Arc::new(DashMap::new()),
            dir: None,
        }
    }

    /// Opens (creating if needed) a table rooted at `dir` and loads every
    /// record found there.
    ///
    /// Leftover temp files from an interrupted write are removed. Records whose
    /// file name or body cannot be parsed are skipped with a warning.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::io(&dir, e))?;

        let local_data = Arc::new(DashMap::new());
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| StoreError::io(&dir, e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&dir, e))?
        {
            let path = entry.path();
            match path.extension().and_then(|ext| ext.to_str()) {
                Some(RECORD_EXT) => {}
                Some(TMP_EXT) => {
                    tracing::debug!("Removing interrupted write {}", path.display());
                    let _ = tokio::fs::remove_file(&path).await;
                    continue;
                }
                _ => continue,
            }

            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let key: K = match stem.parse() {
                Ok(k) => k,
                Err(e) => {
                    tracing::warn!("Skipping record {}: bad key ({})", path.display(), e);
                    continue;
                }
            };

            let raw = tokio::fs::read(&path)
                .await
                .map_err(|e| StoreError::io(&path, e))?;
            match serde_json::from_slice::<V>(&raw) {
                Ok(value) => {
                    local_data.insert(key, value);
                }
                Err(e) => {
                    tracing::warn!("Skipping record {}: {}", path.display(), e);
                }
            }
        }

        tracing::info!(
            "Loaded {} record(s) from {}",
            local_data.len(),
            dir.display()
        );

        Ok(Self {
            local_data,
            dir: Some(dir),
        })
    }

    pub fn is_durable(&self) -> bool {
        self.dir.is_some()
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.local_data.get(key).map(|value| value.clone())
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.local_data.contains_key(key)
    }

    /// Upserts `value` under `key`. Returns once the record is durable.
    pub async fn put(&self, key: K, value: V) -> Result<(), StoreError> {
        if let Some(dir) = &self.dir {
            let record = serde_json::to_vec_pretty(&value)?;
            write_atomically(dir, &key.to_string(), &record).await?;
        }
        self.local_data.insert(key, value);
        Ok(())
    }

    pub fn values(&self) -> Vec<V> {
        self.local_data
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.local_data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.local_data.is_empty()
    }
}

async fn write_atomically(dir: &Path, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
    let target = dir.join(format!("{}.{}", key, RECORD_EXT));
    // Unique temp name: two writers of the same key must not share a file.
    let tmp = dir.join(format!(
        "{}.{}.{}",
        key,
        uuid::Uuid::new_v4().simple(),
        TMP_EXT
    ));

    let mut file = tokio::fs::File::create(&tmp)
        .await
        .map_err(|e| StoreError::io(&tmp, e))?;
    file.write_all(bytes)
        .await
        .map_err(|e| StoreError::io(&tmp, e))?;
    file.sync_all().await.map_err(|e| StoreError::io(&tmp, e))?;
    drop(file);

    if let Err(e) = tokio::fs::rename(&tmp, &target).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(StoreError::io(&target, e));
    }

    tracing::trace!("Persisted record {}", target.display());
    Ok(())
}
