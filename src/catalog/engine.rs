use super::tokenizer::{keywords_for_file, normalize_keywords};
use super::types::CatalogEntry;
use crate::error::{PipelineResult, StoreError};
use crate::storage::artifacts::{MODEL_EXT, read_model, sanitize_name};

use indexmap::IndexMap;
use std::path::{Path, PathBuf};

/// Optional manifest inside the models directory: `{ "file.glb": ["kw", ...] }`.
pub const MANIFEST_FILE: &str = "catalog.json";

/// The static model catalog. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    dir: PathBuf,
}

impl Catalog {
    pub fn new(dir: impl Into<PathBuf>, entries: Vec<CatalogEntry>) -> Self {
        Self {
            entries,
            dir: dir.into(),
        }
    }

    /// Loads the catalog served from `dir`.
    ///
    /// Uses [`MANIFEST_FILE`] when present, keeping its order. Otherwise every
    /// `.glb` file in `dir` becomes an entry, in file-name order. A missing
    /// directory yields an empty catalog.
    pub async fn load(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        if !tokio::fs::try_exists(&dir)
            .await
            .map_err(|e| StoreError::io(&dir, e))?
        {
            tracing::warn!("Models directory {} does not exist", dir.display());
            return Ok(Self::new(dir, Vec::new()));
        }

        let manifest = dir.join(MANIFEST_FILE);
        let entries = match tokio::fs::read(&manifest).await {
            Ok(raw) => {
                let parsed: IndexMap<String, Vec<String>> = serde_json::from_slice(&raw)?;
                from_manifest(parsed)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => scan_dir(&dir).await?,
            Err(e) => return Err(StoreError::io(&manifest, e)),
        };

        for entry in &entries {
            tracing::debug!("Catalog model {} -> {:?}", entry.file_name, entry.keywords);
        }
        tracing::info!(
            "Loaded {} catalog model(s) from {}",
            entries.len(),
            dir.display()
        );
        Ok(Self::new(dir, entries))
    }

    /// Best entry for `prompt`, or `None` when no keyword occurs in it.
    pub fn best_match(&self, prompt: &str) -> Option<&CatalogEntry> {
        let prompt = prompt.to_lowercase();

        let mut best: Option<(&CatalogEntry, usize)> = None;
        for entry in &self.entries {
            let score = score(entry, &prompt);
            // Strictly greater: ties keep the earlier entry.
            if score > 0 && best.is_none_or(|(_, top)| score > top) {
                best = Some((entry, score));
            }
        }

        if let Some((entry, score)) = best {
            tracing::debug!("Prompt matched {} (score {})", entry.file_name, score);
        }
        best.map(|(entry, _)| entry)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// File name -> keywords, in catalog order.
    pub fn listing(&self) -> IndexMap<String, Vec<String>> {
        self.entries
            .iter()
            .map(|e| (e.file_name.clone(), e.keywords.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reads a catalog model by client-supplied name.
    pub async fn load_model(&self, raw_name: &str) -> PipelineResult<(String, Vec<u8>)> {
        read_model(&self.dir, raw_name).await
    }
}

/// Number of `entry` keywords contained in the already lowercased prompt.
pub fn score(entry: &CatalogEntry, prompt_lower: &str) -> usize {
    entry
        .keywords
        .iter()
        .filter(|keyword| prompt_lower.contains(keyword.as_str()))
        .count()
}

fn from_manifest(manifest: IndexMap<String, Vec<String>>) -> Vec<CatalogEntry> {
    manifest
        .into_iter()
        .filter_map(|(file, keywords)| match sanitize_name(&file) {
            Some(file_name) => Some(CatalogEntry {
                file_name,
                keywords: normalize_keywords(&keywords),
            }),
            None => {
                tracing::warn!("Skipping catalog entry with unsafe name {:?}", file);
                None
            }
        })
        .collect()
}

async fn scan_dir(dir: &Path) -> Result<Vec<CatalogEntry>, StoreError> {
    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| StoreError::io(dir, e))?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| StoreError::io(dir, e))?
    {
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if name.ends_with(MODEL_EXT) && sanitize_name(&name).as_deref() == Some(name.as_str()) {
            names.push(name);
        }
    }
    names.sort();

    Ok(names
        .into_iter()
        .map(|file_name| CatalogEntry {
            keywords: keywords_for_file(&file_name),
            file_name,
        })
        .collect())
}
