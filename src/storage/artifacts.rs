use crate::canonical::Fingerprint;
use crate::error::{PipelineError, PipelineResult, StoreError};

use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

pub const MODEL_EXT: &str = ".glb";
const GENERATED_PREFIX: &str = "gen_";

/// File storage for model payloads and upload audit copies.
///
/// Only names produced by [`generated_name`] or accepted by
/// [`sanitize_name`] ever reach the filesystem.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    models_dir: PathBuf,
    uploads_dir: PathBuf,
}

/// Storage name of a generated model: derived from the input fingerprint,
/// never from user text.
pub fn generated_name(fingerprint: &Fingerprint) -> String {
    format!("{}{}{}", GENERATED_PREFIX, fingerprint.as_str(), MODEL_EXT)
}

/// Short download name for a generated model (`gen_<12 hex>.glb`).
pub fn display_name(artifact_ref: &str) -> String {
    match artifact_ref
        .strip_prefix(GENERATED_PREFIX)
        .and_then(|rest| rest.strip_suffix(MODEL_EXT))
        .and_then(Fingerprint::parse)
    {
        Some(fp) => format!("{}{}{}", GENERATED_PREFIX, fp.short(), MODEL_EXT),
        None => artifact_ref.to_string(),
    }
}

/// Validates a client-supplied artifact name.
///
/// Appends `.glb` when missing. Rejects anything that is not a plain
/// `[A-Za-z0-9._-]` file name, starts with a dot or contains `..`.
/// Never touches the filesystem.
pub fn sanitize_name(raw: &str) -> Option<String> {
    let name = if raw.ends_with(MODEL_EXT) {
        raw.to_string()
    } else {
        format!("{}{}", raw, MODEL_EXT)
    };

    let stem = &name[..name.len() - MODEL_EXT.len()];
    let valid = !stem.is_empty()
        && !name.starts_with('.')
        && !name.contains("..")
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));

    valid.then_some(name)
}

impl ArtifactStore {
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref();
        let models_dir = root.join("artifacts");
        let uploads_dir = root.join("uploads");
        for dir in [&models_dir, &uploads_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| StoreError::io(dir, e))?;
            remove_interrupted_writes(dir).await?;
        }
        Ok(Self {
            models_dir,
            uploads_dir,
        })
    }

    /// Writes a generated model and returns its artifact reference.
    pub async fn store_model(
        &self,
        fingerprint: &Fingerprint,
        bytes: &[u8],
    ) -> Result<String, StoreError> {
        let name = generated_name(fingerprint);
        write_file(&self.models_dir, &name, bytes).await?;
        tracing::info!("Stored artifact {} ({} bytes)", name, bytes.len());
        Ok(name)
    }

    /// Keeps a copy of the canonical upload. Callers treat failure as
    /// non-fatal.
    pub async fn store_upload(
        &self,
        fingerprint: &Fingerprint,
        bytes: &[u8],
    ) -> Result<PathBuf, StoreError> {
        let name = format!("{}.png", fingerprint.as_str());
        write_file(&self.uploads_dir, &name, bytes).await?;
        Ok(self.uploads_dir.join(name))
    }

    pub async fn load_upload(&self, fingerprint: &Fingerprint) -> Option<Vec<u8>> {
        let path = self.uploads_dir.join(format!("{}.png", fingerprint.as_str()));
        tokio::fs::read(path).await.ok()
    }

    /// Reads a model by client-supplied name.
    pub async fn load_model(&self, raw_name: &str) -> PipelineResult<(String, Vec<u8>)> {
        read_model(&self.models_dir, raw_name).await
    }
}

/// Reads `<dir>/<raw_name>` after sanitizing the name. Shared with the
/// static catalog, which serves its own directory.
pub async fn read_model(dir: &Path, raw_name: &str) -> PipelineResult<(String, Vec<u8>)> {
    let name = sanitize_name(raw_name)
        .ok_or_else(|| PipelineError::NotFound(format!("model {}", raw_name)))?;
    let path = dir.join(&name);
    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok((name, bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(PipelineError::NotFound(format!("model {}", name)))
        }
        Err(e) => Err(StoreError::io(&path, e).into()),
    }
}

async fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
    let target = dir.join(name);
    let tmp = dir.join(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4().simple()));

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
    Ok(())
}

/// Deletes temp files left by a write that never reached its rename.
async fn remove_interrupted_writes(dir: &Path) -> Result<(), StoreError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| StoreError::io(dir, e))?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| StoreError::io(dir, e))?
    {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) == Some("tmp") {
            tracing::debug!("Removing interrupted write {}", path.display());
            let _ = tokio::fs::remove_file(&path).await;
        }
    }
    Ok(())
}
