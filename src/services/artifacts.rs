use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use chrono::Local;
use futures::{Stream, StreamExt};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::services::stt::SttClient;

const DEFAULT_EXTENSION: &str = "mp4";

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to read upload stream: {0}")]
    Stream(String),
    #[error("Uploaded file is empty")]
    Empty,
    #[error("Upload exceeds the size limit: {0}")]
    TooLarge(String),
}

impl From<MultipartError> for UploadError {
    fn from(e: MultipartError) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            UploadError::TooLarge(e.body_text())
        } else {
            UploadError::Stream(e.body_text())
        }
    }
}

/// Paths of transient files that still exist on disk.
///
/// Every path is deleted at most once: whichever of [`release`](Self::release)
/// or [`cleanup_all`](Self::cleanup_all) removes it from the set first owns the
/// deletion.
#[derive(Debug, Default)]
pub struct TempArtifactRegistry {
    paths: Mutex<HashSet<PathBuf>>,
}

impl TempArtifactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, path: impl Into<PathBuf>) {
        self.lock().insert(path.into());
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.lock().contains(path)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Deletes one registered path. Returns false if it was not registered.
    pub fn release(&self, path: &Path) -> bool {
        let tracked = self.lock().remove(path);
        if tracked {
            remove_file(path);
        }
        tracked
    }

    /// Deletes everything still registered and returns how many paths were swept.
    pub fn cleanup_all(&self) -> usize {
        let paths: Vec<PathBuf> = self.lock().drain().collect();
        for path in &paths {
            remove_file(path);
        }
        paths.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<PathBuf>> {
        self.paths.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// Never propagates: cleanup must not block the request or shutdown.
fn remove_file(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::info!(path = %path.display(), "Deleted temp file"),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "Temp file already removed")
        }
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to delete temp file"),
    }
}

/// A materialized upload owned by exactly one request.
///
/// Dropping the artifact releases it through the registry, which deletes the
/// backing file.
#[derive(Debug)]
pub struct UploadedArtifact {
    file_name: String,
    path: PathBuf,
    size: u64,
    registry: Arc<TempArtifactRegistry>,
}

impl UploadedArtifact {
    fn new(file_name: String, path: PathBuf, registry: Arc<TempArtifactRegistry>) -> Self {
        registry.register(path.clone());
        Self {
            file_name,
            path,
            size: 0,
            registry,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

impl Drop for UploadedArtifact {
    // Blocking unlink on the current worker thread: one syscall per artifact.
    fn drop(&mut self) {
        self.registry.release(&self.path);
    }
}

pub struct UploadMaterializer {
    upload_dir: PathBuf,
    registry: Arc<TempArtifactRegistry>,
}

impl UploadMaterializer {
    pub fn new(upload_dir: impl Into<PathBuf>, registry: Arc<TempArtifactRegistry>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            registry,
        }
    }

    pub fn registry(&self) -> &Arc<TempArtifactRegistry> {
        &self.registry
    }

    /// Copies the whole stream into a fresh file under the upload directory.
    ///
    /// The file is registered before the first byte is written, so a failed
    /// copy leaves nothing behind.
    pub async fn materialize<S, E>(
        &self,
        original_name: Option<&str>,
        stream: S,
    ) -> Result<UploadedArtifact, UploadError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<UploadError>,
    {
        fs::create_dir_all(&self.upload_dir).await?;

        let file_name = artifact_file_name(original_name);
        let path = self.upload_dir.join(&file_name);

        let mut file = fs::File::create(&path).await?;
        let mut artifact = UploadedArtifact::new(file_name, path, Arc::clone(&self.registry));

        let mut stream = std::pin::pin!(stream);
        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(Into::<UploadError>::into)?;
            file.write_all(&bytes).await?;
            artifact.size += bytes.len() as u64;
        }
        file.flush().await?;

        if artifact.size == 0 {
            return Err(UploadError::Empty);
        }

        tracing::debug!(
            path = %artifact.path.display(),
            bytes = artifact.size,
            "Upload materialized"
        );

        Ok(artifact)
    }
}

/// `upload_<local timestamp>_<random suffix>.<ext>`, keeping the client's
/// extension only when it is a format the recognizer accepts.
pub fn artifact_file_name(original_name: Option<&str>) -> String {
    let extension = original_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| SttClient::supported_formats().contains(&ext.as_str()))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

    let suffix = Uuid::new_v4().simple().to_string();

    format!(
        "upload_{}_{}.{}",
        Local::now().format("%Y%m%d_%H%M%S"),
        &suffix[..8],
        extension
    )
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: usize,
    pub kept: usize,
}

/// Deletes regular files in `dir` last modified at least `min_age` ago.
///
/// Covers uploads orphaned by a crash and no-speech copies kept for
/// debugging. A missing directory sweeps nothing.
pub async fn sweep_stale(dir: &Path, min_age: Duration) -> Result<SweepReport, UploadError> {
    let mut report = SweepReport::default();
    if !fs::try_exists(dir).await? {
        return Ok(report);
    }

    let now = SystemTime::now();
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }

        let age = now.duration_since(metadata.modified()?).unwrap_or_default();
        if age < min_age {
            report.kept += 1;
            continue;
        }

        let path = entry.path();
        match fs::remove_file(&path).await {
            Ok(()) => {
                report.removed += 1;
                tracing::info!(path = %path.display(), "Deleted stale file");
            }
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to delete stale file"),
        }
    }

    Ok(report)
}
