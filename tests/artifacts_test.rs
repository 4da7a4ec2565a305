use axum::body::Bytes;
use futures::stream;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

use bridge::services::artifacts::{
    artifact_file_name, sweep_stale, SweepReport, TempArtifactRegistry, UploadError, UploadMaterializer,
};

fn chunks(parts: &[&'static [u8]]) -> impl futures::Stream<Item = Result<Bytes, io::Error>> {
    stream::iter(
        parts
            .iter()
            .map(|p| Ok(Bytes::from_static(p)))
            .collect::<Vec<_>>(),
    )
}

#[test]
fn test_cleanup_all_removes_every_registered_path() {
    let dir = TempDir::new().unwrap();
    let registry = TempArtifactRegistry::new();

    let paths: Vec<_> = (0..3).map(|i| dir.path().join(format!("clip_{}.mp4", i))).collect();
    for path in &paths {
        std::fs::write(path, b"data").unwrap();
        registry.register(path.clone());
    }

    assert_eq!(registry.cleanup_all(), 3);
    assert!(registry.is_empty());
    for path in &paths {
        assert!(!path.exists());
    }
}

#[test]
fn test_cleanup_tolerates_missing_files() {
    let dir = TempDir::new().unwrap();
    let registry = TempArtifactRegistry::new();

    let gone = dir.path().join("already_removed.mp4");
    registry.register(gone.clone());

    assert_eq!(registry.cleanup_all(), 1);
    assert!(!gone.exists());
}

#[test]
fn test_release_deletes_once() {
    let dir = TempDir::new().unwrap();
    let registry = TempArtifactRegistry::new();

    let path = dir.path().join("clip.wav");
    std::fs::write(&path, b"data").unwrap();
    registry.register(path.clone());

    assert!(registry.release(&path));
    assert!(!path.exists());

    // A file recreated at the same path is no longer ours to delete.
    std::fs::write(&path, b"other").unwrap();
    assert!(!registry.release(&path));
    assert_eq!(registry.cleanup_all(), 0);
    assert!(path.exists());
}

#[tokio::test]
async fn test_materialize_writes_and_registers() {
    let dir = TempDir::new().unwrap();
    let registry = Arc::new(TempArtifactRegistry::new());
    let materializer = UploadMaterializer::new(dir.path().join("uploads"), Arc::clone(&registry));

    let artifact = assert_ok!(
        materializer
            .materialize(Some("lecture.WAV"), chunks(&[b"hello ", b"world"]))
            .await
    );

    assert!(artifact.path().starts_with(dir.path().join("uploads")));
    assert!(artifact.file_name().ends_with(".wav"));
    assert_eq!(artifact.size(), 11);
    assert_eq!(std::fs::read(artifact.path()).unwrap(), b"hello world");
    assert!(registry.contains(artifact.path()));

    let path = artifact.path().to_path_buf();
    drop(artifact);

    assert!(!path.exists());
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_materialize_removes_partial_file_on_stream_error() {
    let dir = TempDir::new().unwrap();
    let registry = Arc::new(TempArtifactRegistry::new());
    let materializer = UploadMaterializer::new(dir.path(), Arc::clone(&registry));

    let broken = stream::iter(vec![
        Ok(Bytes::from_static(b"partial")),
        Err(io::Error::other("connection reset")),
    ]);

    let err = assert_err!(materializer.materialize(Some("clip.mp3"), broken).await);

    assert!(matches!(err, UploadError::Io(_)));
    assert!(err.to_string().contains("connection reset"));
    assert!(registry.is_empty());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_materialize_rejects_empty_upload() {
    let dir = TempDir::new().unwrap();
    let registry = Arc::new(TempArtifactRegistry::new());
    let materializer = UploadMaterializer::new(dir.path(), Arc::clone(&registry));

    let err = assert_err!(materializer.materialize(None, chunks(&[])).await);

    assert!(matches!(err, UploadError::Empty));
    assert!(registry.is_empty());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_registry_sweeps_artifacts_still_alive_at_shutdown() {
    let dir = TempDir::new().unwrap();
    let registry = Arc::new(TempArtifactRegistry::new());
    let materializer = UploadMaterializer::new(dir.path(), Arc::clone(&registry));

    let artifact = assert_ok!(materializer.materialize(None, chunks(&[b"audio"])).await);
    let path = artifact.path().to_path_buf();

    assert_eq!(registry.cleanup_all(), 1);
    assert!(!path.exists());

    // The guard finds nothing left to release.
    drop(artifact);
    assert!(registry.is_empty());
}

#[test]
fn test_artifact_names_are_unique_within_a_second() {
    let first = artifact_file_name(Some("clip.wav"));
    let second = artifact_file_name(Some("clip.wav"));

    assert_ne!(first, second);
    assert!(first.starts_with("upload_"));
}

#[test]
fn test_artifact_name_extension() {
    assert!(artifact_file_name(Some("talk.FLAC")).ends_with(".flac"));
    assert!(artifact_file_name(Some("notes.txt")).ends_with(".mp4"));
    assert!(artifact_file_name(Some("no_extension")).ends_with(".mp4"));
    assert!(artifact_file_name(None).ends_with(".mp4"));
}

#[tokio::test]
async fn test_sweep_removes_files_past_min_age() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("upload_a.wav"), b"a").unwrap();
    std::fs::write(dir.path().join("upload_b.wav"), b"b").unwrap();
    std::fs::create_dir(dir.path().join("nested")).unwrap();

    let report = assert_ok!(sweep_stale(dir.path(), Duration::ZERO).await);

    assert_eq!(report, SweepReport { removed: 2, kept: 0 });
    assert!(dir.path().join("nested").exists());
}

#[tokio::test]
async fn test_sweep_keeps_recent_files() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("upload_a.wav"), b"a").unwrap();

    let report = assert_ok!(sweep_stale(dir.path(), Duration::from_secs(3600)).await);

    assert_eq!(report, SweepReport { removed: 0, kept: 1 });
    assert!(dir.path().join("upload_a.wav").exists());
}

#[tokio::test]
async fn test_sweep_missing_dir() {
    let dir = TempDir::new().unwrap();

    let report = assert_ok!(sweep_stale(&dir.path().join("never_created"), Duration::ZERO).await);

    assert_eq!(report, SweepReport::default());
}
