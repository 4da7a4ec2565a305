use axum::body::Bytes;
use futures::Stream;
use std::path::PathBuf;
use std::sync::Arc;

use crate::modules::predict::error::{PredictError, Stage};
use crate::modules::predict::schema::PredictionResponse;
use crate::services::artifacts::{TempArtifactRegistry, UploadError, UploadMaterializer, UploadedArtifact};
use crate::services::language::LanguageResolver;
use crate::services::stt::{TranscriptionError, Transcriber};
use crate::services::translate::{Translator, AUTO_SOURCE};

pub const DEFAULT_TARGET_LANGUAGE: &str = "es";

/// Upload → transcript → resolved language → translation.
///
/// Stages run strictly in order and the first failure ends the request. The
/// artifact is dropped, and so deleted, as soon as transcription is done with it.
pub struct PredictionPipeline {
    materializer: UploadMaterializer,
    transcriber: Transcriber,
    resolver: Arc<LanguageResolver>,
    translator: Arc<Translator>,
    debug_dir: Option<PathBuf>,
}

impl PredictionPipeline {
    pub fn new(
        materializer: UploadMaterializer,
        transcriber: Transcriber,
        resolver: Arc<LanguageResolver>,
        translator: Arc<Translator>,
    ) -> Self {
        Self {
            materializer,
            transcriber,
            resolver,
            translator,
            debug_dir: None,
        }
    }

    /// Uploads with no detectable speech are copied here before deletion.
    pub fn with_debug_dir(mut self, debug_dir: Option<PathBuf>) -> Self {
        self.debug_dir = debug_dir;
        self
    }

    pub fn registry(&self) -> &Arc<TempArtifactRegistry> {
        self.materializer.registry()
    }

    /// Received → Materialized.
    pub async fn accept<S, E>(&self, file_name: Option<&str>, stream: S) -> Result<UploadedArtifact, PredictError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<UploadError>,
    {
        let artifact = self.materializer.materialize(file_name, stream).await?;
        tracing::info!(
            stage = %Stage::Materialized,
            file = artifact.file_name(),
            bytes = artifact.size(),
            "Upload accepted"
        );
        Ok(artifact)
    }

    /// Materialized → Responded. Consumes the artifact.
    pub async fn run(&self, artifact: UploadedArtifact, target_language: &str) -> Result<PredictionResponse, PredictError> {
        let transcript = match self.transcriber.transcribe(artifact.path()).await {
            Ok(transcript) => transcript,
            Err(TranscriptionError::NoSpeech) => {
                self.keep_for_debugging(&artifact).await;
                return Err(PredictError::NoSpeech);
            }
            Err(e) => return Err(e.into()),
        };
        drop(artifact);
        tracing::info!(stage = %Stage::Transcribed, transcript = %transcript.text, "Transcript ready");

        let language = self
            .resolver
            .resolve(target_language)
            .await
            .map_err(|e| PredictError::unsupported_language(target_language, e))?;
        tracing::debug!(stage = %Stage::LanguageResolved, code = %language.code, "Target language ready");

        let translation = self
            .translator
            .translate(&transcript.text, AUTO_SOURCE, &language.code)
            .await?;
        tracing::info!(
            stage = %Stage::Translated,
            target_language = %translation.target,
            translation = %translation.text,
            "Translation ready"
        );

        Ok(PredictionResponse {
            transcript: transcript.text,
            translation: translation.text,
            target_language: translation.target,
        })
    }

    pub async fn predict<S, E>(
        &self,
        file_name: Option<&str>,
        stream: S,
        target_language: &str,
    ) -> Result<PredictionResponse, PredictError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<UploadError>,
    {
        let artifact = self.accept(file_name, stream).await?;
        self.run(artifact, target_language).await
    }

    async fn keep_for_debugging(&self, artifact: &UploadedArtifact) {
        let Some(debug_dir) = &self.debug_dir else {
            return;
        };

        let destination = debug_dir.join(artifact.file_name());
        let copied = match tokio::fs::create_dir_all(debug_dir).await {
            Ok(()) => tokio::fs::copy(artifact.path(), &destination).await.map(|_| ()),
            Err(e) => Err(e),
        };

        match copied {
            Ok(()) => tracing::info!(path = %destination.display(), "Kept silent upload for debugging"),
            Err(e) => tracing::warn!(error = %e, "Failed to copy silent upload to debug dir"),
        }
    }
}
