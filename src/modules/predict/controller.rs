use axum::{
    extract::{Multipart, State},
    Json,
};

use crate::modules::predict::{
    error::{FaultKind, PredictError},
    pipeline::{PredictionPipeline, DEFAULT_TARGET_LANGUAGE},
    schema::{FormatsResponse, PredictionResponse},
};
use crate::services::artifacts::UploadedArtifact;
use crate::services::stt::SttClient;
use crate::AppState;

pub async fn predict(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<PredictionResponse>, PredictError> {
    let result = match receive(&state.pipeline, multipart).await {
        Ok((artifact, target_language)) => state.pipeline.run(artifact, &target_language).await,
        Err(e) => Err(e),
    };

    if let Err(e) = &result {
        match e.kind() {
            FaultKind::ClientFault => {
                tracing::warn!(stage = %e.stage(), error = %e, "Prediction rejected")
            }
            FaultKind::ServerFault => {
                tracing::error!(stage = %e.stage(), error = %e, "Prediction failed")
            }
        }
    }

    result.map(Json)
}

/// Reads the form, materializing the file field as it streams in.
async fn receive(
    pipeline: &PredictionPipeline,
    mut multipart: Multipart,
) -> Result<(UploadedArtifact, String), PredictError> {
    let mut artifact: Option<UploadedArtifact> = None;
    let mut target_language: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" | "audio" | "video" => {
                if artifact.is_some() {
                    return Err(PredictError::MultipleFiles);
                }
                let file_name = field.file_name().map(|s| s.to_string());
                artifact = Some(pipeline.accept(file_name.as_deref(), field).await?);
            }
            "target_language" => {
                target_language = Some(field.text().await?);
            }
            _ => {}
        }
    }

    let artifact = artifact.ok_or(PredictError::MissingFile)?;
    let target_language = target_language
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_TARGET_LANGUAGE.to_string());

    Ok((artifact, target_language))
}

pub async fn supported_formats() -> Json<FormatsResponse> {
    Json(FormatsResponse {
        formats: SttClient::supported_formats(),
        default_target_language: DEFAULT_TARGET_LANGUAGE,
    })
}
