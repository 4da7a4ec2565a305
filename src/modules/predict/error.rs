use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::modules::predict::schema::ErrorResponse;
use crate::services::artifacts::UploadError;
use crate::services::language::LanguageError;
use crate::services::stt::{SttError, TranscriptionError};
use crate::services::translate::TranslateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    ClientFault,
    ServerFault,
}

/// Pipeline states, in the order a request moves through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Received,
    Materialized,
    Transcribed,
    LanguageResolved,
    Translated,
    Responded,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::Materialized => "materialized",
            Stage::Transcribed => "transcribed",
            Stage::LanguageResolved => "language_resolved",
            Stage::Translated => "translated",
            Stage::Responded => "responded",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum PredictError {
    #[error("Failed to read multipart: {0}")]
    Multipart(String),
    #[error("No file provided")]
    MissingFile,
    #[error("Only one file may be uploaded per request")]
    MultipleFiles,
    #[error("Uploaded file is empty")]
    EmptyUpload,
    #[error("Upload too large: {0}")]
    PayloadTooLarge(String),
    #[error("Failed to store upload: {0}")]
    Materialize(UploadError),
    #[error("Could not extract any speech from the upload")]
    NoSpeech,
    #[error("Transcription failed: {0}")]
    Transcription(SttError),
    #[error("Unsupported language '{language}': {reason}")]
    UnsupportedLanguage { language: String, reason: String },
    #[error("Translation failed: {0}")]
    Translation(TranslateError),
}

impl PredictError {
    pub fn kind(&self) -> FaultKind {
        match self {
            PredictError::Multipart(_)
            | PredictError::MissingFile
            | PredictError::MultipleFiles
            | PredictError::EmptyUpload
            | PredictError::PayloadTooLarge(_)
            | PredictError::NoSpeech
            | PredictError::UnsupportedLanguage { .. } => FaultKind::ClientFault,
            PredictError::Materialize(_)
            | PredictError::Transcription(_)
            | PredictError::Translation(_) => FaultKind::ServerFault,
        }
    }

    /// The state the request was in when it failed.
    pub fn stage(&self) -> Stage {
        match self {
            PredictError::Multipart(_)
            | PredictError::MissingFile
            | PredictError::MultipleFiles
            | PredictError::EmptyUpload
            | PredictError::PayloadTooLarge(_)
            | PredictError::Materialize(_) => Stage::Received,
            PredictError::NoSpeech | PredictError::Transcription(_) => Stage::Materialized,
            PredictError::UnsupportedLanguage { .. } => Stage::Transcribed,
            PredictError::Translation(_) => Stage::LanguageResolved,
        }
    }

    pub fn status(&self) -> StatusCode {
        if let PredictError::PayloadTooLarge(_) = self {
            return StatusCode::PAYLOAD_TOO_LARGE;
        }
        match self.kind() {
            FaultKind::ClientFault => StatusCode::BAD_REQUEST,
            FaultKind::ServerFault => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn unsupported_language(language: &str, error: LanguageError) -> Self {
        PredictError::UnsupportedLanguage {
            language: language.to_string(),
            reason: error.to_string(),
        }
    }
}

impl From<UploadError> for PredictError {
    fn from(e: UploadError) -> Self {
        match e {
            UploadError::Empty => PredictError::EmptyUpload,
            UploadError::TooLarge(message) => PredictError::PayloadTooLarge(message),
            other => PredictError::Materialize(other),
        }
    }
}

/// Errors reading the form outside a file body. A malformed form is the
/// client's fault; only the size limit gets its own status.
impl From<MultipartError> for PredictError {
    fn from(e: MultipartError) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            PredictError::PayloadTooLarge(e.body_text())
        } else {
            PredictError::Multipart(e.body_text())
        }
    }
}

impl From<TranscriptionError> for PredictError {
    fn from(e: TranscriptionError) -> Self {
        match e {
            TranscriptionError::NoSpeech => PredictError::NoSpeech,
            TranscriptionError::Backend(e) => PredictError::Transcription(e),
        }
    }
}

impl From<TranslateError> for PredictError {
    fn from(e: TranslateError) -> Self {
        PredictError::Translation(e)
    }
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            kind: self.kind(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
