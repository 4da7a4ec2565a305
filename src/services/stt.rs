use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::config::settings::SttSettings;

#[derive(Error, Debug)]
pub enum SttError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("API error: {0}")]
    ApiError(String),
    #[error("Missing API key")]
    MissingApiKey,
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Speech recognizer is shut down")]
    Unavailable,
}

#[derive(Debug, Deserialize)]
struct WhisperResponse {
    text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    duration: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[derive(Debug, Clone)]
pub struct SttResponse {
    pub text: String,
    pub language: Option<String>,
    pub duration: Option<f32>,
}

/// Speech-to-text over a media file on local storage.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn recognize(&self, audio_path: &Path) -> Result<SttResponse, SttError>;
}

#[derive(Clone)]
pub struct SttClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl SttClient {
    pub fn new(settings: &SttSettings, timeout: Duration) -> Result<Self, SttError> {
        if settings.api_key.is_empty() {
            return Err(SttError::MissingApiKey);
        }

        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn transcribe(
        &self,
        audio_data: Vec<u8>,
        file_name: &str,
    ) -> Result<SttResponse, SttError> {
        let mime_type = Self::get_mime_type(file_name);

        let file_part = Part::bytes(audio_data)
            .file_name(file_name.to_string())
            .mime_str(mime_type)
            .map_err(|e| SttError::InvalidResponse(e.to_string()))?;

        let form = Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json");

        tracing::debug!(model = %self.model, file_name, "Sending audio to speech backend");

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            if let Ok(error_response) = serde_json::from_str::<ApiErrorResponse>(&error_text) {
                return Err(SttError::ApiError(error_response.error.message));
            }
            return Err(SttError::ApiError(format!("status {}: {}", status, error_text)));
        }

        let whisper_response: WhisperResponse = response
            .json()
            .await
            .map_err(|e| SttError::InvalidResponse(e.to_string()))?;

        Ok(SttResponse {
            text: whisper_response.text,
            language: whisper_response.language,
            duration: whisper_response.duration,
        })
    }

    fn get_mime_type(file_name: &str) -> &'static str {
        let extension = file_name
            .rsplit('.')
            .next()
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "mp3" => "audio/mpeg",
            "wav" => "audio/wav",
            "webm" => "audio/webm",
            "ogg" => "audio/ogg",
            "m4a" => "audio/m4a",
            "flac" => "audio/flac",
            "mp4" => "video/mp4",
            _ => "application/octet-stream",
        }
    }

    pub fn supported_formats() -> Vec<&'static str> {
        vec!["mp3", "wav", "webm", "ogg", "m4a", "flac", "mp4"]
    }
}

#[async_trait]
impl SpeechRecognizer for SttClient {
    async fn recognize(&self, audio_path: &Path) -> Result<SttResponse, SttError> {
        let audio_data = tokio::fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp4");

        self.transcribe(audio_data, file_name).await
    }
}

#[derive(Error, Debug)]
pub enum TranscriptionError {
    #[error("Could not extract any speech from the upload")]
    NoSpeech,
    #[error(transparent)]
    Backend(#[from] SttError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub text: String,
    pub language: Option<String>,
}

/// Normalizes recognizer output and bounds how many recognitions run at once.
pub struct Transcriber {
    recognizer: Arc<dyn SpeechRecognizer>,
    permits: Semaphore,
}

impl Transcriber {
    /// `max_concurrency` of 1 serializes access to the recognizer.
    pub fn new(recognizer: Arc<dyn SpeechRecognizer>, max_concurrency: usize) -> Self {
        Self {
            recognizer,
            permits: Semaphore::new(max_concurrency.max(1)),
        }
    }

    pub async fn transcribe(&self, audio_path: &Path) -> Result<Transcript, TranscriptionError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| SttError::Unavailable)?;

        let response = self.recognizer.recognize(audio_path).await?;
        let text = response.text.trim();

        if text.is_empty() {
            return Err(TranscriptionError::NoSpeech);
        }

        tracing::info!(
            chars = text.len(),
            language = response.language.as_deref().unwrap_or("unknown"),
            duration = response.duration.unwrap_or_default(),
            "Transcription completed"
        );

        Ok(Transcript {
            text: text.to_string(),
            language: response.language,
        })
    }
}
