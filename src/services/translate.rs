use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::settings::TranslationSettings;
use crate::services::llm::{LlmClient, LlmError};

/// Source language value meaning "let the backend detect it".
pub const AUTO_SOURCE: &str = "auto";

/// Lower-cased language name to backend language code.
pub type LanguageCatalog = HashMap<String, String>;

#[derive(Error, Debug)]
pub enum TranslateError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Translation backend unavailable: {0}")]
    Unavailable(String),
    #[error("API error: {0}")]
    ApiError(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Missing API key")]
    MissingApiKey,
    #[error("Nothing to translate")]
    EmptyInput,
}

#[async_trait]
pub trait TranslationBackend: Send + Sync {
    async fn supported_languages(&self) -> Result<LanguageCatalog, TranslateError>;

    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String, TranslateError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub text: String,
    pub target: String,
}

/// Validates input and output around a [`TranslationBackend`].
pub struct Translator {
    backend: Arc<dyn TranslationBackend>,
}

impl Translator {
    pub fn new(backend: Arc<dyn TranslationBackend>) -> Self {
        Self { backend }
    }

    pub async fn translate(&self, text: &str, source: &str, target: &str) -> Result<Translation, TranslateError> {
        if text.trim().is_empty() {
            return Err(TranslateError::EmptyInput);
        }

        let translated = self.backend.translate(text, source, target).await?;
        let translated = translated.trim();
        if translated.is_empty() {
            return Err(TranslateError::InvalidResponse("empty translation".to_string()));
        }

        tracing::info!(target_language = target, chars = translated.len(), "Translation completed");

        Ok(Translation {
            text: translated.to_string(),
            target: target.to_string(),
        })
    }
}

// Google Cloud Translation v2

#[derive(Debug, Serialize)]
struct GoogleTranslateRequest<'a> {
    q: &'a str,
    target: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<&'a str>,
    format: &'static str,
}

#[derive(Debug, Deserialize)]
struct GoogleEnvelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct GoogleTranslations {
    translations: Vec<GoogleTranslation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleTranslation {
    translated_text: String,
    #[serde(default)]
    detected_source_language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleLanguages {
    languages: Vec<GoogleLanguage>,
}

#[derive(Debug, Deserialize)]
struct GoogleLanguage {
    language: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[derive(Clone)]
pub struct GoogleTranslateClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GoogleTranslateClient {
    pub fn new(settings: &TranslationSettings, timeout: Duration) -> Result<Self, TranslateError> {
        let api_key = settings
            .google_api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or(TranslateError::MissingApiKey)?;

        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: settings.google_base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn read<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> Result<T, TranslateError> {
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            if let Ok(error_response) = serde_json::from_str::<ApiErrorResponse>(&error_text) {
                return Err(TranslateError::ApiError(error_response.error.message));
            }
            return Err(TranslateError::ApiError(format!("status {}: {}", status, error_text)));
        }

        let envelope: GoogleEnvelope<T> = response
            .json()
            .await
            .map_err(|e| TranslateError::InvalidResponse(e.to_string()))?;

        Ok(envelope.data)
    }
}

#[async_trait]
impl TranslationBackend for GoogleTranslateClient {
    async fn supported_languages(&self) -> Result<LanguageCatalog, TranslateError> {
        let response = self
            .client
            .get(format!("{}/languages", self.base_url))
            .query(&[("target", "en"), ("key", self.api_key.as_str())])
            .send()
            .await?;

        let data: GoogleLanguages = Self::read(response).await?;

        let catalog: LanguageCatalog = data
            .languages
            .into_iter()
            .filter_map(|l| l.name.map(|name| (name.to_lowercase(), l.language)))
            .collect();

        if catalog.is_empty() {
            return Err(TranslateError::InvalidResponse("empty language list".to_string()));
        }

        Ok(catalog)
    }

    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String, TranslateError> {
        let request = GoogleTranslateRequest {
            q: text,
            target,
            source: (source != AUTO_SOURCE).then_some(source),
            format: "text",
        };

        let response = self
            .client
            .post(&self.base_url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let data: GoogleTranslations = Self::read(response).await?;
        let translation = data
            .translations
            .into_iter()
            .next()
            .ok_or_else(|| TranslateError::InvalidResponse("No translations in response".to_string()))?;

        if let Some(detected) = translation.detected_source_language.as_deref() {
            tracing::debug!(detected, "Backend detected source language");
        }

        Ok(translation.translated_text)
    }
}

// Chat-completion translation

const LLM_LANGUAGES: &[(&str, &str)] = &[
    ("afrikaans", "af"),
    ("arabic", "ar"),
    ("armenian", "hy"),
    ("bengali", "bn"),
    ("chinese (simplified)", "zh-CN"),
    ("chinese (traditional)", "zh-TW"),
    ("czech", "cs"),
    ("danish", "da"),
    ("dutch", "nl"),
    ("english", "en"),
    ("filipino", "tl"),
    ("finnish", "fi"),
    ("french", "fr"),
    ("german", "de"),
    ("greek", "el"),
    ("hebrew", "iw"),
    ("hindi", "hi"),
    ("hungarian", "hu"),
    ("indonesian", "id"),
    ("italian", "it"),
    ("japanese", "ja"),
    ("korean", "ko"),
    ("norwegian", "no"),
    ("persian", "fa"),
    ("polish", "pl"),
    ("portuguese", "pt"),
    ("punjabi", "pa"),
    ("romanian", "ro"),
    ("russian", "ru"),
    ("spanish", "es"),
    ("swahili", "sw"),
    ("swedish", "sv"),
    ("tamil", "ta"),
    ("thai", "th"),
    ("turkish", "tr"),
    ("ukrainian", "uk"),
    ("urdu", "ur"),
    ("vietnamese", "vi"),
];

/// Translation through the chat-completion backend, limited to a fixed language table.
pub struct LlmTranslator {
    llm: LlmClient,
}

impl LlmTranslator {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }

    fn language_name(code: &str) -> Option<&'static str> {
        LLM_LANGUAGES
            .iter()
            .find(|(_, c)| c.eq_ignore_ascii_case(code))
            .map(|(name, _)| *name)
    }
}

#[async_trait]
impl TranslationBackend for LlmTranslator {
    async fn supported_languages(&self) -> Result<LanguageCatalog, TranslateError> {
        Ok(LLM_LANGUAGES
            .iter()
            .map(|(name, code)| (name.to_string(), code.to_string()))
            .collect())
    }

    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String, TranslateError> {
        let target_name = Self::language_name(target)
            .ok_or_else(|| TranslateError::ApiError(format!("Unsupported target language '{}'", target)))?;

        let source_desc = match Self::language_name(source) {
            Some(name) => name.to_string(),
            None => "whatever language it is written in".to_string(),
        };

        let system_prompt = format!(
            "You are a translation engine. Translate the user's text from {} into {}. \
             Reply with the translation only, without quotes or commentary.",
            source_desc, target_name
        );

        self.llm
            .complete(text, Some(&system_prompt), Some(2000), Some(0.2))
            .await
            .map_err(|e| match e {
                LlmError::RequestError(e) => TranslateError::RequestError(e),
                LlmError::InvalidResponse(m) => TranslateError::InvalidResponse(m),
                other => TranslateError::ApiError(other.to_string()),
            })
    }
}
