use std::sync::Arc;
use thiserror::Error;

use crate::services::translate::{TranslateError, TranslationBackend};

#[derive(Error, Debug)]
pub enum LanguageError {
    #[error("Language catalog is malformed: {0}")]
    MalformedCatalog(String),
}

/// How a requested language was turned into a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageMatch {
    /// Matched a language name in the catalog.
    Name,
    /// Already one of the catalog's codes.
    Code,
    /// Not in the catalog; passed through verbatim.
    Unrecognized,
    /// Catalog could not be fetched; passed through verbatim.
    CatalogUnavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLanguage {
    pub code: String,
    pub matched: LanguageMatch,
}

pub struct LanguageResolver {
    backend: Arc<dyn TranslationBackend>,
}

impl LanguageResolver {
    pub fn new(backend: Arc<dyn TranslationBackend>) -> Self {
        Self { backend }
    }

    /// Maps a language name or code to the backend's code.
    ///
    /// Unknown input and an unreachable catalog both fall back to the
    /// lower-cased input. Only a catalog the backend returned but that could
    /// not be understood is an error.
    pub async fn resolve(&self, input: &str) -> Result<ResolvedLanguage, LanguageError> {
        let wanted = input.trim().to_lowercase();

        let catalog = match self.backend.supported_languages().await {
            Ok(catalog) => catalog,
            Err(TranslateError::InvalidResponse(message)) => {
                return Err(LanguageError::MalformedCatalog(message));
            }
            Err(e) => {
                tracing::warn!(language = %wanted, error = %e, "Language catalog unavailable, using input as code");
                return Ok(ResolvedLanguage {
                    code: wanted,
                    matched: LanguageMatch::CatalogUnavailable,
                });
            }
        };

        let resolved = if let Some(code) = catalog.get(&wanted) {
            ResolvedLanguage {
                code: code.clone(),
                matched: LanguageMatch::Name,
            }
        } else if let Some(code) = catalog.values().find(|c| c.eq_ignore_ascii_case(&wanted)) {
            ResolvedLanguage {
                code: code.clone(),
                matched: LanguageMatch::Code,
            }
        } else {
            ResolvedLanguage {
                code: wanted,
                matched: LanguageMatch::Unrecognized,
            }
        };

        tracing::debug!(input, code = %resolved.code, matched = ?resolved.matched, "Language resolved");
        Ok(resolved)
    }
}
