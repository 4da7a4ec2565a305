use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("Invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationProvider {
    Google,
    Llm,
}

impl FromStr for TranslationProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "llm" => Ok(Self::Llm),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    MongoDb,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(Self::MongoDb),
            "memory" => Ok(Self::Memory),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub uploads: UploadSettings,
    pub stt: SttSettings,
    pub translation: TranslationSettings,
    pub llm: LlmSettings,
    pub store: StoreSettings,
    pub backend_timeout: Duration,
    pub json_logs: bool,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub upload_dir: PathBuf,
    pub debug_dir: Option<PathBuf>,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct SttSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_concurrency: usize,
}

#[derive(Debug, Clone)]
pub struct TranslationSettings {
    pub provider: TranslationProvider,
    pub google_api_key: Option<String>,
    pub google_base_url: String,
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    pub mongodb_uri: Option<String>,
    pub database: String,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Lookup(lookup);

        let translation_provider = env.parse("TRANSLATION_PROVIDER", TranslationProvider::Google)?;
        let google_api_key = env.optional("GOOGLE_TRANSLATE_API_KEY");
        if translation_provider == TranslationProvider::Google && google_api_key.is_none() {
            return Err(ConfigError::Missing("GOOGLE_TRANSLATE_API_KEY"));
        }

        let store_backend = env.parse("CONVERSATION_STORE", StoreBackend::MongoDb)?;
        let mongodb_uri = env.optional("MONGODB_URI");
        if store_backend == StoreBackend::MongoDb && mongodb_uri.is_none() {
            return Err(ConfigError::Missing("MONGODB_URI"));
        }

        let max_upload_mb: usize = env.parse("MAX_UPLOAD_MB", 100)?;
        let max_upload_bytes = max_upload_mb
            .checked_mul(1024 * 1024)
            .ok_or_else(|| ConfigError::Invalid {
                var: "MAX_UPLOAD_MB",
                value: max_upload_mb.to_string(),
            })?;
        let timeout_secs: u64 = env.parse("BACKEND_TIMEOUT_SECS", 120)?;

        Ok(Self {
            server: ServerSettings {
                host: env.or("HOST", "0.0.0.0"),
                port: env.parse("PORT", 8000)?,
            },
            uploads: UploadSettings {
                upload_dir: PathBuf::from(env.or("UPLOAD_DIR", "uploads")),
                debug_dir: env.optional("DEBUG_DIR").map(PathBuf::from),
                max_upload_bytes,
            },
            stt: SttSettings {
                api_key: env.required("GROQ_API_KEY")?,
                base_url: env.or("GROQ_BASE_URL", "https://api.groq.com/openai/v1"),
                model: env.or("STT_MODEL", "whisper-large-v3-turbo"),
                max_concurrency: env.parse("STT_MAX_CONCURRENCY", 4)?,
            },
            translation: TranslationSettings {
                provider: translation_provider,
                google_api_key,
                google_base_url: env.or(
                    "GOOGLE_TRANSLATE_BASE_URL",
                    "https://translation.googleapis.com/language/translate/v2",
                ),
            },
            llm: LlmSettings {
                api_key: env.required("OPENROUTER_API_KEY")?,
                base_url: env.or("OPENROUTER_BASE_URL", "https://openrouter.ai/api/v1"),
                model: env.or("DEFAULT_MODEL", "openai/gpt-4o-mini"),
            },
            store: StoreSettings {
                backend: store_backend,
                mongodb_uri,
                database: env.or("MONGODB_DATABASE", "bridge"),
            },
            backend_timeout: Duration::from_secs(timeout_secs),
            json_logs: env
                .optional("LOG_FORMAT")
                .is_some_and(|f| f.eq_ignore_ascii_case("json")),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

struct Lookup<F>(F);

impl<F> Lookup<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, var: &str) -> Option<String> {
        (self.0)(var)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, var: &'static str) -> Result<String, ConfigError> {
        self.optional(var).ok_or(ConfigError::Missing(var))
    }

    fn or(&self, var: &str, default: &str) -> String {
        self.optional(var).unwrap_or_else(|| default.to_string())
    }

    fn parse<T: FromStr>(&self, var: &'static str, default: T) -> Result<T, ConfigError> {
        match self.optional(var) {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::Invalid { var, value }),
            None => Ok(default),
        }
    }
}
