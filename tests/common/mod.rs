#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum_test::TestServer;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use bridge::modules::conversation::memory::InMemoryConversationStore;
use bridge::modules::conversation::model::{Conversation, Message};
use bridge::modules::conversation::store::{ConversationStore, StoreError};
use bridge::modules::predict::pipeline::PredictionPipeline;
use bridge::services::artifacts::{TempArtifactRegistry, UploadMaterializer};
use bridge::services::language::LanguageResolver;
use bridge::services::llm::{ChatModel, ChatTurn, LlmError};
use bridge::services::stt::{SpeechRecognizer, SttError, SttResponse, Transcriber};
use bridge::services::translate::{LanguageCatalog, TranslateError, TranslationBackend, Translator};
use bridge::{modules, AppState};

/// Treats the uploaded bytes as the words spoken in the clip.
#[derive(Default)]
pub struct FakeRecognizer {
    pub delay: Duration,
    in_flight: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
}

impl FakeRecognizer {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn peak(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechRecognizer for FakeRecognizer {
    async fn recognize(&self, audio_path: &Path) -> Result<SttResponse, SttError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let audio = tokio::fs::read(audio_path).await;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let text = String::from_utf8_lossy(&audio?).to_string();
        if text.starts_with("ERROR") {
            return Err(SttError::ApiError("model crashed".to_string()));
        }

        Ok(SttResponse {
            text,
            language: Some("en".to_string()),
            duration: Some(3.0),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Catalog {
    Available,
    Unreachable,
    Malformed,
}

/// Tags text with the target code; rejects codes it does not know.
pub struct FakeTranslation {
    pub catalog: Catalog,
    pub catalog_calls: AtomicUsize,
}

impl FakeTranslation {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            catalog_calls: AtomicUsize::new(0),
        }
    }

    fn languages() -> LanguageCatalog {
        [
            ("spanish", "es"),
            ("french", "fr"),
            ("german", "de"),
            ("english", "en"),
            ("chinese (simplified)", "zh-CN"),
        ]
        .into_iter()
        .map(|(name, code)| (name.to_string(), code.to_string()))
        .collect()
    }
}

#[async_trait]
impl TranslationBackend for FakeTranslation {
    async fn supported_languages(&self) -> Result<LanguageCatalog, TranslateError> {
        self.catalog_calls.fetch_add(1, Ordering::SeqCst);
        match self.catalog {
            Catalog::Available => Ok(Self::languages()),
            Catalog::Unreachable => Err(TranslateError::Unavailable("connection refused".to_string())),
            Catalog::Malformed => Err(TranslateError::InvalidResponse("unexpected payload".to_string())),
        }
    }

    async fn translate(&self, text: &str, _source: &str, target: &str) -> Result<String, TranslateError> {
        if !Self::languages().values().any(|code| code == target) {
            return Err(TranslateError::ApiError("Invalid Value".to_string()));
        }
        Ok(format!("[{}] {}", target, text))
    }
}

/// Answers with the last user turn echoed back, and remembers how much history it saw.
#[derive(Default)]
pub struct FakeChat {
    pub last_turn_count: AtomicUsize,
}

#[async_trait]
impl ChatModel for FakeChat {
    async fn chat(&self, _system_prompt: &str, turns: &[ChatTurn], _temperature: Option<f32>) -> Result<String, LlmError> {
        self.last_turn_count.store(turns.len(), Ordering::SeqCst);
        let last = turns
            .last()
            .map(|t| t.content.clone())
            .unwrap_or_default();
        Ok(format!("You said: {}", last))
    }
}

/// In-memory store that counts message writes.
#[derive(Default)]
pub struct CountingStore {
    inner: InMemoryConversationStore,
    pub message_writes: AtomicUsize,
}

#[async_trait]
impl ConversationStore for CountingStore {
    async fn create(&self, conversation: Conversation) -> Result<String, StoreError> {
        self.inner.create(conversation).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Conversation>, StoreError> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_user(&self, user_id: &str, limit: i64) -> Result<Vec<Conversation>, StoreError> {
        self.inner.find_by_user(user_id, limit).await
    }

    async fn add_messages(&self, id: &str, messages: Vec<Message>) -> Result<bool, StoreError> {
        self.message_writes.fetch_add(1, Ordering::SeqCst);
        self.inner.add_messages(id, messages).await
    }

    async fn update_title(&self, id: &str, title: String) -> Result<bool, StoreError> {
        self.inner.update_title(id, title).await
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        self.inner.delete(id).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }

    fn backend(&self) -> &'static str {
        self.inner.backend()
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub registry: Arc<TempArtifactRegistry>,
    pub recognizer: Arc<FakeRecognizer>,
    pub chat: Arc<FakeChat>,
    pub store: Arc<CountingStore>,
    pub upload_dir: TempDir,
    pub debug_dir: TempDir,
}

pub struct TestOptions {
    pub catalog: Catalog,
    pub recognizer_delay: Duration,
    pub max_concurrency: usize,
    pub keep_silent_uploads: bool,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            catalog: Catalog::Available,
            recognizer_delay: Duration::ZERO,
            max_concurrency: 4,
            keep_silent_uploads: false,
        }
    }
}

pub fn test_app() -> TestApp {
    test_app_with(TestOptions::default())
}

pub fn test_app_with(options: TestOptions) -> TestApp {
    let upload_dir = TempDir::new().unwrap();
    let debug_dir = TempDir::new().unwrap();
    let registry = Arc::new(TempArtifactRegistry::new());
    let recognizer = Arc::new(FakeRecognizer::with_delay(options.recognizer_delay));
    let chat = Arc::new(FakeChat::default());
    let store = Arc::new(CountingStore::default());

    let backend: Arc<dyn TranslationBackend> = Arc::new(FakeTranslation::new(options.catalog));
    let languages = Arc::new(LanguageResolver::new(Arc::clone(&backend)));
    let translator = Arc::new(Translator::new(backend));

    let debug = options
        .keep_silent_uploads
        .then(|| debug_dir.path().to_path_buf());

    let pipeline = PredictionPipeline::new(
        UploadMaterializer::new(upload_dir.path(), Arc::clone(&registry)),
        Transcriber::new(recognizer.clone(), options.max_concurrency),
        Arc::clone(&languages),
        Arc::clone(&translator),
    )
    .with_debug_dir(debug);

    let state = AppState {
        pipeline: Arc::new(pipeline),
        languages,
        translator,
        assistant: chat.clone(),
        conversations: store.clone(),
    };

    let app = Router::new()
        .merge(modules::health::routes::routes())
        .merge(modules::predict::routes::routes())
        .merge(modules::conversation::routes::routes())
        .with_state(state.clone());

    TestApp {
        server: TestServer::new(app).unwrap(),
        state,
        registry,
        recognizer,
        chat,
        store,
        upload_dir,
        debug_dir,
    }
}

pub fn files_in(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}
