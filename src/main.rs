use std::sync::Arc;
use tokio::net::TcpListener;

use bridge::config::settings::{Settings, StoreBackend, TranslationProvider};
use bridge::config::{database, logging};
use bridge::modules::conversation::crud::MongoConversationStore;
use bridge::modules::conversation::memory::InMemoryConversationStore;
use bridge::modules::conversation::store::ConversationStore;
use bridge::modules::predict::pipeline::PredictionPipeline;
use bridge::services::artifacts::{TempArtifactRegistry, UploadMaterializer};
use bridge::services::language::LanguageResolver;
use bridge::services::llm::LlmClient;
use bridge::services::stt::{SttClient, Transcriber};
use bridge::services::translate::{GoogleTranslateClient, LlmTranslator, TranslationBackend, Translator};
use bridge::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    logging::init(settings.json_logs);

    tokio::fs::create_dir_all(&settings.uploads.upload_dir).await?;
    if let Some(debug_dir) = &settings.uploads.debug_dir {
        tokio::fs::create_dir_all(debug_dir).await?;
    }

    let registry = Arc::new(TempArtifactRegistry::new());

    let stt = SttClient::new(&settings.stt, settings.backend_timeout)?;
    tracing::info!(model = stt.model(), "Speech recognizer ready");

    let llm = LlmClient::new(&settings.llm, settings.backend_timeout)?;

    let translation_backend: Arc<dyn TranslationBackend> = match settings.translation.provider {
        TranslationProvider::Google => Arc::new(GoogleTranslateClient::new(
            &settings.translation,
            settings.backend_timeout,
        )?),
        TranslationProvider::Llm => Arc::new(LlmTranslator::new(llm.clone())),
    };

    let conversations: Arc<dyn ConversationStore> = match settings.store.backend {
        StoreBackend::MongoDb => {
            let db = database::connect(&settings.store).await?;
            Arc::new(MongoConversationStore::new(&db))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory conversation store; data is lost on restart");
            Arc::new(InMemoryConversationStore::new())
        }
    };

    let languages = Arc::new(LanguageResolver::new(Arc::clone(&translation_backend)));
    let translator = Arc::new(Translator::new(translation_backend));

    let pipeline = PredictionPipeline::new(
        UploadMaterializer::new(&settings.uploads.upload_dir, Arc::clone(&registry)),
        Transcriber::new(Arc::new(stt), settings.stt.max_concurrency),
        Arc::clone(&languages),
        Arc::clone(&translator),
    )
    .with_debug_dir(settings.uploads.debug_dir.clone());

    let state = AppState {
        pipeline: Arc::new(pipeline),
        languages,
        translator,
        assistant: Arc::new(llm),
        conversations,
    };

    let app = bridge::router(state, settings.uploads.max_upload_bytes);

    let listener = TcpListener::bind(settings.bind_address()).await?;
    tracing::info!(address = %settings.bind_address(), "Bridge listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let swept = registry.cleanup_all();
    tracing::info!(swept, "Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
