use axum::extract::DefaultBodyLimit;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::modules::conversation::store::ConversationStore;
use crate::modules::predict::pipeline::PredictionPipeline;
use crate::services::language::LanguageResolver;
use crate::services::llm::ChatModel;
use crate::services::translate::Translator;

pub mod config;
pub mod modules;
pub mod services;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<PredictionPipeline>,
    pub languages: Arc<LanguageResolver>,
    pub translator: Arc<Translator>,
    pub assistant: Arc<dyn ChatModel>,
    pub conversations: Arc<dyn ConversationStore>,
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .merge(modules::health::routes::routes())
        .merge(modules::predict::routes::routes())
        .merge(modules::conversation::routes::routes())
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
