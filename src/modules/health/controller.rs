use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub store: &'static str,
    pub pending_artifacts: usize,
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Bridge speech-to-text & translation API is live",
    })
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let pending_artifacts = state.pipeline.registry().len();

    match state.conversations.ping().await {
        Ok(()) => {
            let store = match state.conversations.backend() {
                "memory" => "memory",
                _ => "connected",
            };
            (
                StatusCode::OK,
                Json(HealthResponse {
                    status: "healthy",
                    store,
                    pending_artifacts,
                }),
            )
        }
        Err(e) => {
            tracing::warn!(error = %e, "Conversation store unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unhealthy",
                    store: "disconnected",
                    pending_artifacts,
                }),
            )
        }
    }
}
