use axum::{
    routing::{get, post},
    Router,
};

use crate::modules::predict::controller;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/predict", post(controller::predict))
        .route("/api/formats", get(controller::supported_formats))
}
