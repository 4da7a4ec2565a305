use axum::{
    routing::{get, post},
    Router,
};

use crate::modules::conversation::controller;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/conversations", post(controller::create_conversation))
        .route(
            "/api/conversations/{id}",
            get(controller::get_conversation)
                .patch(controller::update_conversation)
                .delete(controller::delete_conversation),
        )
        .route(
            "/api/conversations/{id}/messages",
            get(controller::list_messages).post(controller::add_message),
        )
        .route("/api/conversations/{id}/chat", post(controller::chat))
        .route("/api/users/{user_id}/conversations", get(controller::list_user_conversations))
        .route("/api/ai/process", post(controller::process))
}
