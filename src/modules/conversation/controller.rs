use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::fmt::Display;
use validator::Validate;

use crate::modules::conversation::{
    model::{Conversation, Message},
    schema::{
        AddMessageRequest, AddMessageResponse, ChatRequest, ChatResponse, ConversationResponse,
        ConversationSummary, CreateConversationRequest, CreatedResponse, MessageResponse,
        ProcessRequest, ProcessResponse, StatusMessage, UpdateConversationRequest,
    },
};
use crate::modules::predict::pipeline::DEFAULT_TARGET_LANGUAGE;
use crate::services::language::ResolvedLanguage;
use crate::services::llm::ChatTurn;
use crate::services::translate::AUTO_SOURCE;
use crate::AppState;

const CONVERSATION_LIMIT: i64 = 50;
const CONTEXT_MESSAGES: usize = 10;
const CHAT_SYSTEM_PROMPT: &str = "You are a helpful assistant for parents navigating their \
    children's school system. Give clear, empathetic and professional answers, and say so \
    when you are not sure.";

type ApiError = (StatusCode, Json<StatusMessage>);

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(StatusMessage { message: message.into() }))
}

fn internal(e: impl Display) -> ApiError {
    tracing::error!(error = %e, "Conversation request failed");
    error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

fn not_found() -> ApiError {
    error(StatusCode::NOT_FOUND, "Conversation not found")
}

fn validate(payload: &impl Validate) -> Result<(), ApiError> {
    payload
        .validate()
        .map_err(|e| error(StatusCode::BAD_REQUEST, e.to_string()))
}

fn to_message_response(m: &Message) -> MessageResponse {
    MessageResponse {
        id: m.id.clone(),
        sender: m.sender,
        text: m.text.clone(),
        language: m.language.clone(),
        timestamp: m.timestamp.to_rfc3339(),
    }
}

fn to_conversation_response(c: &Conversation) -> ConversationResponse {
    ConversationResponse {
        id: c.id.clone(),
        user_id: c.user_id.clone(),
        title: c.title.clone(),
        language: c.language.clone(),
        messages: c.messages.iter().map(to_message_response).collect(),
        created_at: c.created_at.to_rfc3339(),
        updated_at: c.updated_at.to_rfc3339(),
    }
}

fn to_summary(c: &Conversation) -> ConversationSummary {
    ConversationSummary {
        id: c.id.clone(),
        user_id: c.user_id.clone(),
        name: c.title.clone(),
        created_at: c.created_at.to_rfc3339(),
    }
}

async fn load(state: &AppState, id: &str) -> Result<Conversation, ApiError> {
    state
        .conversations
        .find_by_id(id)
        .await
        .map_err(internal)?
        .ok_or_else(not_found)
}

async fn resolve_language(state: &AppState, requested: &str) -> Result<ResolvedLanguage, ApiError> {
    state.languages.resolve(requested).await.map_err(|e| {
        error(
            StatusCode::BAD_REQUEST,
            format!("Unsupported language '{}': {}", requested, e),
        )
    })
}

pub async fn create_conversation(
    State(state): State<AppState>,
    Json(payload): Json<CreateConversationRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    validate(&payload)?;

    let language = payload
        .language
        .unwrap_or_else(|| DEFAULT_TARGET_LANGUAGE.to_string());
    let mut conversation = Conversation::new(payload.user_id, payload.title, language.clone());

    if let Some(greeting) = payload.initial_message.filter(|m| !m.trim().is_empty()) {
        conversation.messages.push(Message::bot(greeting, Some(language)));
    }

    let id = state
        .conversations
        .create(conversation)
        .await
        .map_err(internal)?;

    tracing::info!(conversation_id = %id, "Conversation created");
    Ok((StatusCode::CREATED, Json(CreatedResponse { inserted_id: id })))
}

pub async fn list_user_conversations(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<ConversationSummary>>, ApiError> {
    let conversations = state
        .conversations
        .find_by_user(&user_id, CONVERSATION_LIMIT)
        .await
        .map_err(internal)?;

    Ok(Json(conversations.iter().map(to_summary).collect()))
}

pub async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationResponse>, ApiError> {
    let conversation = load(&state, &id).await?;
    Ok(Json(to_conversation_response(&conversation)))
}

pub async fn update_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateConversationRequest>,
) -> Result<Json<ConversationResponse>, ApiError> {
    validate(&payload)?;

    let updated = state
        .conversations
        .update_title(&id, payload.title)
        .await
        .map_err(internal)?;
    if !updated {
        return Err(not_found());
    }

    let conversation = load(&state, &id).await?;
    Ok(Json(to_conversation_response(&conversation)))
}

pub async fn delete_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StatusMessage>, ApiError> {
    match state.conversations.delete(&id).await {
        Ok(true) => Ok(Json(StatusMessage { message: "Deleted successfully".to_string() })),
        Ok(false) => Err(not_found()),
        Err(e) => Err(internal(e)),
    }
}

pub async fn list_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<MessageResponse>>, ApiError> {
    let conversation = load(&state, &id).await?;
    Ok(Json(conversation.messages.iter().map(to_message_response).collect()))
}

pub async fn add_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<AddMessageRequest>,
) -> Result<Json<AddMessageResponse>, ApiError> {
    validate(&payload)?;

    let message = Message::new(payload.sender, payload.text, payload.language);
    let message_id = message.id.clone();

    match state.conversations.add_message(&id, message).await {
        Ok(true) => Ok(Json(AddMessageResponse {
            status: "success",
            message_id,
        })),
        Ok(false) => Err(not_found()),
        Err(e) => Err(internal(e)),
    }
}

/// One chat turn: the assistant answers over recent history, and the answer is
/// translated into the conversation's language before both turns are stored.
pub async fn chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    validate(&payload)?;

    let conversation = load(&state, &id).await?;
    let requested = payload
        .language
        .unwrap_or_else(|| conversation.language.clone());
    let language = resolve_language(&state, &requested).await?;

    let user_message = Message::user(payload.message, Some(language.code.clone()));

    let mut turns: Vec<ChatTurn> = conversation
        .get_context_messages(CONTEXT_MESSAGES)
        .iter()
        .map(Message::to_chat_turn)
        .collect();
    turns.push(user_message.to_chat_turn());

    let reply = state
        .assistant
        .chat(CHAT_SYSTEM_PROMPT, &turns, Some(0.7))
        .await
        .map_err(internal)?;

    let translation = state
        .translator
        .translate(&reply, AUTO_SOURCE, &language.code)
        .await
        .map_err(internal)?;

    let bot_message = Message::bot(translation.text.clone(), Some(language.code.clone()));
    let message_id = bot_message.id.clone();

    if !state
        .conversations
        .add_messages(&id, vec![user_message, bot_message])
        .await
        .map_err(internal)?
    {
        return Err(not_found());
    }

    Ok(Json(ChatResponse {
        message_id,
        reply: translation.text,
        language: language.code,
    }))
}

/// Translates free text and records it as a bot message in the conversation.
pub async fn process(
    State(state): State<AppState>,
    Json(payload): Json<ProcessRequest>,
) -> Result<Json<ProcessResponse>, ApiError> {
    validate(&payload)?;

    load(&state, &payload.conversation_id).await?;

    let requested = payload
        .target_language
        .unwrap_or_else(|| DEFAULT_TARGET_LANGUAGE.to_string());
    let language = resolve_language(&state, &requested).await?;

    let translation = state
        .translator
        .translate(&payload.message, AUTO_SOURCE, &language.code)
        .await
        .map_err(internal)?;

    let message = Message::bot(translation.text.clone(), Some(language.code.clone()));
    let message_id = message.id.clone();

    if !state
        .conversations
        .add_message(&payload.conversation_id, message)
        .await
        .map_err(internal)?
    {
        return Err(not_found());
    }

    Ok(Json(ProcessResponse {
        message_id,
        translation: translation.text,
        original: payload.message,
        language: language.code,
        status: "success",
    }))
}
