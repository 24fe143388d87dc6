// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! AI tutor chat proxy.

use crate::error::{AppError, Result};
use crate::extract::{AppJson, AppPath};
use crate::middleware::auth::AuthUser;
use crate::services::openai::ChatMessage;
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

const DEFAULT_CONVERSATION: &str = "default";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/chat", post(send_message))
        .route(
            "/api/v1/chat/{conversation_id}",
            get(get_history).delete(clear_history),
        )
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, max = 4000, message = "must be 1 to 4000 characters"))]
    pub message: String,
    #[validate(length(min = 1, max = 100, message = "must be 1 to 100 characters"))]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub conversation_id: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub conversation_id: String,
    pub messages: Vec<ChatMessage>,
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    AppJson(payload): AppJson<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    payload.validate()?;

    if !state.openai.is_configured() {
        return Err(AppError::ServiceUnavailable(
            "Chat is not configured".to_string(),
        ));
    }

    let conversation_id = payload
        .conversation_id
        .unwrap_or_else(|| DEFAULT_CONVERSATION.to_string());

    let question = ChatMessage::user(payload.message);
    let prompt = state
        .chat_history
        .prompt(&auth.user_id, &conversation_id, &question);

    let reply = state.openai.complete(&prompt).await?;

    state.chat_history.record_exchange(
        &auth.user_id,
        &conversation_id,
        question,
        ChatMessage::assistant(reply.clone()),
    );

    tracing::debug!(
        user_id = %auth.user_id,
        conversation_id = %conversation_id,
        prompt_messages = prompt.len(),
        "Chat reply generated"
    );

    Ok(Json(ChatResponse {
        reply,
        conversation_id,
    }))
}

async fn get_history(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    AppPath(conversation_id): AppPath<String>,
) -> Json<HistoryResponse> {
    let messages = state.chat_history.get(&auth.user_id, &conversation_id);
    Json(HistoryResponse {
        conversation_id,
        messages,
    })
}

async fn clear_history(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    AppPath(conversation_id): AppPath<String>,
) -> StatusCode {
    state.chat_history.clear(&auth.user_id, &conversation_id);
    StatusCode::NO_CONTENT
}
