//! Chat HTTP routes
//!
//! The HTTP surface mirrors the websocket protocol: sends made here are
//! broadcast to live subscribers the same way.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    middleware::AuthUser,
    models::{ADMIN_SENTINEL, ChatView, MessageView},
    realtime::persist_and_broadcast,
    state::AppState,
};

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StartChatRequest {
    #[serde(default)]
    pub user_name: Option<String>,
}

/// Find or create the caller's support chat
pub async fn start(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<StartChatRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = payload
        .user_name
        .filter(|n| !n.trim().is_empty())
        .or_else(|| auth_user.email.clone())
        .unwrap_or_else(|| "User".to_string());

    let chat = state.chats.start_or_get(auth_user.id, &name).await?;
    Ok((StatusCode::OK, Json(chat)))
}

/// A chat with its history; visible to the chat's user and admins
pub async fn detail(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(chat_id): Path<Uuid>,
) -> ApiResult<Json<ChatView>> {
    let chat = state
        .chats
        .find_by_id(chat_id)
        .await?
        .ok_or(ApiError::NotFound("Chat"))?;

    if chat.user_id != auth_user.id && !auth_user.role.is_admin() {
        return Err(ApiError::Forbidden(
            "Cannot view another user's chat".to_string(),
        ));
    }

    let messages = state.chats.history(chat.id).await?;
    Ok(Json(ChatView {
        id: chat.id,
        user_id: chat.user_id,
        user_name: chat.user_name,
        messages: messages
            .iter()
            .map(|m| MessageView::project(m, chat.user_id))
            .collect(),
    }))
}

/// Every chat with its messages (admin dashboard)
pub async fn admin_chats(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<ChatView>>> {
    if !auth_user.role.is_admin() {
        return Err(ApiError::Forbidden("Admin access required".to_string()));
    }

    let chats = state.chats.list_all_with_messages().await?;
    Ok(Json(chats))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub chat_id: Uuid,
    pub content: String,
    #[serde(default)]
    pub sender_name: Option<String>,
}

/// Persist a message and fan it out to live subscribers. Admin senders
/// are recorded under the shared admin identity.
pub async fn send(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<SendMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    if payload.content.trim().is_empty() {
        return Err(ApiError::Validation("Message content is required".to_string()));
    }

    let chat = state
        .chats
        .find_by_id(payload.chat_id)
        .await?
        .ok_or(ApiError::NotFound("Chat"))?;

    if chat.user_id != auth_user.id && !auth_user.role.is_admin() {
        return Err(ApiError::Forbidden(
            "Cannot post in another user's chat".to_string(),
        ));
    }

    let sender_id = if auth_user.role.is_admin() && chat.user_id != auth_user.id {
        ADMIN_SENTINEL.to_string()
    } else {
        auth_user.id.to_string()
    };
    let sender_name = payload.sender_name.unwrap_or_default();

    let view = persist_and_broadcast(
        &state.chats,
        &state.registry,
        &chat,
        &sender_id,
        &sender_name,
        payload.content.trim(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(view)))
}
