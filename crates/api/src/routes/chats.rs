//! Chat routes

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use campusnet_shared::{Chat, Message, MessagePage, MessageType};

use super::extract::{ApiJson, ApiPath, ApiQuery};
use crate::{auth::AuthUser, error::ApiResult, state::AppState};

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub content: String,
    #[serde(default)]
    pub message_type: MessageType,
}

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub updated: u64,
}

/// List the caller's chats, most recent activity first
pub async fn list_chats(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<Chat>>> {
    let chats = state.chats.list_chats(auth_user.user_id).await?;
    Ok(Json(chats))
}

/// Get or create the chat with a connected user
pub async fn chat_with_user(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> ApiResult<Json<Chat>> {
    let chat = state.chats.open_chat(auth_user.user_id, user_id).await?;
    Ok(Json(chat))
}

/// Page through a chat's history
pub async fn get_messages(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    ApiPath(chat_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<HistoryQuery>,
) -> ApiResult<Json<MessagePage>> {
    let page = state
        .chats
        .history(chat_id, auth_user.user_id, query.page, query.limit)
        .await?;
    Ok(Json(page))
}

/// Persist a message and push it to the recipient if online
pub async fn send_message(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    ApiPath(chat_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<SendMessageRequest>,
) -> ApiResult<(StatusCode, Json<Message>)> {
    let sent = state
        .chats
        .send_message(chat_id, auth_user.user_id, req.content, req.message_type)
        .await?;
    Ok((StatusCode::CREATED, Json(sent.message)))
}

/// Mark every message in the chat read by the caller
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    ApiPath(chat_id): ApiPath<Uuid>,
) -> ApiResult<Json<MarkReadResponse>> {
    let updated = state.receipts.mark_read(chat_id, auth_user.user_id).await?;
    Ok(Json(MarkReadResponse { updated }))
}
