//! Direct message endpoints: send, history, mark-seen, and the chat list.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use huddle_common::AppResult;
use huddle_core::{ChatListEntry, SendDirectMessageInput};
use huddle_db::entities::direct_message;
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Create messages router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(send_message))
        .route("/seen", post(mark_seen))
        .route("/chat-list", get(chat_list))
        .route("/{user_id}", get(get_conversation))
}

/// Send a direct message over HTTP. The sender is the authenticated caller.
async fn send_message(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<SendDirectMessageInput>,
) -> AppResult<ApiResponse<direct_message::Model>> {
    let message = state.message_service.send_direct(&identity.id, input).await?;

    Ok(ApiResponse::ok(message))
}

/// Paging query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageQuery {
    #[serde(default = "default_page")]
    page: u64,
    #[serde(default = "default_limit")]
    limit: u64,
}

const fn default_page() -> u64 {
    1
}

const fn default_limit() -> u64 {
    20
}

/// Conversation response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationResponse {
    pub page: u64,
    pub messages: Vec<direct_message::Model>,
}

/// Paginated conversation history with another user, newest first.
async fn get_conversation(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<ApiResponse<ConversationResponse>> {
    let page = query.page.max(1);
    let messages = state
        .message_service
        .direct_history(&identity.id, &user_id, page, query.limit)
        .await?;

    Ok(ApiResponse::ok(ConversationResponse { page, messages }))
}

/// Mark seen request: which sender's messages to mark.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarkSeenRequest {
    sender_id: String,
}

/// Seen response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkSeenResponse {
    pub marked: u64,
}

/// Mark every unseen message from a sender to the caller as seen.
async fn mark_seen(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<MarkSeenRequest>,
) -> AppResult<ApiResponse<MarkSeenResponse>> {
    let marked = state
        .message_service
        .mark_direct_seen(&identity.id, &req.sender_id)
        .await?;

    Ok(ApiResponse::ok(MarkSeenResponse { marked }))
}

/// The caller's chat list: one row per counterparty with the latest message
/// and unseen count.
async fn chat_list(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<ChatListEntry>>> {
    let entries = state.chat_list_service.chat_list(&identity.id).await?;

    Ok(ApiResponse::ok(entries))
}
