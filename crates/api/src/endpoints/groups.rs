//! Group endpoints: CRUD, membership, and group message history.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, post},
};
use chrono::{DateTime, Utc};
use huddle_common::AppResult;
use huddle_core::{
    AddGroupMemberInput, CreateGroupInput, GroupMemberEntry, SendGroupMessageInput,
};
use huddle_db::entities::{group, group_member::GroupRole, group_message};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Create groups router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_group))
        .route("/", get(list_groups))
        .route("/{group_id}", get(get_group))
        .route("/{group_id}/members", get(list_members))
        .route("/{group_id}/members", post(add_member))
        .route("/{group_id}/members/{user_id}", delete(remove_member))
        .route("/{group_id}/messages", get(get_messages))
        .route("/{group_id}/messages", post(send_message))
        .route("/{group_id}/messages/seen", post(mark_seen))
}

/// Group response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupResponse {
    pub id: String,
    pub org_id: String,
    pub name: String,
    pub description: Option<String>,
    pub creator_id: String,
    pub is_private: bool,
    pub category: Option<String>,
    pub members_count: i64,
    pub created_at: DateTime<Utc>,
}

impl From<group::Model> for GroupResponse {
    fn from(group: group::Model) -> Self {
        Self {
            id: group.id,
            org_id: group.org_id,
            name: group.name,
            description: group.description,
            creator_id: group.creator_id,
            is_private: group.is_private,
            category: group.category,
            members_count: group.members_count,
            created_at: group.created_at.into(),
        }
    }
}

/// Group member response, joined to the user record.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMemberResponse {
    pub user_id: String,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    pub role: GroupRole,
    pub joined_at: DateTime<Utc>,
}

impl From<GroupMemberEntry> for GroupMemberResponse {
    fn from(entry: GroupMemberEntry) -> Self {
        Self {
            user_id: entry.user.id,
            username: entry.user.username,
            first_name: entry.user.first_name,
            last_name: entry.user.last_name,
            avatar_url: entry.user.avatar_url,
            role: entry.member.role,
            joined_at: entry.member.joined_at.into(),
        }
    }
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

/// Create a group.
async fn create_group(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateGroupInput>,
) -> AppResult<ApiResponse<GroupResponse>> {
    let group = state.group_service.create(&identity.id, input).await?;

    info!(group_id = %group.id, creator = %identity.id, "Group created");

    Ok(ApiResponse::ok(GroupResponse::from(group)))
}

/// Organization filter for group listing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListGroupsQuery {
    org_id: String,
    #[serde(default = "default_page")]
    page: u64,
    #[serde(default = "default_limit")]
    limit: u64,
}

/// List an organization's groups.
async fn list_groups(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListGroupsQuery>,
) -> AppResult<ApiResponse<Vec<GroupResponse>>> {
    let page = query.page.max(1);
    let groups = state
        .group_service
        .list_for_org(&identity.id, &query.org_id, query.limit, (page - 1) * query.limit)
        .await?;

    Ok(ApiResponse::ok(
        groups.into_iter().map(GroupResponse::from).collect(),
    ))
}

/// Get a group.
async fn get_group(
    AuthUser(_identity): AuthUser,
    State(state): State<AppState>,
    Path(group_id): Path<String>,
) -> AppResult<ApiResponse<GroupResponse>> {
    let group = state.group_service.get(&group_id).await?;
    Ok(ApiResponse::ok(GroupResponse::from(group)))
}

/// List a group's members.
async fn list_members(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<ApiResponse<Vec<GroupMemberResponse>>> {
    let page = query.page.max(1);
    let members = state
        .group_service
        .list_members(&identity.id, &group_id, query.limit, (page - 1) * query.limit)
        .await?;

    Ok(ApiResponse::ok(
        members.into_iter().map(GroupMemberResponse::from).collect(),
    ))
}

/// Add a member to a group. Group-admin gated.
async fn add_member(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    Json(input): Json<AddGroupMemberInput>,
) -> AppResult<ApiResponse<()>> {
    let member = state
        .group_service
        .add_member(&identity.id, &group_id, input)
        .await?;

    info!(group_id = %group_id, user_id = %member.user_id, "Group member added");

    Ok(ApiResponse::ok(()))
}

/// Remove a member from a group.
async fn remove_member(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path((group_id, user_id)): Path<(String, String)>,
) -> AppResult<ApiResponse<()>> {
    state
        .group_service
        .remove_member(&identity.id, &group_id, &user_id)
        .await?;

    info!(group_id = %group_id, user_id = %user_id, "Group member removed");

    Ok(ApiResponse::ok(()))
}

/// Message list response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMessageListResponse {
    pub page: u64,
    pub messages: Vec<group_message::Model>,
}

/// Paginated group message history, newest first.
async fn get_messages(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<ApiResponse<GroupMessageListResponse>> {
    let page = query.page.max(1);
    let messages = state
        .message_service
        .group_history(&identity.id, &group_id, page, query.limit)
        .await?;

    Ok(ApiResponse::ok(GroupMessageListResponse { page, messages }))
}

/// Send request body: the path names the group.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendGroupMessageRequest {
    message: String,
    #[serde(default)]
    message_type: huddle_db::entities::group_message::MessageKind,
    file_url: Option<String>,
}

/// Send a group message over HTTP.
async fn send_message(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    Json(req): Json<SendGroupMessageRequest>,
) -> AppResult<ApiResponse<group_message::Model>> {
    let message = state
        .message_service
        .send_group(
            &identity.id,
            SendGroupMessageInput {
                group_id,
                message: req.message,
                message_type: req.message_type,
                file_url: req.file_url,
            },
        )
        .await?;

    Ok(ApiResponse::ok(message))
}

/// Seen response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkSeenResponse {
    pub marked: u64,
}

/// Mark the group's messages as seen by the caller.
async fn mark_seen(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(group_id): Path<String>,
) -> AppResult<ApiResponse<MarkSeenResponse>> {
    let marked = state
        .message_service
        .mark_group_seen(&identity.id, &group_id)
        .await?;

    Ok(ApiResponse::ok(MarkSeenResponse { marked }))
}
