//! User endpoints.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, patch, post},
};
use huddle_common::AppResult;
use huddle_core::{UpdateProfileInput, UserProfile};
use serde::Deserialize;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Create users router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/me", get(get_me))
        .route("/me", patch(update_me))
        .route("/me/active-org", post(set_active_org))
}

/// Get the authenticated user's profile.
async fn get_me(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<UserProfile>> {
    let profile = state.user_service.get_profile(&identity.id).await?;
    Ok(ApiResponse::ok(profile))
}

/// Update the authenticated user's profile.
async fn update_me(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UpdateProfileInput>,
) -> AppResult<ApiResponse<UserProfile>> {
    let profile = state.user_service.update_profile(&identity.id, input).await?;
    Ok(ApiResponse::ok(profile))
}

/// List users.
async fn list_users(
    AuthUser(_identity): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<UserProfile>>> {
    let users = state.user_service.list_users().await?;
    Ok(ApiResponse::ok(users))
}

/// Set active organization request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetActiveOrgRequest {
    org_id: String,
}

/// Switch the authenticated user's active organization.
async fn set_active_org(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<SetActiveOrgRequest>,
) -> AppResult<ApiResponse<UserProfile>> {
    let profile = state
        .user_service
        .set_active_org(&identity.id, &req.org_id)
        .await?;
    Ok(ApiResponse::ok(profile))
}
