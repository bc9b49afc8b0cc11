//! Authentication endpoints.

use axum::{Json, Router, extract::State, routing::post};
use huddle_common::{AppError, AppResult};
use huddle_core::{LoginInput, RegisterInput, UserProfile};
use serde::Serialize;
use tracing::info;

use crate::{middleware::AppState, response::ApiResponse};

/// Create auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// Session response: the bearer token and the user it belongs to.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub token: String,
    pub user: UserProfile,
}

/// Register a new account.
async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> AppResult<ApiResponse<SessionResponse>> {
    let user = state.auth_service.register(input).await?;

    info!(user_id = %user.id, "Registration completed");

    let token = user
        .token
        .clone()
        .ok_or_else(|| AppError::Internal("Registered user has no token".to_string()))?;

    Ok(ApiResponse::ok(SessionResponse {
        token,
        user: UserProfile::from(user),
    }))
}

/// Log in with username and password.
async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> AppResult<ApiResponse<SessionResponse>> {
    let user = state.auth_service.login(input).await?;

    let token = user
        .token
        .clone()
        .ok_or_else(|| AppError::Internal("Authenticated user has no token".to_string()))?;

    Ok(ApiResponse::ok(SessionResponse {
        token,
        user: UserProfile::from(user),
    }))
}
