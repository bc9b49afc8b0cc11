//! API integration tests.
//!
//! These tests verify the router wiring and auth gating using a mock
//! database; no Postgres or Redis is required.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use huddle_api::{GatewayState, middleware::AppState, router as api_router};
use huddle_core::{
    AuthService, ChatListService, GroupService, MessageService, OrganizationService, UserService,
};
use huddle_db::repositories::{
    DirectMessageRepository, GroupMessageRepository, GroupRepository, OrganizationRepository,
    UserRepository,
};
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
use std::sync::Arc;
use tower::ServiceExt;

/// Create a mock database connection.
fn create_mock_db() -> DatabaseConnection {
    MockDatabase::new(DatabaseBackend::Postgres).into_connection()
}

/// Create test app state with a mock database and no cache attached.
fn create_test_state() -> AppState {
    let db = Arc::new(create_mock_db());

    let user_repo = UserRepository::new(Arc::clone(&db));
    let org_repo = OrganizationRepository::new(Arc::clone(&db));
    let group_repo = GroupRepository::new(Arc::clone(&db));
    let dm_repo = DirectMessageRepository::new(Arc::clone(&db));
    let gm_repo = GroupMessageRepository::new(Arc::clone(&db));

    AppState {
        auth_service: AuthService::new(user_repo.clone(), org_repo.clone()),
        user_service: UserService::new(user_repo.clone(), org_repo.clone()),
        organization_service: OrganizationService::new(org_repo.clone(), user_repo.clone()),
        group_service: GroupService::new(group_repo.clone(), org_repo.clone(), user_repo.clone()),
        message_service: MessageService::new(
            dm_repo.clone(),
            gm_repo,
            group_repo,
            org_repo,
            user_repo.clone(),
        ),
        chat_list_service: ChatListService::new(dm_repo, user_repo),
        gateway: GatewayState::new(),
    }
}

fn test_app() -> Router {
    let state = create_test_state();
    Router::new()
        .nest("/api", api_router())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            huddle_api::middleware::auth_middleware,
        ))
        .with_state(state)
}

#[tokio::test]
async fn test_me_requires_authentication() {
    let app = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/users/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_chat_list_requires_authentication() {
    let app = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/messages/chat-list")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/does-not-exist")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
