//! API middleware.

#![allow(missing_docs)]

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use huddle_core::{
    AuthService, ChatListService, GroupService, MessageService, OrganizationService, UserService,
};

use crate::gateway::GatewayState;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub user_service: UserService,
    pub organization_service: OrganizationService,
    pub group_service: GroupService,
    pub message_service: MessageService,
    pub chat_list_service: ChatListService,
    pub gateway: GatewayState,
}

/// Authentication middleware.
///
/// Resolves the bearer credential to an [`huddle_core::AuthIdentity`] and
/// stores it in request extensions. Requests without a valid credential pass
/// through unauthenticated; the extractor rejects them where auth is
/// required.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
        && let Ok(identity) = state.auth_service.verify_token(token).await
    {
        req.extensions_mut().insert(identity);
    }

    next.run(req).await
}
