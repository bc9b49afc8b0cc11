//! API endpoints.

mod auth;
mod groups;
mod messages;
mod organizations;
mod users;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/organizations", organizations::router())
        .nest("/groups", groups::router())
        .nest("/messages", messages::router())
}
