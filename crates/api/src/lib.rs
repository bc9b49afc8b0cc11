//! HTTP API layer for huddle.
//!
//! This crate provides the REST API and the realtime gateway:
//!
//! - **Endpoints**: auth, users, organizations, groups, messages
//! - **Extractors**: authenticated identity
//! - **Middleware**: bearer-token authentication
//! - **Gateway**: WebSocket connection handling, presence, and fan-out
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod gateway;
pub mod middleware;
pub mod registry;
pub mod response;

pub use endpoints::router;
pub use gateway::{GatewayState, gateway_handler};
pub use registry::ConnectionRegistry;
