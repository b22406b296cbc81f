//! REST API layer: read-only introspection of the relay.
//!
//! Relay endpoints are mounted under `/api/v1`; `/health` sits at the root.
//! Everything else falls through to the WebSocket Upgrade Router.

pub mod handlers;
#[cfg(feature = "swagger-ui")]
pub mod openapi;

use axum::Router;

use crate::app_state::AppState;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
}
