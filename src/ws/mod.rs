//! WebSocket layer: upgrade routing, connection loops, dispatch.
//!
//! Devices connect on `/<prefix>/<id>` and viewers on a single fixed path.
//! Each accepted socket runs as its own task that reads frames in arrival
//! order and hands them to the [`dispatcher`].

pub mod connection;
pub mod dispatcher;
pub mod frame;
pub mod handler;
pub mod messages;

use axum::Router;

use crate::app_state::AppState;

/// Router that classifies every path not claimed by the REST API as a
/// device or viewer upgrade.
pub fn build_router() -> Router<AppState> {
    Router::new().fallback(handler::upgrade_handler)
}
