//! # station-relay
//!
//! WebSocket relay between a fixed set of remote station devices and any
//! number of browser viewers.
//!
//! Devices connect on `/<prefix>/<id>` and stream camera frames and status
//! responses; viewers connect on a single fixed path, receive every
//! broadcast and issue commands that are routed to exactly one device. The
//! relay knows nothing about users, sessions or stored records: it only
//! consumes a device-identifier namespace and emits lifecycle events.
//!
//! ## Architecture
//!
//! ```text
//! Devices (/rpi/<id>)          Viewers (/ws)
//!     │                            │
//!     └──── Upgrade Router (ws/) ──┘
//!                 │
//!          Relay Dispatcher (ws/)
//!                 │
//!          RelayService (service/)
//!                 │
//!     ├── DeviceRegistry (domain/)
//!     ├── ViewerSet (domain/)
//!     └── EventBus (domain/) ──► collaborators
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod ws;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

/// Builds the complete application router: REST introspection routes plus
/// the WebSocket Upgrade Router mounted as the fallback for every other
/// path.
pub fn build_app(state: AppState) -> Router {
    let router = Router::new().merge(api::build_router());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(api::openapi::swagger_router());

    router
        .merge(ws::build_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
