//! Upgrade Router.
//!
//! Classifies an incoming upgrade request by path before the WebSocket
//! handshake completes. Rejected requests never produce a connection.

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::http::Uri;
use axum::response::{IntoResponse, Response};

use super::connection::{run_device_connection, run_viewer_connection};
use crate::app_state::AppState;
use crate::config::RelayConfig;
use crate::domain::DeviceId;
use crate::error::RelayError;

/// Outcome of classifying an upgrade path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeRoute {
    /// `/<prefix>/<id>`.
    Device(DeviceId),
    /// The configured viewer path.
    Viewer,
}

/// Classifies `path` against the configured device prefix and viewer path.
///
/// Matching is case-sensitive. The device identifier must be exactly one
/// non-empty path segment and is used verbatim.
///
/// # Errors
///
/// Returns [`RelayError::MissingDeviceId`] for `/<prefix>` or `/<prefix>/`,
/// and [`RelayError::UnknownPath`] for anything else that is not a match.
pub fn classify(path: &str, config: &RelayConfig) -> Result<UpgradeRoute, RelayError> {
    if path == config.viewer_path {
        return Ok(UpgradeRoute::Viewer);
    }

    let Some(rest) = path
        .strip_prefix('/')
        .and_then(|p| p.strip_prefix(config.device_path_prefix.as_str()))
    else {
        return Err(RelayError::UnknownPath(path.to_string()));
    };

    match rest {
        "" | "/" => Err(RelayError::MissingDeviceId),
        _ => match rest.strip_prefix('/') {
            Some(id) if !id.contains('/') => Ok(UpgradeRoute::Device(DeviceId::new(id)?)),
            _ => Err(RelayError::UnknownPath(path.to_string())),
        },
    }
}

/// Fallback handler: classifies the path, then completes the handshake as
/// a device or viewer connection.
pub async fn upgrade_handler(
    State(state): State<AppState>,
    uri: Uri,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let route = match classify(uri.path(), &state.config) {
        Ok(route) => route,
        Err(e) => {
            tracing::warn!(path = uri.path(), error = %e, "rejected upgrade");
            return e.into_response();
        }
    };

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => {
            tracing::warn!(path = uri.path(), error = %rejection, "not a websocket upgrade");
            return rejection.into_response();
        }
    };

    let relay = std::sync::Arc::clone(&state.relay);
    match route {
        UpgradeRoute::Device(device_id) => {
            tracing::debug!(%device_id, "device upgrade accepted");
            ws.on_upgrade(move |socket| run_device_connection(socket, device_id, relay))
        }
        UpgradeRoute::Viewer => {
            ws.on_upgrade(move |socket| run_viewer_connection(socket, relay))
        }
    }
}
