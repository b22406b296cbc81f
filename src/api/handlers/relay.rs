//! Relay introspection: connected devices and viewers.
//!
//! Collaborators (station dashboards, admin pages) poll these instead of
//! reaching into the relay's state.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::domain::Subscription;

/// Connected devices.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeviceListResponse {
    /// Registered identifiers, sorted.
    pub devices: Vec<String>,
    /// Number of registered devices.
    pub count: usize,
}

/// Connected viewers.
#[derive(Debug, Serialize, ToSchema)]
pub struct ViewerListResponse {
    /// Number of connected viewers.
    pub count: usize,
    /// Subscriptions declared by viewers that sent `register`.
    pub subscriptions: Vec<Subscription>,
}

/// `GET /devices` — Devices currently holding a connection.
#[utoipa::path(
    get,
    path = "/api/v1/devices",
    tag = "Relay",
    summary = "List connected devices",
    description = "Returns the identifiers currently present in the connection registry.",
    responses(
        (status = 200, description = "Connected devices", body = DeviceListResponse),
    )
)]
pub async fn list_devices(State(state): State<AppState>) -> Json<DeviceListResponse> {
    let devices: Vec<String> = state
        .relay
        .devices()
        .ids()
        .await
        .into_iter()
        .map(String::from)
        .collect();
    Json(DeviceListResponse {
        count: devices.len(),
        devices,
    })
}

/// `GET /viewers` — Viewer count and declared subscriptions.
#[utoipa::path(
    get,
    path = "/api/v1/viewers",
    tag = "Relay",
    summary = "List connected viewers",
    description = "Returns how many viewers are connected and the subscriptions they declared.",
    responses(
        (status = 200, description = "Connected viewers", body = ViewerListResponse),
    )
)]
pub async fn list_viewers(State(state): State<AppState>) -> Json<ViewerListResponse> {
    let viewers = state.relay.viewers();
    Json(ViewerListResponse {
        count: viewers.len().await,
        subscriptions: viewers.subscriptions().await,
    })
}

/// Relay routes mounted under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/devices", get(list_devices))
        .route("/viewers", get(list_viewers))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::RelayConfig;
    use crate::domain::{ConnectionHandle, DeviceId, EventBus};
    use crate::service::RelayService;

    fn state() -> AppState {
        let config = Arc::new(RelayConfig::default());
        let relay = Arc::new(RelayService::new(&config, EventBus::new(8)));
        AppState { relay, config }
    }

    #[tokio::test]
    async fn devices_lists_registered_ids() {
        let state = state();
        let Ok(id) = DeviceId::new("rpi1") else {
            panic!("valid device id");
        };
        let (handle, _rx) = ConnectionHandle::channel(8);
        let _guard = state.relay.register_device(id, handle).await;

        let Json(body) = list_devices(State(state.clone())).await;
        assert_eq!(body.devices, vec!["rpi1".to_string()]);
        assert_eq!(body.count, 1);
    }

    #[tokio::test]
    async fn viewers_reports_count_without_subscriptions() {
        let state = state();
        let (handle, _rx) = ConnectionHandle::channel(8);
        let _guard = state.relay.add_viewer(handle).await;

        let Json(body) = list_viewers(State(state)).await;
        assert_eq!(body.count, 1);
        assert!(body.subscriptions.is_empty());
    }
}
