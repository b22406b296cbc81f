//! Relay Dispatcher: what to do with one inbound frame.
//!
//! Device frames fan out to every viewer. Viewer frames are either handled
//! locally (registration, errors) or routed to exactly one device. Errors
//! returned here are logged by the connection loop and never close it.

use chrono::Utc;

use super::frame::normalize_frame;
use super::messages::{
    COMMAND_SENT_STATUS, CommandRequest, DeviceEnvelope, DeviceMessage, ViewerEnvelope,
    ViewerMessage,
};
use crate::domain::{ConnectionHandle, DeviceId, RelayEvent, Subscription};
use crate::error::RelayError;
use crate::service::RelayService;

/// Status reported when a device registers without one.
const DEFAULT_DEVICE_STATUS: &str = "online";

/// Handles a text frame from device `device_id`.
///
/// Returns the number of viewers the resulting envelope reached.
///
/// # Errors
///
/// Returns [`RelayError::MalformedMessage`] or [`RelayError::InvalidFrame`]
/// when the frame is dropped; nothing is sent back to the device.
pub async fn handle_device_text(
    relay: &RelayService,
    device_id: &DeviceId,
    text: &str,
) -> Result<usize, RelayError> {
    let envelope = match DeviceMessage::parse(text)? {
        DeviceMessage::Media { kind, frame } => {
            let frame = normalize_frame(&frame, relay.frame_mime_type())?;
            ViewerEnvelope::media(kind, device_id.clone(), frame)
        }
        DeviceMessage::Register { status, message } => {
            tracing::info!(%device_id, status = status.as_deref(), "device announced itself");
            ViewerEnvelope::DeviceStatus {
                id: device_id.clone(),
                status: status.unwrap_or_else(|| DEFAULT_DEVICE_STATUS.to_string()),
                message: message.unwrap_or_else(|| format!("{device_id} registered")),
            }
        }
        DeviceMessage::Response { status, message } => ViewerEnvelope::DeviceResponse {
            id: device_id.clone(),
            message,
            status,
        },
    };
    Ok(relay.broadcast(&envelope).await)
}

/// Handles a text frame from a viewer.
///
/// Replies (confirmations and request-scoped errors) go to `viewer` only.
///
/// # Errors
///
/// Returns [`RelayError::MalformedMessage`] when the frame is not a JSON
/// object; the frame is dropped without a reply.
pub async fn handle_viewer_text(
    relay: &RelayService,
    viewer: &ConnectionHandle,
    text: &str,
) -> Result<(), RelayError> {
    match ViewerMessage::parse(text)? {
        ViewerMessage::Register {
            device_id,
            station_id,
        } => register_viewer(relay, viewer, device_id, station_id).await,
        ViewerMessage::Command(request) => route_command(relay, viewer, request).await,
    }
    Ok(())
}

async fn register_viewer(
    relay: &RelayService,
    viewer: &ConnectionHandle,
    device_id: Option<DeviceId>,
    station_id: String,
) {
    let Some(device_id) = device_id else {
        reply(viewer, &ViewerEnvelope::error("deviceId required"));
        return;
    };
    let subscription = Subscription::new(device_id, station_id);
    if !relay
        .viewers()
        .subscribe(viewer.id(), subscription.clone())
        .await
    {
        tracing::debug!(connection_id = %viewer.id(), "register from departed viewer");
        return;
    }
    tracing::debug!(connection_id = %viewer.id(), key = %subscription.key, "viewer registered");
    reply(
        viewer,
        &ViewerEnvelope::Registered {
            device_id: subscription.device_id,
            station_id: subscription.station_id,
            key: subscription.key,
        },
    );
}

async fn route_command(relay: &RelayService, viewer: &ConnectionHandle, request: CommandRequest) {
    let CommandRequest {
        device_id,
        command,
        direction,
    } = request;
    let Some(device_id) = device_id else {
        reply(viewer, &ViewerEnvelope::error("deviceId required"));
        return;
    };

    let timestamp = Utc::now();
    let envelope = DeviceEnvelope::Command {
        command: command.clone(),
        direction: direction.clone(),
        timestamp,
    };
    if let Err(e) = relay.send_to_device(&device_id, &envelope).await {
        tracing::debug!(%device_id, error = %e, "command not routed");
        reply(viewer, &ViewerEnvelope::error(e.to_string()));
        return;
    }

    tracing::info!(%device_id, command = %command, direction = %direction, "command routed");
    let _ = relay.event_bus().publish(RelayEvent::CommandRouted {
        device_id: device_id.clone(),
        viewer_id: viewer.id(),
        command: command.clone(),
        direction: direction.clone(),
        timestamp,
    });
    reply(
        viewer,
        &ViewerEnvelope::CommandSent {
            device_id,
            command,
            direction,
            timestamp,
            status: COMMAND_SENT_STATUS,
        },
    );
}

fn reply(viewer: &ConnectionHandle, envelope: &ViewerEnvelope) {
    if let Err(e) = viewer.send_json(envelope) {
        tracing::debug!(connection_id = %viewer.id(), error = %e, "reply not delivered");
    }
}
