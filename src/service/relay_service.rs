//! Relay service: owns the relay's shared state and its fan-out rules.

use std::sync::Arc;

use axum::extract::ws::Utf8Bytes;
use chrono::Utc;
use serde::Serialize;

use super::guard::{ConnectionGuard, ConnectionRole};
use crate::config::RelayConfig;
use crate::domain::{
    ConnectionHandle, ConnectionId, DeviceId, DeviceRegistry, EventBus, RelayEvent, ViewerSet,
};
use crate::error::RelayError;
use crate::ws::messages::{DeviceEnvelope, ViewerEnvelope};

/// Explicit context object for the relay.
///
/// Holds the [`DeviceRegistry`], the [`ViewerSet`] and the [`EventBus`].
/// Created once by the server setup and shared through an `Arc`; nothing in
/// the relay reaches for module-level state. Every send is best-effort: a
/// closed recipient is pruned, a recipient whose queue is full misses that
/// frame, and the remaining recipients are still served.
#[derive(Debug)]
pub struct RelayService {
    devices: DeviceRegistry,
    viewers: ViewerSet,
    event_bus: EventBus,
    frame_mime_type: String,
    send_device_list_on_connect: bool,
    outbound_queue_capacity: usize,
}

impl RelayService {
    /// Creates a service with empty registries.
    #[must_use]
    pub fn new(config: &RelayConfig, event_bus: EventBus) -> Self {
        Self {
            devices: DeviceRegistry::new(),
            viewers: ViewerSet::new(),
            event_bus,
            frame_mime_type: config.frame_mime_type.clone(),
            send_device_list_on_connect: config.send_device_list_on_connect,
            outbound_queue_capacity: config.outbound_queue_capacity,
        }
    }

    /// Returns the device registry.
    #[must_use]
    pub fn devices(&self) -> &DeviceRegistry {
        &self.devices
    }

    /// Returns the viewer set.
    #[must_use]
    pub fn viewers(&self) -> &ViewerSet {
        &self.viewers
    }

    /// Returns the lifecycle event bus.
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// MIME type applied to bare base64 media frames.
    #[must_use]
    pub fn frame_mime_type(&self) -> &str {
        &self.frame_mime_type
    }

    /// Queue capacity for each new connection's [`ConnectionHandle`].
    #[must_use]
    pub const fn outbound_queue_capacity(&self) -> usize {
        self.outbound_queue_capacity
    }

    /// Registers a device connection and announces it to every viewer.
    ///
    /// A previous connection under the same identifier is superseded but not
    /// closed. The returned guard unregisters exactly this connection.
    pub async fn register_device(
        self: &Arc<Self>,
        device_id: DeviceId,
        handle: ConnectionHandle,
    ) -> ConnectionGuard {
        let connection_id = handle.id();
        let replaced = self
            .devices
            .register(device_id.clone(), handle)
            .await
            .is_some();
        if replaced {
            tracing::info!(%device_id, %connection_id, "device connection superseded");
        } else {
            tracing::info!(%device_id, %connection_id, "device connected");
        }

        let _ = self.event_bus.publish(RelayEvent::DeviceConnected {
            device_id: device_id.clone(),
            connection_id,
            replaced,
            timestamp: Utc::now(),
        });
        let _ = self
            .broadcast(&ViewerEnvelope::DeviceConnected {
                id: device_id.clone(),
            })
            .await;

        ConnectionGuard::new(
            Arc::clone(self),
            ConnectionRole::Device(device_id),
            connection_id,
        )
    }

    /// Removes `device_id` if `connection_id` still owns it and announces
    /// the disconnect. A superseded connection closing is a no-op.
    ///
    /// Returns `true` if the device was removed.
    pub async fn unregister_device(
        &self,
        device_id: &DeviceId,
        connection_id: ConnectionId,
    ) -> bool {
        if !self.devices.unregister(device_id, connection_id).await {
            tracing::debug!(%device_id, %connection_id, "stale device connection closed");
            return false;
        }
        tracing::info!(%device_id, %connection_id, "device disconnected");

        let _ = self.event_bus.publish(RelayEvent::DeviceDisconnected {
            device_id: device_id.clone(),
            connection_id,
            timestamp: Utc::now(),
        });
        let _ = self
            .broadcast(&ViewerEnvelope::DeviceDisconnected {
                id: device_id.clone(),
            })
            .await;
        true
    }

    /// Adds a viewer and, when configured, sends it the current device list.
    pub async fn add_viewer(self: &Arc<Self>, handle: ConnectionHandle) -> ConnectionGuard {
        let connection_id = handle.id();
        self.viewers.insert(handle.clone()).await;
        tracing::info!(%connection_id, "viewer connected");

        let _ = self.event_bus.publish(RelayEvent::ViewerConnected {
            connection_id,
            timestamp: Utc::now(),
        });

        if self.send_device_list_on_connect {
            let list = ViewerEnvelope::DeviceList {
                ids: self.devices.ids().await,
            };
            if let Err(e) = handle.send_json(&list) {
                tracing::warn!(%connection_id, error = %e, "failed to send device list");
            }
        }

        ConnectionGuard::new(Arc::clone(self), ConnectionRole::Viewer, connection_id)
    }

    /// Removes a viewer. Devices are not notified.
    ///
    /// Returns `true` if the viewer was a member.
    pub async fn remove_viewer(&self, connection_id: ConnectionId) -> bool {
        if !self.viewers.remove(connection_id).await {
            return false;
        }
        tracing::info!(%connection_id, "viewer disconnected");
        let _ = self.event_bus.publish(RelayEvent::ViewerDisconnected {
            connection_id,
            timestamp: Utc::now(),
        });
        true
    }

    /// Sends `message` to every viewer in a snapshot of the Viewer Set.
    ///
    /// The message is serialized once and the buffer shared by every
    /// queue. Closed viewers are pruned; a viewer whose queue is full skips
    /// this message but stays in the set. Returns the number of viewers the
    /// message was queued for.
    pub async fn broadcast<T: Serialize>(&self, message: &T) -> usize {
        let text: Utf8Bytes = match serde_json::to_string(message) {
            Ok(text) => text.into(),
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize broadcast");
                return 0;
            }
        };

        let mut delivered = 0;
        for viewer in self.viewers.snapshot().await {
            match viewer.try_send(text.clone()) {
                Ok(()) => delivered += 1,
                Err(RelayError::QueueFull(connection_id)) => {
                    tracing::debug!(%connection_id, "viewer queue full; frame skipped");
                }
                Err(e) => {
                    tracing::debug!(
                        connection_id = %viewer.id(),
                        error = %e,
                        "dropping broadcast to closed viewer"
                    );
                    self.remove_viewer(viewer.id()).await;
                }
            }
        }
        delivered
    }

    /// Sends one envelope to the connection registered for `device_id`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::DeviceNotConnected`] if the identifier is not
    /// registered or its connection is no longer open; in the latter case
    /// the stale entry is unregistered. Returns [`RelayError::QueueFull`] if
    /// the device is not reading its queue.
    pub async fn send_to_device(
        &self,
        device_id: &DeviceId,
        message: &DeviceEnvelope,
    ) -> Result<(), RelayError> {
        let Some(handle) = self.devices.lookup(device_id).await else {
            return Err(RelayError::DeviceNotConnected(device_id.clone()));
        };
        match handle.send_json(message) {
            Ok(()) => Ok(()),
            Err(RelayError::ConnectionClosed(connection_id)) => {
                tracing::debug!(%device_id, %connection_id, "pruning closed device connection");
                self.unregister_device(device_id, connection_id).await;
                Err(RelayError::DeviceNotConnected(device_id.clone()))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tokio::sync::mpsc::Receiver;

    fn service() -> Arc<RelayService> {
        Arc::new(RelayService::new(&RelayConfig::default(), EventBus::new(64)))
    }

    fn device(id: &str) -> DeviceId {
        let Ok(id) = DeviceId::new(id) else {
            panic!("valid device id");
        };
        id
    }

    const QUEUE: usize = 16;

    fn drain(rx: &mut Receiver<Utf8Bytes>) -> Vec<Value> {
        let mut out = Vec::new();
        while let Ok(text) = rx.try_recv() {
            let Ok(value) = serde_json::from_str(text.as_str()) else {
                panic!("queued frame is not JSON: {text}");
            };
            out.push(value);
        }
        out
    }

    #[tokio::test]
    async fn broadcast_to_empty_set_is_noop() {
        let svc = service();
        let delivered = svc
            .broadcast(&ViewerEnvelope::error("nobody listening"))
            .await;
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn viewer_joining_gets_device_list() {
        let svc = service();
        let (dev, _dev_rx) = ConnectionHandle::channel(QUEUE);
        let _device_guard = svc.register_device(device("rpi1"), dev).await;

        let (viewer, mut viewer_rx) = ConnectionHandle::channel(QUEUE);
        let _viewer_guard = svc.add_viewer(viewer).await;

        let frames = drain(&mut viewer_rx);
        assert_eq!(
            frames,
            vec![serde_json::json!({"type": "device_list", "ids": ["rpi1"]})]
        );
    }

    #[tokio::test]
    async fn device_list_can_be_disabled() {
        let config = RelayConfig {
            send_device_list_on_connect: false,
            ..RelayConfig::default()
        };
        let svc = Arc::new(RelayService::new(&config, EventBus::new(8)));
        let (viewer, mut viewer_rx) = ConnectionHandle::channel(QUEUE);
        let _guard = svc.add_viewer(viewer).await;
        assert!(drain(&mut viewer_rx).is_empty());
    }

    #[tokio::test]
    async fn each_registration_announces_once() {
        let svc = service();
        let (viewer, mut viewer_rx) = ConnectionHandle::channel(QUEUE);
        let _viewer_guard = svc.add_viewer(viewer).await;
        let _ = drain(&mut viewer_rx);

        let (first, _rx1) = ConnectionHandle::channel(QUEUE);
        let (second, _rx2) = ConnectionHandle::channel(QUEUE);
        let _g1 = svc.register_device(device("rpi1"), first).await;
        let _g2 = svc.register_device(device("rpi1"), second.clone()).await;

        let frames = drain(&mut viewer_rx);
        let connected = serde_json::json!({"type": "device_connected", "id": "rpi1"});
        assert_eq!(frames, vec![connected.clone(), connected]);
        assert_eq!(svc.devices().len().await, 1);
        let Some(current) = svc.devices().lookup(&device("rpi1")).await else {
            panic!("expected device");
        };
        assert!(current.same_connection(&second));
    }

    #[tokio::test]
    async fn superseded_connection_does_not_announce_disconnect() {
        let svc = service();
        let (first, _rx1) = ConnectionHandle::channel(QUEUE);
        let (second, _rx2) = ConnectionHandle::channel(QUEUE);
        let first_id = first.id();
        let _g1 = svc.register_device(device("rpi1"), first).await;
        let _g2 = svc.register_device(device("rpi1"), second).await;

        let (viewer, mut viewer_rx) = ConnectionHandle::channel(QUEUE);
        let _viewer_guard = svc.add_viewer(viewer).await;
        let _ = drain(&mut viewer_rx);

        assert!(!svc.unregister_device(&device("rpi1"), first_id).await);
        assert!(drain(&mut viewer_rx).is_empty());
        assert!(svc.devices().lookup(&device("rpi1")).await.is_some());
    }

    #[tokio::test]
    async fn closed_viewer_does_not_abort_broadcast() {
        let svc = service();
        let mut receivers = Vec::new();
        let mut guards = Vec::new();
        for _ in 0..5 {
            let (viewer, rx) = ConnectionHandle::channel(QUEUE);
            guards.push(svc.add_viewer(viewer).await);
            receivers.push(rx);
        }
        for rx in &mut receivers {
            let _ = drain(rx);
        }

        // Close one viewer's writer side mid-membership.
        let closed = receivers.remove(2);
        drop(closed);

        let delivered = svc.broadcast(&ViewerEnvelope::error("hello")).await;
        assert_eq!(delivered, 4);
        for rx in &mut receivers {
            assert_eq!(drain(rx).len(), 1);
        }
        assert_eq!(svc.viewers().len().await, 4);
    }

    #[tokio::test]
    async fn send_to_unknown_device_fails() {
        let svc = service();
        let cmd = DeviceEnvelope::Command {
            command: "move".to_string(),
            direction: "none".to_string(),
            timestamp: Utc::now(),
        };
        assert_eq!(
            svc.send_to_device(&device("ghost"), &cmd).await,
            Err(RelayError::DeviceNotConnected(device("ghost")))
        );
    }

    #[tokio::test]
    async fn send_to_closed_device_prunes_entry() {
        let svc = service();
        let (dev, dev_rx) = ConnectionHandle::channel(QUEUE);
        let _guard = svc.register_device(device("rpi1"), dev).await;
        drop(dev_rx);

        let (viewer, mut viewer_rx) = ConnectionHandle::channel(QUEUE);
        let _viewer_guard = svc.add_viewer(viewer).await;
        let _ = drain(&mut viewer_rx);

        let cmd = DeviceEnvelope::Command {
            command: "move".to_string(),
            direction: "none".to_string(),
            timestamp: Utc::now(),
        };
        assert!(svc.send_to_device(&device("rpi1"), &cmd).await.is_err());
        assert!(svc.devices().is_empty().await);
        assert_eq!(
            drain(&mut viewer_rx),
            vec![serde_json::json!({"type": "device_disconnected", "id": "rpi1"})]
        );
    }

    #[tokio::test]
    async fn lifecycle_events_reach_bus_subscribers() {
        let svc = service();
        let mut events = svc.event_bus().subscribe();

        let (dev, _dev_rx) = ConnectionHandle::channel(QUEUE);
        let guard = svc.register_device(device("rpi1"), dev).await;
        guard.close().await;

        let Ok(first) = events.recv().await else {
            panic!("expected connect event");
        };
        let Ok(second) = events.recv().await else {
            panic!("expected disconnect event");
        };
        assert_eq!(first.event_type_str(), "device_connected");
        assert_eq!(second.event_type_str(), "device_disconnected");
    }

    #[tokio::test]
    async fn stalled_viewer_queue_stays_bounded() {
        let svc = service();
        let (stalled, mut stalled_rx) = ConnectionHandle::channel(QUEUE);
        let _stalled_guard = svc.add_viewer(stalled).await;
        let (healthy, mut healthy_rx) = ConnectionHandle::channel(QUEUE);
        let _healthy_guard = svc.add_viewer(healthy).await;
        let _ = drain(&mut healthy_rx);

        let frame = ViewerEnvelope::media(
            crate::ws::messages::MediaKind::CameraFrame,
            device("rpi1"),
            format!("data:image/jpeg;base64,{}", "A".repeat(4096)),
        );
        for _ in 0..(QUEUE * 20) {
            let _ = svc.broadcast(&frame).await;
            assert_eq!(drain(&mut healthy_rx).len(), 1);
        }

        // The device list sent on join occupies one slot.
        assert_eq!(drain(&mut stalled_rx).len(), QUEUE);
        assert_eq!(svc.viewers().len().await, 2);

        assert_eq!(svc.broadcast(&frame).await, 2);
        assert_eq!(drain(&mut stalled_rx).len(), 1);
    }

    #[tokio::test]
    async fn device_not_reading_reports_full_queue() {
        let svc = service();
        let (dev, _dev_rx) = ConnectionHandle::channel(1);
        let connection_id = dev.id();
        let _guard = svc.register_device(device("rpi1"), dev).await;

        let cmd = DeviceEnvelope::Command {
            command: "move".to_string(),
            direction: "none".to_string(),
            timestamp: Utc::now(),
        };
        assert_eq!(svc.send_to_device(&device("rpi1"), &cmd).await, Ok(()));
        assert_eq!(
            svc.send_to_device(&device("rpi1"), &cmd).await,
            Err(RelayError::QueueFull(connection_id))
        );
        assert!(svc.devices().lookup(&device("rpi1")).await.is_some());
    }
}
