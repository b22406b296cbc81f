//! Lifecycle events published for collaborators.
//!
//! The relay itself does not persist or display anything. Every connection
//! change and every routed command emits a [`RelayEvent`] through the
//! [`super::EventBus`] so that outside components (station dashboards,
//! audit logs) can react without the relay knowing about them.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{ConnectionId, DeviceId};

/// Domain event emitted after every registry or viewer-set mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum RelayEvent {
    /// A device registered (or re-registered) under `device_id`.
    DeviceConnected {
        /// Device identifier.
        device_id: DeviceId,
        /// Connection that now owns the identifier.
        connection_id: ConnectionId,
        /// Whether an earlier connection for the same identifier was superseded.
        replaced: bool,
        /// Registration timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A device's registered connection closed.
    DeviceDisconnected {
        /// Device identifier.
        device_id: DeviceId,
        /// Connection that closed.
        connection_id: ConnectionId,
        /// Removal timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A viewer joined the Viewer Set.
    ViewerConnected {
        /// Viewer connection.
        connection_id: ConnectionId,
        /// Join timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A viewer left the Viewer Set.
    ViewerDisconnected {
        /// Viewer connection.
        connection_id: ConnectionId,
        /// Leave timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A viewer command was handed to a device connection.
    CommandRouted {
        /// Target device.
        device_id: DeviceId,
        /// Originating viewer connection.
        viewer_id: ConnectionId,
        /// Command name.
        command: String,
        /// Command direction (`"none"` when unspecified).
        direction: String,
        /// Routing timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl RelayEvent {
    /// Returns the device this event concerns, if any.
    #[must_use]
    pub fn device_id(&self) -> Option<&DeviceId> {
        match self {
            Self::DeviceConnected { device_id, .. }
            | Self::DeviceDisconnected { device_id, .. }
            | Self::CommandRouted { device_id, .. } => Some(device_id),
            Self::ViewerConnected { .. } | Self::ViewerDisconnected { .. } => None,
        }
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::DeviceConnected { .. } => "device_connected",
            Self::DeviceDisconnected { .. } => "device_disconnected",
            Self::ViewerConnected { .. } => "viewer_connected",
            Self::ViewerDisconnected { .. } => "viewer_disconnected",
            Self::CommandRouted { .. } => "command_routed",
        }
    }
}
