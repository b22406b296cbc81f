//! WebSocket envelopes, per direction.
//!
//! Inbound frames are decoded in two steps: a permissive serde pass into a
//! raw struct, then a match on the `type` tag into a closed enum. Unknown
//! tags never fail the decode; they fall into the generic variant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::DeviceId;
use crate::error::RelayError;

/// Direction sent to a device when the viewer did not name one.
pub const DEFAULT_DIRECTION: &str = "none";

/// Marker carried by every `command_sent` confirmation.
pub const COMMAND_SENT_STATUS: &str = "command_sent";

/// Media frame types a device may stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Periodic camera frame.
    CameraFrame,
    /// One-off still snapshot.
    Snapshot,
}

impl MediaKind {
    /// Returns the wire `type` tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CameraFrame => "camera_frame",
            Self::Snapshot => "snapshot",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "camera_frame" => Some(Self::CameraFrame),
            "snapshot" => Some(Self::Snapshot),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawDeviceFrame {
    #[serde(rename = "type")]
    kind: Option<String>,
    frame: Option<Value>,
    status: Option<Value>,
    message: Option<Value>,
}

/// Frame received from a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceMessage {
    /// Media meant for display; `frame` is not yet validated.
    Media {
        /// Which media type the device sent.
        kind: MediaKind,
        /// Raw or data-URI encoded payload.
        frame: String,
    },
    /// Device announcing itself after connecting.
    Register {
        /// Reported readiness (e.g. `"ready"`).
        status: Option<String>,
        /// Free-form announcement.
        message: Option<String>,
    },
    /// Anything else, typically a reply to a command.
    Response {
        /// Reported outcome (e.g. `"success"`).
        status: Option<String>,
        /// Free-form detail.
        message: Option<String>,
    },
}

impl DeviceMessage {
    /// Decodes a device text frame.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::MalformedMessage`] if the text is not a JSON
    /// object, or [`RelayError::InvalidFrame`] if a media frame has no
    /// string `frame` field.
    pub fn parse(text: &str) -> Result<Self, RelayError> {
        let raw: RawDeviceFrame =
            serde_json::from_str(text).map_err(|e| RelayError::MalformedMessage(e.to_string()))?;

        match raw.kind.as_deref().and_then(MediaKind::from_tag) {
            Some(kind) => match raw.frame {
                Some(Value::String(frame)) => Ok(Self::Media { kind, frame }),
                Some(_) => Err(RelayError::InvalidFrame("frame must be a string".to_string())),
                None => Err(RelayError::InvalidFrame("missing frame".to_string())),
            },
            None if raw.kind.as_deref() == Some("register") => Ok(Self::Register {
                status: value_text(raw.status),
                message: value_text(raw.message),
            }),
            None => Ok(Self::Response {
                status: value_text(raw.status),
                message: value_text(raw.message),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawViewerFrame {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(alias = "device_id", alias = "rpiId")]
    device_id: Option<Value>,
    #[serde(alias = "station_id")]
    station_id: Option<Value>,
    command: Option<Value>,
    direction: Option<Value>,
}

/// A viewer's request to drive one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    /// Target device; `None` when the viewer omitted it.
    pub device_id: Option<DeviceId>,
    /// Command name.
    pub command: String,
    /// Command direction, [`DEFAULT_DIRECTION`] when omitted.
    pub direction: String,
}

/// Frame received from a viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerMessage {
    /// Declares interest in a device.
    Register {
        /// Device of interest; `None` when omitted.
        device_id: Option<DeviceId>,
        /// Opaque station/session context (empty when omitted).
        station_id: String,
    },
    /// Anything else is a command to route.
    Command(CommandRequest),
}

impl ViewerMessage {
    /// Decodes a viewer text frame.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::MalformedMessage`] if the text is not a JSON
    /// object.
    pub fn parse(text: &str) -> Result<Self, RelayError> {
        let raw: RawViewerFrame =
            serde_json::from_str(text).map_err(|e| RelayError::MalformedMessage(e.to_string()))?;

        let device_id = value_text(raw.device_id).and_then(|id| DeviceId::new(id).ok());

        if raw.kind.as_deref() == Some("register") {
            return Ok(Self::Register {
                device_id,
                station_id: value_text(raw.station_id).unwrap_or_default(),
            });
        }

        let command = value_text(raw.command)
            .or(raw.kind)
            .unwrap_or_else(|| "unknown".to_string());
        let direction =
            value_text(raw.direction).unwrap_or_else(|| DEFAULT_DIRECTION.to_string());

        Ok(Self::Command(CommandRequest {
            device_id,
            command,
            direction,
        }))
    }
}

/// Renders a loosely typed JSON field as text: strings verbatim, `null`
/// as absent, anything else in its JSON form.
fn value_text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Envelope sent from the relay to a device.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceEnvelope {
    /// Routed viewer command.
    Command {
        /// Command name.
        command: String,
        /// Command direction.
        direction: String,
        /// Generation time.
        timestamp: DateTime<Utc>,
    },
}

/// Envelope sent from the relay to viewers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewerEnvelope {
    /// Devices connected at the moment a viewer joined.
    DeviceList {
        /// Registered identifiers, sorted.
        ids: Vec<DeviceId>,
    },
    /// A device registered.
    DeviceConnected {
        /// Device identifier.
        id: DeviceId,
    },
    /// A device's connection closed.
    DeviceDisconnected {
        /// Device identifier.
        id: DeviceId,
    },
    /// Camera frame, normalized to a data URI.
    CameraFrame {
        /// Source device.
        id: DeviceId,
        /// Data URI payload.
        frame: String,
    },
    /// Snapshot, normalized to a data URI.
    Snapshot {
        /// Source device.
        id: DeviceId,
        /// Data URI payload.
        frame: String,
    },
    /// Status derived from a device's `register` frame.
    DeviceStatus {
        /// Source device.
        id: DeviceId,
        /// Reported readiness.
        status: String,
        /// Announcement text.
        message: String,
    },
    /// Generic device reply.
    DeviceResponse {
        /// Source device.
        id: DeviceId,
        /// Free-form detail.
        message: Option<String>,
        /// Reported outcome.
        status: Option<String>,
    },
    /// Confirms a viewer `register` frame.
    Registered {
        /// Device the viewer registered for.
        #[serde(rename = "deviceId")]
        device_id: DeviceId,
        /// Echoed station context.
        #[serde(rename = "stationId")]
        station_id: String,
        /// Composite subscription key.
        key: String,
    },
    /// Confirms a command was handed to the device.
    CommandSent {
        /// Target device.
        #[serde(rename = "deviceId")]
        device_id: DeviceId,
        /// Command name.
        command: String,
        /// Command direction.
        direction: String,
        /// Same timestamp the device received.
        timestamp: DateTime<Utc>,
        /// Always [`COMMAND_SENT_STATUS`].
        status: &'static str,
    },
    /// Request-scoped failure, sent only to the viewer that caused it.
    Error {
        /// Human-readable reason.
        message: String,
    },
}

impl ViewerEnvelope {
    /// Builds the media envelope matching `kind`.
    #[must_use]
    pub fn media(kind: MediaKind, id: DeviceId, frame: String) -> Self {
        match kind {
            MediaKind::CameraFrame => Self::CameraFrame { id, frame },
            MediaKind::Snapshot => Self::Snapshot { id, frame },
        }
    }

    /// Builds an `error` envelope.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
