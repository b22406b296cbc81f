//! Outbound handle for a single live connection.
//!
//! Every socket (device or viewer) gets a [`ConnectionHandle`]: an opaque
//! [`ConnectionId`] plus a bounded queue of text frames drained by that
//! socket's writer task. Enqueueing never waits on socket I/O: when a peer
//! stops reading and its queue fills up, further frames for it are refused
//! instead of buffered, so a stalled peer costs at most `capacity` frames.

use std::fmt;

use axum::extract::ws::Utf8Bytes;
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::error::RelayError;

/// Unique identifier of one accepted connection.
///
/// Distinguishes two sockets that registered under the same
/// [`super::DeviceId`], so a superseded socket cannot evict its successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ConnectionId(uuid::Uuid);

impl ConnectionId {
    /// Creates a new random `ConnectionId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a registered connection: `Open → Closed`.
///
/// The connecting phase is the HTTP upgrade itself; a connection only gets
/// a state once it is registered. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Registered and able to receive frames.
    Open,
    /// Unregistered; no further frames are delivered.
    Closed,
}

/// Cloneable sending side of a connection.
///
/// Frames are queued as [`Utf8Bytes`], so fanning one serialized message out
/// to many connections shares a single buffer.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: mpsc::Sender<Utf8Bytes>,
}

impl ConnectionHandle {
    /// Creates a handle together with the receiver its writer task drains.
    ///
    /// At most `capacity` frames (minimum 1) wait in the queue. Dropping the
    /// receiver closes the handle: every later send fails.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Utf8Bytes>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                id: ConnectionId::new(),
                tx,
            },
            rx,
        )
    }

    /// Returns this connection's identifier.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queues a pre-serialized text frame.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::QueueFull`] if the peer has fallen `capacity`
    /// frames behind, or [`RelayError::ConnectionClosed`] if the writer has
    /// gone away.
    pub fn try_send(&self, text: Utf8Bytes) -> Result<(), RelayError> {
        self.tx.try_send(text).map_err(|e| match e {
            TrySendError::Full(_) => RelayError::QueueFull(self.id),
            TrySendError::Closed(_) => RelayError::ConnectionClosed(self.id),
        })
    }

    /// Serializes `message` as JSON and queues it.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Internal`] if serialization fails, otherwise
    /// whatever [`Self::try_send`] returns.
    pub fn send_json<T: Serialize>(&self, message: &T) -> Result<(), RelayError> {
        let text =
            serde_json::to_string(message).map_err(|e| RelayError::Internal(e.to_string()))?;
        self.try_send(text.into())
    }

    /// Returns `true` if both handles refer to the same connection.
    #[must_use]
    pub fn same_connection(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn next_text(rx: &mut mpsc::Receiver<Utf8Bytes>) -> Option<String> {
        rx.try_recv().ok().map(|text| text.as_str().to_owned())
    }

    #[test]
    fn new_ids_are_unique() {
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }

    #[test]
    fn open_handle_delivers_in_order() {
        let (handle, mut rx) = ConnectionHandle::channel(8);
        tokio_test::assert_ok!(handle.try_send("one".into()));
        tokio_test::assert_ok!(handle.try_send("two".into()));
        assert_eq!(next_text(&mut rx).as_deref(), Some("one"));
        assert_eq!(next_text(&mut rx).as_deref(), Some("two"));
    }

    #[test]
    fn dropped_receiver_closes_handle() {
        let (handle, rx) = ConnectionHandle::channel(8);
        drop(rx);
        assert_eq!(
            handle.try_send("late".into()),
            Err(RelayError::ConnectionClosed(handle.id()))
        );
    }

    #[test]
    fn stalled_reader_caps_queued_frames() {
        let (handle, mut rx) = ConnectionHandle::channel(4);
        for _ in 0..4 {
            tokio_test::assert_ok!(handle.try_send("frame".into()));
        }
        for _ in 0..100 {
            assert_eq!(
                handle.try_send("frame".into()),
                Err(RelayError::QueueFull(handle.id()))
            );
        }

        let mut queued = 0;
        while next_text(&mut rx).is_some() {
            queued += 1;
        }
        assert_eq!(queued, 4);
        tokio_test::assert_ok!(handle.try_send("after drain".into()));
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let (handle, _rx) = ConnectionHandle::channel(0);
        tokio_test::assert_ok!(handle.try_send("one".into()));
    }

    #[test]
    fn send_json_serializes_message() {
        let (handle, mut rx) = ConnectionHandle::channel(8);
        tokio_test::assert_ok!(handle.send_json(&serde_json::json!({"type": "ping"})));
        let Some(text) = next_text(&mut rx) else {
            panic!("expected queued frame");
        };
        assert_eq!(text, r#"{"type":"ping"}"#);
    }

    #[test]
    fn clones_share_identity() {
        let (handle, _rx) = ConnectionHandle::channel(8);
        let (other, _other_rx) = ConnectionHandle::channel(8);
        assert!(handle.same_connection(&handle.clone()));
        assert!(!handle.same_connection(&other));
    }
}
