//! Per-connection actor loops.
//!
//! Each accepted socket is split: a writer task drains the connection's
//! outbound queue into the sink, while the reader loop below processes one
//! inbound frame at a time in arrival order. Release of the registry or
//! Viewer Set entry happens through the [`crate::service::ConnectionGuard`].

use std::sync::Arc;

use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::dispatcher;
use crate::domain::{ConnectionHandle, DeviceId};
use crate::service::RelayService;

/// Runs a device connection until the socket closes.
pub async fn run_device_connection(
    socket: WebSocket,
    device_id: DeviceId,
    relay: Arc<RelayService>,
) {
    let (ws_tx, mut ws_rx) = socket.split();
    let (handle, outbound) = ConnectionHandle::channel(relay.outbound_queue_capacity());
    let connection_id = handle.id();
    let writer = spawn_writer(ws_tx, outbound);

    let guard = relay.register_device(device_id.clone(), handle).await;

    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let handled =
                    dispatcher::handle_device_text(&relay, &device_id, text.as_str()).await;
                if let Err(e) = handled {
                    tracing::warn!(%device_id, %connection_id, error = %e, "dropped device frame");
                }
            }
            Ok(Message::Binary(bytes)) => {
                tracing::debug!(%device_id, len = bytes.len(), "ignoring binary device frame");
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(%device_id, %connection_id, error = %e, "device socket error");
                break;
            }
        }
    }

    guard.close().await;
    writer.abort();
    tracing::debug!(%device_id, %connection_id, "device connection closed");
}

/// Runs a viewer connection until the socket closes.
pub async fn run_viewer_connection(socket: WebSocket, relay: Arc<RelayService>) {
    let (ws_tx, mut ws_rx) = socket.split();
    let (handle, outbound) = ConnectionHandle::channel(relay.outbound_queue_capacity());
    let connection_id = handle.id();
    let writer = spawn_writer(ws_tx, outbound);

    let guard = relay.add_viewer(handle.clone()).await;

    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let handled = dispatcher::handle_viewer_text(&relay, &handle, text.as_str()).await;
                if let Err(e) = handled {
                    tracing::warn!(%connection_id, error = %e, "dropped viewer frame");
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(%connection_id, error = %e, "viewer socket error");
                break;
            }
        }
    }

    guard.close().await;
    writer.abort();
    tracing::debug!(%connection_id, "viewer connection closed");
}

/// Forwards queued text frames to the socket until either side goes away.
///
/// Returning drops the receiver, which marks the connection's handle closed.
fn spawn_writer(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<Utf8Bytes>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(text) = outbound.recv().await {
            if let Err(e) = sink.send(Message::text(text)).await {
                tracing::debug!(error = %e, "socket write failed");
                break;
            }
        }
    })
}
