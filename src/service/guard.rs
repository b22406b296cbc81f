//! Scoped release of a registered connection.
//!
//! A [`ConnectionGuard`] is handed out when a device registers or a viewer
//! joins. Closing it performs the matching unregister/removal exactly once:
//! either explicitly via [`ConnectionGuard::close`] at the end of the
//! connection loop, or, if the task is aborted or panics, from `Drop`.

use std::sync::Arc;

use super::RelayService;
use crate::domain::{ConnectionId, ConnectionState, DeviceId};

/// Which side of the relay a guarded connection belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionRole {
    /// Device connection registered under an identifier.
    Device(DeviceId),
    /// Viewer connection in the Viewer Set.
    Viewer,
}

/// Owns the `Open → Closed` transition of one connection.
#[derive(Debug)]
pub struct ConnectionGuard {
    service: Arc<RelayService>,
    role: ConnectionRole,
    connection_id: ConnectionId,
    state: ConnectionState,
}

impl ConnectionGuard {
    pub(crate) fn new(
        service: Arc<RelayService>,
        role: ConnectionRole,
        connection_id: ConnectionId,
    ) -> Self {
        Self {
            service,
            role,
            connection_id,
            state: ConnectionState::Open,
        }
    }

    /// Guarded connection.
    #[must_use]
    pub const fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Role of the guarded connection.
    #[must_use]
    pub const fn role(&self) -> &ConnectionRole {
        &self.role
    }

    /// Current lifecycle state; `Open` until closed.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Unregisters the connection and consumes the guard.
    ///
    /// If this future is dropped before the release completes, `Drop`
    /// still performs it.
    pub async fn close(mut self) {
        release(&self.service, &self.role, self.connection_id).await;
        self.state = ConnectionState::Closed;
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if self.state == ConnectionState::Closed {
            return;
        }
        self.state = ConnectionState::Closed;

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(
                connection_id = %self.connection_id,
                "connection dropped outside runtime; not released"
            );
            return;
        };
        let service = Arc::clone(&self.service);
        let role = self.role.clone();
        let connection_id = self.connection_id;
        runtime.spawn(async move {
            release(&service, &role, connection_id).await;
        });
    }
}

async fn release(service: &RelayService, role: &ConnectionRole, connection_id: ConnectionId) {
    match role {
        ConnectionRole::Device(device_id) => {
            let _ = service.unregister_device(device_id, connection_id).await;
        }
        ConnectionRole::Viewer => {
            let _ = service.remove_viewer(connection_id).await;
        }
    }
}
