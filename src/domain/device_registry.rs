//! Connection Registry: device identifier to its single live connection.
//!
//! [`DeviceRegistry`] stores one [`ConnectionHandle`] per [`DeviceId`] in a
//! `HashMap` behind a [`tokio::sync::RwLock`]. Inserts and removals are
//! atomic with respect to each other; lookups hand out a cloned handle so
//! no lock is held while sending.

use std::collections::HashMap;

use tokio::sync::RwLock;
#[cfg(test)]
use tokio::sync::RwLockWriteGuard;

use super::{ConnectionHandle, ConnectionId, DeviceId};

/// Central store for connected devices.
///
/// # Concurrency
///
/// - Registration is last-writer-wins: a second connection for the same
///   identifier replaces the first without closing it.
/// - Removal is conditional on the closing connection still being the
///   stored one, so a stale socket closing late is a no-op.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: RwLock<HashMap<DeviceId, ConnectionHandle>>,
}

impl DeviceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites the mapping for `id`.
    ///
    /// Returns the superseded handle, if any.
    pub async fn register(
        &self,
        id: DeviceId,
        handle: ConnectionHandle,
    ) -> Option<ConnectionHandle> {
        self.devices.write().await.insert(id, handle)
    }

    /// Removes the mapping for `id` only if it still points at `connection`.
    ///
    /// Returns `true` if an entry was removed.
    pub async fn unregister(&self, id: &DeviceId, connection: ConnectionId) -> bool {
        let mut map = self.devices.write().await;
        match map.get(id) {
            Some(current) if current.id() == connection => {
                map.remove(id);
                true
            }
            _ => false,
        }
    }

    /// Returns the handle currently registered for `id`.
    pub async fn lookup(&self, id: &DeviceId) -> Option<ConnectionHandle> {
        self.devices.read().await.get(id).cloned()
    }

    /// Returns all registered identifiers, sorted.
    pub async fn ids(&self) -> Vec<DeviceId> {
        let mut ids: Vec<DeviceId> = self.devices.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Returns the number of registered devices.
    pub async fn len(&self) -> usize {
        self.devices.read().await.len()
    }

    /// Returns `true` if no device is registered.
    pub async fn is_empty(&self) -> bool {
        self.devices.read().await.is_empty()
    }

    /// Holds the registry's write lock so tests can stall a pending release.
    #[cfg(test)]
    pub(crate) async fn write_lock_for_test(
        &self,
    ) -> RwLockWriteGuard<'_, HashMap<DeviceId, ConnectionHandle>> {
        self.devices.write().await
    }
}
