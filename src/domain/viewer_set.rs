//! Viewer Set: every connected viewer and its optional subscription tag.
//!
//! Membership lasts as long as the viewer's connection. Broadcasts iterate
//! over a [`ViewerSet::snapshot`] so the lock is released before any send.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::RwLock;
use utoipa::ToSchema;

use super::{ConnectionHandle, ConnectionId, DeviceId};

/// Device a viewer most recently declared interest in.
///
/// Informational only: routing never consults it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    /// Composite key `"<stationId>:<deviceId>"`.
    pub key: String,
    /// Device the viewer registered for.
    #[schema(value_type = String)]
    pub device_id: DeviceId,
    /// Opaque station/session context supplied by the viewer.
    pub station_id: String,
}

impl Subscription {
    /// Builds a subscription and its composite key.
    #[must_use]
    pub fn new(device_id: DeviceId, station_id: impl Into<String>) -> Self {
        let station_id = station_id.into();
        Self {
            key: format!("{station_id}:{device_id}"),
            device_id,
            station_id,
        }
    }
}

#[derive(Debug)]
struct ViewerEntry {
    handle: ConnectionHandle,
    subscription: Option<Subscription>,
}

/// Unordered collection of connected viewers.
#[derive(Debug, Default)]
pub struct ViewerSet {
    viewers: RwLock<HashMap<ConnectionId, ViewerEntry>>,
}

impl ViewerSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a viewer with no subscription.
    pub async fn insert(&self, handle: ConnectionHandle) {
        self.viewers.write().await.insert(
            handle.id(),
            ViewerEntry {
                handle,
                subscription: None,
            },
        );
    }

    /// Removes a viewer. Returns `true` if it was a member.
    pub async fn remove(&self, id: ConnectionId) -> bool {
        self.viewers.write().await.remove(&id).is_some()
    }

    /// Records the viewer's latest subscription, replacing any earlier one.
    ///
    /// Returns `false` if the viewer is no longer a member.
    pub async fn subscribe(&self, id: ConnectionId, subscription: Subscription) -> bool {
        match self.viewers.write().await.get_mut(&id) {
            Some(entry) => {
                entry.subscription = Some(subscription);
                true
            }
            None => false,
        }
    }

    /// Returns the viewer's current subscription.
    pub async fn subscription(&self, id: ConnectionId) -> Option<Subscription> {
        self.viewers
            .read()
            .await
            .get(&id)
            .and_then(|entry| entry.subscription.clone())
    }

    /// Returns every recorded subscription, sorted by key.
    pub async fn subscriptions(&self) -> Vec<Subscription> {
        let mut subs: Vec<Subscription> = self
            .viewers
            .read()
            .await
            .values()
            .filter_map(|entry| entry.subscription.clone())
            .collect();
        subs.sort_by(|a, b| a.key.cmp(&b.key));
        subs
    }

    /// Returns a point-in-time copy of every member's handle.
    pub async fn snapshot(&self) -> Vec<ConnectionHandle> {
        self.viewers
            .read()
            .await
            .values()
            .map(|entry| entry.handle.clone())
            .collect()
    }

    /// Returns the number of connected viewers.
    pub async fn len(&self) -> usize {
        self.viewers.read().await.len()
    }

    /// Returns `true` if no viewer is connected.
    pub async fn is_empty(&self) -> bool {
        self.viewers.read().await.is_empty()
    }
}
