//! Domain layer: identifiers, connection handles, registries and events.
//!
//! This module contains the relay's in-memory model: the device identifier
//! namespace, the outbound handle every live connection exposes, the
//! Connection Registry for devices, the Viewer Set, and the event bus that
//! publishes lifecycle changes to collaborators.

pub mod connection;
pub mod device_id;
pub mod device_registry;
pub mod event_bus;
pub mod relay_event;
pub mod viewer_set;

pub use connection::{ConnectionHandle, ConnectionId, ConnectionState};
pub use device_id::DeviceId;
pub use device_registry::DeviceRegistry;
pub use event_bus::EventBus;
pub use relay_event::RelayEvent;
pub use viewer_set::{Subscription, ViewerSet};
