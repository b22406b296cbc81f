//! Service layer: the relay context and connection finalization.

pub mod guard;
pub mod relay_service;

pub use guard::{ConnectionGuard, ConnectionRole};
pub use relay_service::RelayService;
