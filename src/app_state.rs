//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::RelayConfig;
use crate::service::RelayService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Relay context: registry, viewer set and event bus.
    pub relay: Arc<RelayService>,
    /// Upgrade paths and relay settings.
    pub config: Arc<RelayConfig>,
}
