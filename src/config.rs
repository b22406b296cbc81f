//! Relay configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). The upgrade paths are deployment
//! constants; the relay logic never hardcodes them.

use std::net::SocketAddr;

use crate::error::RelayError;

/// Top-level relay configuration.
///
/// Loaded once at startup via [`RelayConfig::from_env`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:5000`).
    pub listen_addr: SocketAddr,

    /// Path segment devices connect under: `/<prefix>/<id>`.
    pub device_path_prefix: String,

    /// Fixed path viewers connect on (e.g. `/ws` or `/appws`).
    pub viewer_path: String,

    /// Whether a newly connected viewer receives a `device_list` snapshot.
    pub send_device_list_on_connect: bool,

    /// MIME type used when a bare base64 frame is turned into a data URI.
    pub frame_mime_type: String,

    /// Capacity of the lifecycle [`crate::domain::EventBus`] channel.
    pub event_bus_capacity: usize,

    /// Frames a single connection may have queued before further frames
    /// for it are dropped.
    pub outbound_queue_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            device_path_prefix: "rpi".to_string(),
            viewer_path: "/ws".to_string(),
            send_device_list_on_connect: true,
            frame_mime_type: "image/jpeg".to_string(),
            event_bus_capacity: 1024,
            outbound_queue_capacity: 64,
        }
    }
}

impl RelayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to the [`Default`] values when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`], or if the upgrade paths fail [`Self::validate`].
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let listen_addr: SocketAddr = match std::env::var("LISTEN_ADDR") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.listen_addr,
        };

        let config = Self {
            listen_addr,
            device_path_prefix: std::env::var("DEVICE_PATH_PREFIX")
                .unwrap_or(defaults.device_path_prefix),
            viewer_path: std::env::var("VIEWER_PATH").unwrap_or(defaults.viewer_path),
            send_device_list_on_connect: parse_env_bool(
                "SEND_DEVICE_LIST_ON_CONNECT",
                defaults.send_device_list_on_connect,
            ),
            frame_mime_type: std::env::var("FRAME_MIME_TYPE").unwrap_or(defaults.frame_mime_type),
            event_bus_capacity: parse_env("EVENT_BUS_CAPACITY", defaults.event_bus_capacity),
            outbound_queue_capacity: parse_env(
                "OUTBOUND_QUEUE_CAPACITY",
                defaults.outbound_queue_capacity,
            ),
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that the device prefix and viewer path describe disjoint,
    /// well-formed upgrade paths.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidConfig`] when the prefix is empty or
    /// contains `/`, when the viewer path does not start with `/`, or when
    /// the viewer path falls under the device prefix, or when the outbound
    /// queue capacity is zero.
    pub fn validate(&self) -> Result<(), RelayError> {
        if self.outbound_queue_capacity == 0 {
            return Err(RelayError::InvalidConfig(
                "OUTBOUND_QUEUE_CAPACITY must be at least 1".to_string(),
            ));
        }
        if self.device_path_prefix.is_empty() || self.device_path_prefix.contains('/') {
            return Err(RelayError::InvalidConfig(format!(
                "DEVICE_PATH_PREFIX must be a single non-empty path segment, got {:?}",
                self.device_path_prefix
            )));
        }
        if !self.viewer_path.starts_with('/') || self.viewer_path.len() < 2 {
            return Err(RelayError::InvalidConfig(format!(
                "VIEWER_PATH must start with '/' and name an endpoint, got {:?}",
                self.viewer_path
            )));
        }
        let device_root = format!("/{}", self.device_path_prefix);
        if self.viewer_path == device_root
            || self.viewer_path.starts_with(&format!("{device_root}/"))
        {
            return Err(RelayError::InvalidConfig(format!(
                "VIEWER_PATH {:?} overlaps the device prefix {device_root:?}",
                self.viewer_path
            )));
        }
        Ok(())
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable as a boolean. Accepts `"true"`, `"1"`,
/// `"false"`, `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key).ok().map(|v| v.to_ascii_lowercase()).as_deref() {
        Some("true") | Some("1") => true,
        Some("false") | Some("0") => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RelayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.device_path_prefix, "rpi");
        assert_eq!(config.viewer_path, "/ws");
        assert!(config.send_device_list_on_connect);
    }

    #[test]
    fn appws_viewer_path_is_accepted() {
        let config = RelayConfig {
            viewer_path: "/appws".to_string(),
            ..RelayConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn prefix_with_slash_is_rejected() {
        let config = RelayConfig {
            device_path_prefix: "devices/rpi".to_string(),
            ..RelayConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(RelayError::InvalidConfig(_))
        ));
    }

    #[test]
    fn empty_prefix_is_rejected() {
        let config = RelayConfig {
            device_path_prefix: String::new(),
            ..RelayConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn viewer_path_under_device_prefix_is_rejected() {
        let config = RelayConfig {
            viewer_path: "/rpi/viewer".to_string(),
            ..RelayConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn viewer_path_without_leading_slash_is_rejected() {
        let config = RelayConfig {
            viewer_path: "ws".to_string(),
            ..RelayConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_outbound_queue_is_rejected() {
        let config = RelayConfig {
            outbound_queue_capacity: 0,
            ..RelayConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(RelayError::InvalidConfig(_))
        ));
    }

    #[test]
    fn parse_env_falls_back_on_missing_key() {
        let value: usize = parse_env("STATION_RELAY_TEST_UNSET_KEY", 7);
        assert_eq!(value, 7);
        assert!(parse_env_bool("STATION_RELAY_TEST_UNSET_BOOL", true));
    }
}
