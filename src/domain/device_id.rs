//! Device identifier newtype.
//!
//! [`DeviceId`] wraps the opaque path segment a device connects with. It is
//! used verbatim as the registry key, so the only validation is that it is
//! non-empty.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// Identifier of a remote device node (e.g. `"station-8"`).
///
/// Case-sensitive and compared byte for byte. Guaranteed non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId(String);

impl DeviceId {
    /// Creates a `DeviceId` from a raw identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::MissingDeviceId`] if `raw` is empty.
    pub fn new(raw: impl Into<String>) -> Result<Self, RelayError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(RelayError::MissingDeviceId);
        }
        Ok(Self(raw))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DeviceId {
    type Error = RelayError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<DeviceId> for String {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn empty_id_is_rejected() {
        assert_eq!(DeviceId::new(""), Err(RelayError::MissingDeviceId));
    }

    #[test]
    fn id_is_kept_verbatim() {
        let Ok(id) = DeviceId::new("RPI1") else {
            panic!("valid id");
        };
        assert_eq!(id.as_str(), "RPI1");
        assert_eq!(format!("{id}"), "RPI1");
    }

    #[test]
    fn ids_are_case_sensitive() {
        let (Ok(upper), Ok(lower)) = (DeviceId::new("RPI1"), DeviceId::new("rpi1")) else {
            panic!("valid ids");
        };
        assert_ne!(upper, lower);
    }

    #[test]
    fn deserialize_rejects_empty_string() {
        let parsed: Result<DeviceId, _> = serde_json::from_str("\"\"");
        assert!(parsed.is_err());
        let parsed: Result<DeviceId, _> = serde_json::from_str("\"station-8\"");
        assert!(parsed.is_ok());
    }
}
